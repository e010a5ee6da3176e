//! Dispatching built-in tools end to end over a temporary vault.

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use scribe_rs_config::{ScribeConfig, ToolsConfig};
use scribe_rs_context::{
    ContextError, ContextExcerpt, ContextKind, ContextProvider, IndexQueue, SemanticSearch,
};
use scribe_rs_tools::{
    ToolContext, ToolDispatcher, ToolOutcome, ToolServices, builtin_tool_registry,
};
use scribe_rs_vault::VaultStore;
use serde_json::json;
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

#[derive(Default)]
struct RecordingIndex {
    paths: Mutex<Vec<String>>,
}

#[async_trait]
impl SemanticSearch for RecordingIndex {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<ContextExcerpt>, ContextError> {
        Ok(Vec::new())
    }

    async fn index(&self, path: &str, _content: &str) -> Result<(), ContextError> {
        self.paths.lock().push(path.to_string());
        Ok(())
    }
}

fn dispatcher_with(services: impl FnOnce(VaultStore) -> ToolServices) -> (TempDir, ToolDispatcher) {
    let temp = tempdir().expect("tempdir");
    let store = VaultStore::open(temp.path()).expect("store");
    let context = ToolContext::new(services(store));
    let dispatcher = ToolDispatcher::from_config(
        builtin_tool_registry(),
        context,
        &ToolsConfig::default(),
    )
    .expect("dispatcher");
    (temp, dispatcher)
}

/// The catalog is served from the same registry that dispatches.
#[tokio::test]
async fn every_catalog_entry_dispatches() {
    let (_temp, dispatcher) =
        dispatcher_with(|store| ToolServices::new(store, Vec::new(), "tasks.md"));
    let catalog = dispatcher.catalog();
    assert_eq!(catalog.len(), 13);

    for spec in catalog {
        assert!(spec.args_schema.is_object(), "{} schema", spec.name);
        let outcome = dispatcher.execute(&spec.name, json!({})).await;
        assert!(
            !outcome.text.starts_with("Unknown tool"),
            "{} is not dispatchable",
            spec.name
        );
    }
}

/// The task example: one add produces the exact acknowledgement.
#[tokio::test]
async fn task_add_acknowledges_with_total() {
    let (_temp, dispatcher) =
        dispatcher_with(|store| ToolServices::new(store, Vec::new(), "tasks.md"));
    let outcome = dispatcher
        .execute("task_add", json!({ "text": "call Farhan" }))
        .await;
    assert_eq!(outcome, ToolOutcome::ok("Added task: \"call Farhan\" (1 total)"));
}

/// Store errors come back as failed outcomes, never as faults.
#[tokio::test]
async fn vault_errors_become_failed_outcomes() {
    let (temp, dispatcher) =
        dispatcher_with(|store| ToolServices::new(store, vec!["journal/".to_string()], "tasks.md"));
    std::fs::create_dir_all(temp.path().join("journal")).expect("dir");
    std::fs::write(temp.path().join("journal/day.md"), "entry").expect("seed");

    let escape = dispatcher
        .execute("vault_write", json!({ "path": "../x.md", "content": "x" }))
        .await;
    assert!(!escape.success);
    assert!(escape.text.starts_with("vault_write failed: not allowed: path escapes vault root"));

    let protected = dispatcher
        .execute("vault_delete", json!({ "path": "journal/day.md" }))
        .await;
    assert!(!protected.success);
    assert!(temp.path().join("journal/day.md").exists());

    let missing = dispatcher
        .execute("vault_read", json!({ "path": "nope.md" }))
        .await;
    assert_eq!(
        missing,
        ToolOutcome::failed("vault_read failed: document not found: nope.md")
    );
}

/// Successful writes feed the index queue without blocking.
#[tokio::test]
async fn writes_are_queued_for_indexing() {
    let index = Arc::new(RecordingIndex::default());
    let queue = Arc::new(IndexQueue::spawn(index.clone(), 8));
    let worker_queue = queue.clone();
    let (_temp, dispatcher) = dispatcher_with(move |store| {
        ToolServices::new(store, Vec::new(), "tasks.md").with_index_queue(worker_queue)
    });

    assert!(
        dispatcher
            .execute("vault_write", json!({ "path": "a.md", "content": "alpha" }))
            .await
            .success
    );
    assert!(
        dispatcher
            .execute("task_add", json!({ "text": "ship it" }))
            .await
            .success
    );

    let stats = queue.shutdown().await;
    assert_eq!(stats.indexed, 2);
    assert_eq!(
        *index.paths.lock(),
        vec!["a.md".to_string(), "tasks.md".to_string()]
    );
}

/// Index worker that never finishes a job, so queued work stays queued.
struct StalledIndex;

#[async_trait]
impl SemanticSearch for StalledIndex {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<ContextExcerpt>, ContextError> {
        Ok(vec![ContextExcerpt::new("from the index", "remote.md", 0.8)])
    }

    async fn index(&self, _path: &str, _content: &str) -> Result<(), ContextError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Config decides the context strategy and the index queue capacity.
#[tokio::test]
async fn services_follow_context_config() {
    let temp = tempdir().expect("tempdir");
    let store = VaultStore::open(temp.path()).expect("store");
    let config: ScribeConfig = ScribeConfig::load_from_str(
        r#"{ context: { strategy: "semantic", index_queue_capacity: 1 } }"#,
    )
    .expect("config");

    let services = ToolServices::from_config(store.clone(), &config, Some(Arc::new(StalledIndex)));
    let results = services
        .context
        .search("anything", ContextKind::All, 5)
        .await
        .expect("search");
    assert_eq!(results[0].path, "remote.md");

    let queue = services.index_queue.clone().expect("queue");
    let accepted = (0..3)
        .filter(|n| queue.enqueue(format!("n{n}.md"), "x"))
        .count();
    assert!(accepted <= 2, "capacity 1 accepted {accepted} jobs");
    assert!(queue.stats().dropped >= 1);

    let keyword = ToolServices::from_config(store, &ScribeConfig::default(), None);
    assert!(keyword.index_queue.is_none());
}
