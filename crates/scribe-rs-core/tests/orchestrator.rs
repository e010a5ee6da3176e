//! Orchestrator integration tests with scripted language models.

use autoagents_llm::LLMProvider;
use autoagents_llm::chat::{ChatRole, MessageType};
use futures_util::StreamExt;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use scribe_rs_config::{OrchestratorConfig, ToolPolicy, ToolsConfig};
use scribe_rs_context::{ContextProvider, KeywordContextProvider};
use scribe_rs_core::{Orchestrator, OrchestratorError};
use scribe_rs_protocol::{EventMsg, EventPayload, EventSink, Message, Role};
use scribe_rs_test_utils::{
    AlwaysToolLLM, DummyTool, FailingLLM, PanickingTool, RecordingCollaborator, ScriptedLLM,
    ScriptedReply, base_tool_context, base_tool_services, tool_call,
};
use scribe_rs_tools::{
    CollaboratorSet, ToolContext, ToolDispatcher, ToolRegistry, builtin_tool_registry,
};
use scribe_rs_vault::VaultStore;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<EventMsg>>,
}

impl RecordingSink {
    fn payloads(&self) -> Vec<EventPayload> {
        self.events
            .lock()
            .iter()
            .map(|event| event.payload.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EventMsg) {
        self.events.lock().push(event);
    }
}

fn builtin_orchestrator(root: &Path, llm: Arc<dyn LLMProvider>) -> Orchestrator {
    let dispatcher =
        ToolDispatcher::new(builtin_tool_registry(), base_tool_context(root)).expect("dispatcher");
    Orchestrator::new(llm, dispatcher, None, OrchestratorConfig::default())
}

fn add_task_script() -> ScriptedLLM {
    ScriptedLLM::new(vec![
        ScriptedReply::with_tools(
            "",
            vec![tool_call(
                "call_1",
                "task_add",
                json!({ "text": "call Farhan" }),
            )],
        ),
        ScriptedReply::text("Done - added to today's list."),
    ])
}

/// A task request round-trips through the tool and back to the model.
#[tokio::test]
async fn add_task_end_to_end() {
    let temp = tempdir().expect("tempdir");
    let llm = add_task_script();
    let orchestrator = builtin_orchestrator(temp.path(), Arc::new(llm.clone()));

    let result = orchestrator
        .run(vec![Message::user("add a task: call Farhan")])
        .await
        .expect("run");

    assert_eq!(result.text, "Done - added to today's list.");
    assert_eq!(result.rounds, 2);
    assert!(!result.ceiling_hit);
    assert_eq!(result.tool_results.len(), 1);
    let audit = &result.tool_results[0];
    assert_eq!(audit.tool_name, "task_add");
    assert_eq!(audit.tool_input, json!({ "text": "call Farhan" }));
    assert_eq!(audit.result_text, "Added task: \"call Farhan\" (1 total)");
    assert!(audit.success);

    let roles = result
        .messages
        .iter()
        .map(|message| message.role)
        .collect::<Vec<_>>();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(
        std::fs::read_to_string(temp.path().join("tasks.md")).expect("tasks"),
        "- [ ] call Farhan\n"
    );

    let requests = llm.requests.lock();
    assert_eq!(requests.len(), 2);
    let echoed = requests[1].last().expect("tool result message");
    assert!(matches!(echoed.role, ChatRole::Tool));
    match &echoed.message_type {
        MessageType::ToolResult(calls) => {
            assert_eq!(calls[0].id, "call_1");
            assert_eq!(
                calls[0].function.arguments,
                "Added task: \"call Farhan\" (1 total)"
            );
        }
        other => panic!("unexpected message type: {other:?}"),
    }
}

/// A model that never stops asking for tools is cut off at the ceiling.
#[tokio::test]
async fn round_ceiling_stops_runaway_model() {
    let temp = tempdir().expect("tempdir");
    let llm = AlwaysToolLLM::new("task_list", json!({}));
    let orchestrator = builtin_orchestrator(temp.path(), Arc::new(llm.clone()));

    let result = orchestrator
        .run(vec![Message::user("keep going")])
        .await
        .expect("run");

    assert!(result.ceiling_hit);
    assert_eq!(result.rounds, 10);
    assert_eq!(llm.call_count(), 10);
    assert_eq!(result.tool_results.len(), 10);
    assert!(result.text.starts_with("Step 1."));
    assert!(result.text.contains("[Stopped after 10 rounds"));
}

/// Configured ceilings below the default are honoured.
#[tokio::test]
async fn configured_ceiling_is_used() {
    let temp = tempdir().expect("tempdir");
    let llm = AlwaysToolLLM::new("task_list", json!({}));
    let dispatcher = ToolDispatcher::new(builtin_tool_registry(), base_tool_context(temp.path()))
        .expect("dispatcher");
    let config = OrchestratorConfig {
        max_rounds: 3,
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::new(Arc::new(llm.clone()), dispatcher, None, config);

    let result = orchestrator
        .run(vec![Message::user("loop")])
        .await
        .expect("run");
    assert_eq!((result.rounds, result.ceiling_hit), (3, true));
    assert_eq!(llm.call_count(), 3);
}

/// A panicking tool becomes a failed result and the model gets to react.
#[tokio::test]
async fn panicking_tool_does_not_end_the_turn() {
    let temp = tempdir().expect("tempdir");
    let registry = ToolRegistry::new();
    registry.register(Arc::new(PanickingTool::new("explode")));
    let dispatcher =
        ToolDispatcher::new(registry, base_tool_context(temp.path())).expect("dispatcher");
    let llm = ScriptedLLM::new(vec![
        ScriptedReply::with_tools("Trying.", vec![tool_call("c1", "explode", json!({}))]),
        ScriptedReply::text("That tool is broken, sorry."),
    ]);
    let orchestrator = Orchestrator::new(
        Arc::new(llm.clone()),
        dispatcher,
        None,
        OrchestratorConfig::default(),
    );

    let result = orchestrator
        .run(vec![Message::user("blow up")])
        .await
        .expect("run");

    assert_eq!(result.text, "That tool is broken, sorry.");
    assert_eq!(result.tool_results.len(), 1);
    assert!(!result.tool_results[0].success);
    assert_eq!(
        result.tool_results[0].result_text,
        "explode failed: tool panicked: explode exploded"
    );
    assert_eq!(llm.call_count(), 2);
}

/// Custom tools sit next to the built-ins and collaborators receive their payloads.
#[tokio::test]
async fn custom_tools_and_collaborators_join_the_turn() {
    let temp = tempdir().expect("tempdir");
    let registry = builtin_tool_registry();
    registry.register(Arc::new(
        DummyTool::new("weather")
            .with_description("Current weather")
            .with_result("Sunny, 21C"),
    ));
    let messaging = RecordingCollaborator::new();
    let services = base_tool_services(temp.path())
        .with_collaborators(CollaboratorSet::new().with("messaging", Arc::new(messaging.clone())));
    let dispatcher =
        ToolDispatcher::new(registry, ToolContext::new(services)).expect("dispatcher");
    let llm = ScriptedLLM::new(vec![
        ScriptedReply::with_tools(
            "Checking.",
            vec![
                tool_call("w1", "weather", json!({})),
                tool_call(
                    "m1",
                    "send_message",
                    json!({ "channel": "messaging", "to": "Sam", "body": "Picnic is on" }),
                ),
            ],
        ),
        ScriptedReply::text("Told Sam the picnic is on."),
    ]);
    let orchestrator = Orchestrator::new(
        Arc::new(llm),
        dispatcher,
        None,
        OrchestratorConfig::default(),
    );

    let result = orchestrator
        .run(vec![Message::user("if it is sunny tell Sam the picnic is on")])
        .await
        .expect("run");

    let outcomes = result
        .tool_results
        .iter()
        .map(|result| (result.tool_name.as_str(), result.result_text.as_str(), result.success))
        .collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        vec![
            ("weather", "Sunny, 21C", true),
            ("send_message", "Sent messaging message to Sam: delivered", true),
        ]
    );
    assert_eq!(
        *messaging.payloads.lock(),
        vec![json!({ "to": "Sam", "body": "Picnic is on" })]
    );
    assert_eq!(result.text, "Told Sam the picnic is on.");
}

/// Unknown tools and malformed input are failures the loop carries on from.
#[tokio::test]
async fn unknown_tools_and_bad_input_are_data() {
    let temp = tempdir().expect("tempdir");
    let llm = ScriptedLLM::new(vec![
        ScriptedReply::with_tools(
            "",
            vec![
                tool_call("a", "launch_rocket", json!({})),
                tool_call("b", "vault_read", json!("notes/today.md")),
                tool_call("c", "task_list", json!({})),
            ],
        ),
        ScriptedReply::text("Some of that failed."),
    ]);
    let orchestrator = builtin_orchestrator(temp.path(), Arc::new(llm));

    let result = orchestrator
        .run(vec![Message::user("do things")])
        .await
        .expect("run");

    let outcomes = result
        .tool_results
        .iter()
        .map(|result| (result.result_text.as_str(), result.success))
        .collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        vec![
            ("Unknown tool: launch_rocket", false),
            (
                "vault_read failed: invalid input: tool input must be a JSON object",
                false
            ),
            ("No tasks yet", true),
        ]
    );
    assert_eq!(result.text, "Some of that failed.");
}

/// Streaming emits tokens and tool events in order, then one summary.
#[tokio::test]
async fn streaming_events_follow_the_turn() {
    let temp = tempdir().expect("tempdir");
    let llm = ScriptedLLM::new(vec![
        ScriptedReply::with_tools(
            "Adding it.",
            vec![tool_call(
                "call_1",
                "task_add",
                json!({ "text": "call Farhan" }),
            )],
        ),
        ScriptedReply::text("All set."),
    ]);
    let orchestrator = builtin_orchestrator(temp.path(), Arc::new(llm));
    let sink = Arc::new(RecordingSink::default());

    let result = orchestrator
        .run_with_sink(vec![Message::user("add a task: call Farhan")], sink.clone())
        .await
        .expect("run");

    let token = |text: &str| EventPayload::Token {
        text: text.to_string(),
    };
    assert_eq!(
        sink.payloads(),
        vec![
            token("Adding "),
            token("it."),
            EventPayload::ToolStart {
                name: "task_add".to_string(),
                input: json!({ "text": "call Farhan" }),
            },
            EventPayload::ToolDone {
                name: "task_add".to_string(),
                result: "Added task: \"call Farhan\" (1 total)".to_string(),
                success: true,
            },
            token("All "),
            token("set."),
            EventPayload::Summary {
                text: "All set.".to_string(),
                tool_results: result.tool_results.clone(),
                rounds: 2,
                ceiling_hit: false,
            },
        ]
    );
    let turn_ids = sink
        .events
        .lock()
        .iter()
        .map(|event| event.turn_id)
        .collect::<std::collections::HashSet<_>>();
    assert_eq!(turn_ids.len(), 1);
    assert!(turn_ids.contains(&result.turn_id));
}

/// A model failure is the one hard error, announced before it propagates.
#[tokio::test]
async fn model_failure_propagates_after_error_event() {
    let temp = tempdir().expect("tempdir");
    let orchestrator = builtin_orchestrator(temp.path(), Arc::new(FailingLLM::new("offline")));
    let sink = Arc::new(RecordingSink::default());

    let err = orchestrator
        .run_with_sink(vec![Message::user("hello")], sink.clone())
        .await
        .expect_err("model failure");
    match err {
        OrchestratorError::Model(message) => assert!(message.contains("offline")),
        other => panic!("unexpected error: {other:?}"),
    }

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    match &payloads[0] {
        EventPayload::Error { message } => assert!(message.contains("offline")),
        other => panic!("unexpected event: {other:?}"),
    }
}

/// The background stream ends with a summary and finish returns the result.
#[tokio::test]
async fn run_stream_delivers_events_and_result() {
    let temp = tempdir().expect("tempdir");
    let orchestrator = builtin_orchestrator(temp.path(), Arc::new(add_task_script()));

    let mut stream = orchestrator.run_stream(vec![Message::user("add a task: call Farhan")]);
    let turn_id = stream.turn_id;
    let mut kinds = Vec::new();
    while let Some(event) = stream.events.next().await {
        let event = event.expect("event");
        assert_eq!(event.turn_id, turn_id);
        let terminal = event.payload.is_terminal();
        kinds.push(event.payload);
        if terminal {
            break;
        }
    }
    assert!(matches!(kinds.last(), Some(EventPayload::Summary { .. })));
    assert!(
        kinds
            .iter()
            .any(|payload| matches!(payload, EventPayload::ToolDone { success: true, .. }))
    );

    let result = stream.finish().await.expect("finish");
    assert_eq!(result.turn_id, turn_id);
    assert_eq!(result.text, "Done - added to today's list.");
}

/// Vault context and the policy-filtered catalog both reach the model.
#[tokio::test]
async fn prompt_carries_context_and_allowed_tools() {
    let temp = tempdir().expect("tempdir");
    let store = VaultStore::open(temp.path()).expect("store");
    store
        .write("projects/garden.md", "Plant tomatoes in May.")
        .expect("seed");
    let context: Arc<dyn ContextProvider> =
        Arc::new(KeywordContextProvider::new(store, "tasks.md"));
    let tools_config = ToolsConfig {
        policy: ToolPolicy {
            allow: vec!["*".to_string()],
            deny: vec!["send_*".to_string(), "trigger_*".to_string()],
        },
        ..ToolsConfig::default()
    };
    let dispatcher = ToolDispatcher::from_config(
        builtin_tool_registry(),
        base_tool_context(temp.path()),
        &tools_config,
    )
    .expect("dispatcher");
    let llm = ScriptedLLM::new(vec![ScriptedReply::text("In May.")]);
    let orchestrator = Orchestrator::new(
        Arc::new(llm.clone()),
        dispatcher,
        Some(context),
        OrchestratorConfig::default(),
    );

    let result = orchestrator
        .run(vec![Message::user("when should I plant tomatoes?")])
        .await
        .expect("run");
    assert_eq!(result.text, "In May.");
    assert_eq!(result.rounds, 1);

    let requests = llm.requests.lock();
    let system = &requests[0][0];
    assert!(matches!(system.role, ChatRole::System));
    assert!(system.content.contains("## Vault context"));
    assert!(system.content.contains("projects/garden.md"));

    let seen = llm.seen_tools.lock().clone();
    assert_eq!(seen.len(), 11);
    assert!(!seen.iter().any(|name| name.starts_with("send_")));
    assert!(seen.contains(&"task_add".to_string()));
}
