//! Context provider interface and the keyword/semantic strategies.

use crate::error::ContextError;
use crate::model::{ContextExcerpt, ContextKind, clamp_score};
use async_trait::async_trait;
use log::{debug, info, warn};
use scribe_rs_vault::{VaultError, VaultStore};
use std::sync::Arc;

/// Documents larger than this are skipped by the keyword scan.
const MAX_SCAN_BYTES: u64 = 1024 * 1024;
/// Score added when a query word appears in the document path.
const PATH_BONUS: f32 = 3.0;
/// Per-word cap on counted content hits.
const MAX_HITS_PER_WORD: usize = 10;
/// Maximum excerpt length in characters.
const EXCERPT_CHARS: usize = 280;

#[async_trait]
/// Ranks vault excerpts for a free-text query.
pub trait ContextProvider: Send + Sync {
    /// Return up to `limit` excerpts sorted by descending score.
    async fn search(
        &self,
        query: &str,
        kind: ContextKind,
        limit: usize,
    ) -> Result<Vec<ContextExcerpt>, ContextError>;
}

#[async_trait]
/// External semantic-search collaborator.
pub trait SemanticSearch: Send + Sync {
    /// Search the external index.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContextExcerpt>, ContextError>;

    /// Add or refresh a document in the external index.
    async fn index(&self, path: &str, content: &str) -> Result<(), ContextError>;
}

/// Local strategy: keyword hits plus a path bonus over every document.
#[derive(Debug, Clone)]
pub struct KeywordContextProvider {
    store: VaultStore,
    tasks_file: String,
}

impl KeywordContextProvider {
    pub fn new(store: VaultStore, tasks_file: impl Into<String>) -> Self {
        let tasks_file = tasks_file.into();
        info!(
            "initialized keyword context provider (root={}, tasks_file={})",
            store.root().display(),
            tasks_file
        );
        Self { store, tasks_file }
    }

    /// Synchronous scan shared by both strategies.
    pub fn scan(
        &self,
        query: &str,
        kind: ContextKind,
        limit: usize,
    ) -> Result<Vec<ContextExcerpt>, ContextError> {
        let words = query_words(query);
        if words.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut scored = Vec::new();
        for entry in self.store.list("")? {
            if !kind.admits(&entry.path, &self.tasks_file) || entry.size > MAX_SCAN_BYTES {
                continue;
            }
            let content = match self.store.read(&entry.path) {
                Ok(content) => content,
                Err(VaultError::Io(err)) if err.kind() == std::io::ErrorKind::InvalidData => {
                    debug!("skipping non-text document (path={})", entry.path);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let raw = raw_score(&words, &entry.path, &content);
            if raw > 0.0 {
                scored.push((raw, entry.path, excerpt_for(&words, &content)));
            }
        }

        let max = scored.iter().map(|(raw, _, _)| *raw).fold(0.0_f32, f32::max);
        let mut results = scored
            .into_iter()
            .map(|(raw, path, excerpt)| ContextExcerpt::new(excerpt, path, raw / max))
            .collect::<Vec<_>>();
        sort_excerpts(&mut results);
        results.truncate(limit);
        debug!(
            "keyword context search (words={}, results={})",
            words.len(),
            results.len()
        );
        Ok(results)
    }

    /// Run [`Self::scan`] on the blocking pool; it walks and reads the whole vault.
    async fn scan_blocking(
        &self,
        query: &str,
        kind: ContextKind,
        limit: usize,
    ) -> Result<Vec<ContextExcerpt>, ContextError> {
        let provider = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || provider.scan(&query, kind, limit))
            .await
            .map_err(|err| ContextError::Search(format!("keyword scan task failed: {err}")))?
    }
}

#[async_trait]
impl ContextProvider for KeywordContextProvider {
    async fn search(
        &self,
        query: &str,
        kind: ContextKind,
        limit: usize,
    ) -> Result<Vec<ContextExcerpt>, ContextError> {
        self.scan_blocking(query, kind, limit).await
    }
}

/// Delegates to an external service, falling back to the keyword scan on failure.
#[derive(Clone)]
pub struct SemanticContextProvider {
    service: Arc<dyn SemanticSearch>,
    fallback: KeywordContextProvider,
}

impl SemanticContextProvider {
    pub fn new(service: Arc<dyn SemanticSearch>, fallback: KeywordContextProvider) -> Self {
        Self { service, fallback }
    }
}

#[async_trait]
impl ContextProvider for SemanticContextProvider {
    async fn search(
        &self,
        query: &str,
        kind: ContextKind,
        limit: usize,
    ) -> Result<Vec<ContextExcerpt>, ContextError> {
        match self.service.search(query, limit).await {
            Ok(results) => {
                let mut results = results
                    .into_iter()
                    .filter(|excerpt| kind.admits(&excerpt.path, &self.fallback.tasks_file))
                    .map(|mut excerpt| {
                        excerpt.score = clamp_score(excerpt.score);
                        excerpt
                    })
                    .collect::<Vec<_>>();
                sort_excerpts(&mut results);
                results.truncate(limit);
                Ok(results)
            }
            Err(err) => {
                warn!("semantic search failed, using keyword fallback: {err}");
                self.fallback.scan_blocking(query, kind, limit).await
            }
        }
    }
}

/// Lowercased query words longer than two characters, deduplicated.
fn query_words(query: &str) -> Vec<String> {
    let mut words = Vec::new();
    for word in query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
    {
        if !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

fn raw_score(words: &[String], path: &str, content: &str) -> f32 {
    let content = content.to_lowercase();
    let path = path.to_lowercase();
    words
        .iter()
        .map(|word| {
            let hits = content.matches(word.as_str()).take(MAX_HITS_PER_WORD).count() as f32;
            let bonus = if path.contains(word.as_str()) {
                PATH_BONUS
            } else {
                0.0
            };
            hits + bonus
        })
        .sum()
}

/// The first line mentioning a query word, with its neighbors.
fn excerpt_for(words: &[String], content: &str) -> String {
    let lines = content.lines().collect::<Vec<_>>();
    let hit = lines
        .iter()
        .position(|line| {
            let line = line.to_lowercase();
            words.iter().any(|word| line.contains(word.as_str()))
        })
        .unwrap_or(0);
    let start = hit.saturating_sub(1);
    let end = (hit + 2).min(lines.len());
    let joined = lines.get(start..end).unwrap_or_default().join("\n");
    let trimmed = joined.trim();
    if trimmed.chars().count() > EXCERPT_CHARS {
        let cut = trimmed.chars().take(EXCERPT_CHARS).collect::<String>();
        format!("{cut}…")
    } else {
        trimmed.to_string()
    }
}

fn sort_excerpts(results: &mut [ContextExcerpt]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.path.cmp(&b.path))
    });
}
