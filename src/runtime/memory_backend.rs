//! Scored key/value memory: async `store`/`retrieve`/`clear` contract plus
//! the in-memory default implementation's case-insensitive scoring.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use crate::runtime::errors::{AxonRuntimeError, ErrorContext};
use crate::runtime::tracer::Tracer;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub key: String,
    pub value: String,
    pub metadata: HashMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait MemoryBackend: Send + Sync {
    async fn store(
        &self,
        key: &str,
        value: &str,
        metadata: HashMap<String, Value>,
    ) -> Result<MemoryEntry, AxonRuntimeError>;

    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        scope: Option<&str>,
    ) -> Vec<MemoryEntry>;

    async fn clear(&self, scope: Option<&str>) -> usize;
}

pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    tracer: Option<Arc<Mutex<Tracer>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            tracer: None,
        }
    }

    pub fn with_tracer(tracer: Arc<Mutex<Tracer>>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            tracer: Some(tracer),
        }
    }

    async fn emit(&self, event_type: &str, data: Value) {
        if let Some(tracer) = &self.tracer {
            let mut guard: MutexGuard<'_, Tracer> = tracer.lock().await;
            guard.emit(event_type, None, Some(data), None);
        }
    }

    fn score(key: &str, value: &str, query: &str) -> f64 {
        let key = key.to_lowercase();
        let value = value.to_lowercase();
        let query = query.to_lowercase();
        if key == query {
            1.0
        } else if key.contains(&query) {
            0.7
        } else if value.contains(&query) {
            0.4
        } else {
            0.0
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    async fn store(
        &self,
        key: &str,
        value: &str,
        metadata: HashMap<String, Value>,
    ) -> Result<MemoryEntry, AxonRuntimeError> {
        if key.is_empty() {
            return Err(AxonRuntimeError::validation(
                "memory key must not be empty",
                ErrorContext::default(),
            ));
        }
        let entry = MemoryEntry {
            key: key.to_string(),
            value: value.to_string(),
            metadata,
            timestamp: Utc::now(),
        };
        self.entries
            .lock()
            .await
            .insert(key.to_string(), entry.clone());
        self.emit("memory_write", serde_json::json!({ "key": key })).await;
        Ok(entry)
    }

    async fn retrieve(&self, query: &str, top_k: usize, scope: Option<&str>) -> Vec<MemoryEntry> {
        let entries = self.entries.lock().await;
        let mut scored: Vec<(f64, MemoryEntry)> = entries
            .values()
            .filter(|e| match scope {
                Some(scope) => e
                    .metadata
                    .get("scope")
                    .and_then(Value::as_str)
                    .map(|s| s == scope)
                    .unwrap_or(false),
                None => true,
            })
            .filter_map(|e| {
                let score = Self::score(&e.key, &e.value, query);
                (score > 0.0).then(|| (score, e.clone()))
            })
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap()
                .then(b.timestamp.cmp(&a.timestamp))
        });

        self.emit(
            "memory_read",
            serde_json::json!({ "query": query, "top_k": top_k }),
        )
        .await;

        scored.into_iter().take(top_k).map(|(_, e)| e).collect()
    }

    async fn clear(&self, scope: Option<&str>) -> usize {
        let mut entries = self.entries.lock().await;
        match scope {
            Some(scope) => {
                let before = entries.len();
                entries.retain(|_, e| {
                    e.metadata
                        .get("scope")
                        .and_then(Value::as_str)
                        .map(|s| s != scope)
                        .unwrap_or(true)
                });
                before - entries.len()
            }
            None => {
                let count = entries.len();
                entries.clear();
                count
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_key_store_is_rejected() {
        let backend = InMemoryBackend::new();
        assert!(backend.store("", "x", HashMap::new()).await.is_err());
    }

    #[tokio::test]
    async fn exact_key_match_outranks_substring_matches() {
        let backend = InMemoryBackend::new();
        backend.store("project-x", "alpha", HashMap::new()).await.unwrap();
        backend
            .store("my-project-x-notes", "alpha", HashMap::new())
            .await
            .unwrap();
        let results = backend.retrieve("project-x", 10, None).await;
        assert_eq!(results[0].key, "project-x");
    }

    #[tokio::test]
    async fn value_substring_match_scores_lowest() {
        let backend = InMemoryBackend::new();
        backend
            .store("unrelated", "mentions widget somewhere", HashMap::new())
            .await
            .unwrap();
        let results = backend.retrieve("widget", 10, None).await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn scope_filter_excludes_other_scopes() {
        let backend = InMemoryBackend::new();
        let mut meta_a = HashMap::new();
        meta_a.insert("scope".to_string(), serde_json::json!("work"));
        backend.store("a", "work-item", meta_a).await.unwrap();
        let mut meta_b = HashMap::new();
        meta_b.insert("scope".to_string(), serde_json::json!("personal"));
        backend.store("b", "work-item", meta_b).await.unwrap();
        let results = backend.retrieve("work-item", 10, Some("work")).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "a");
    }

    #[tokio::test]
    async fn clear_with_no_scope_removes_everything() {
        let backend = InMemoryBackend::new();
        backend.store("a", "x", HashMap::new()).await.unwrap();
        backend.store("b", "y", HashMap::new()).await.unwrap();
        assert_eq!(backend.clear(None).await, 2);
    }

    #[tokio::test]
    async fn top_k_truncates_results() {
        let backend = InMemoryBackend::new();
        for i in 0..5 {
            backend
                .store(&format!("item-{i}"), "item", HashMap::new())
                .await
                .unwrap();
        }
        let results = backend.retrieve("item", 2, None).await;
        assert_eq!(results.len(), 2);
    }
}
