//! Correlation ID contexts

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// Contexts older than this are pruned once the store grows past its cap
const CONTEXT_TTL: Duration = Duration::from_secs(600);
const MAX_CONTEXTS: usize = 10_000;

/// State attached to one correlation ID
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    pub started: Instant,
    pub started_at: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

impl CorrelationContext {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            metadata: Map::new(),
        }
    }
}

/// Concurrent store of live correlation contexts
#[derive(Debug, Default)]
pub struct CorrelationStore {
    contexts: DashMap<String, CorrelationContext>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an ID of the form `<epoch-ms>-<9 random chars>`
    pub fn generate_id() -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();
        format!("{}-{}", Utc::now().timestamp_millis(), suffix)
    }

    /// Register a context, generating an ID when none is supplied
    pub fn create(&self, correlation_id: Option<&str>) -> String {
        let id = correlation_id
            .map(str::to_string)
            .unwrap_or_else(Self::generate_id);

        if self.contexts.len() >= MAX_CONTEXTS {
            self.prune_stale();
        }
        self.contexts.insert(id.clone(), CorrelationContext::new());
        id
    }

    pub fn get(&self, correlation_id: &str) -> Option<CorrelationContext> {
        self.contexts.get(correlation_id).map(|c| c.clone())
    }

    /// Merge metadata into an existing context; unknown IDs are ignored
    pub fn update(&self, correlation_id: &str, metadata: Map<String, Value>) {
        if let Some(mut context) = self.contexts.get_mut(correlation_id) {
            context.metadata.extend(metadata);
        }
    }

    pub fn release(&self, correlation_id: &str) {
        self.contexts.remove(correlation_id);
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn prune_stale(&self) {
        self.contexts
            .retain(|_, context| context.started.elapsed() < CONTEXT_TTL);
    }
}
