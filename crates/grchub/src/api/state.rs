//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::knowledge::KnowledgeStore;
use crate::model::ModelBackend;

/// Application state shared across all handlers.
///
/// The knowledge store is the only cross-request state and it is read-only,
/// so no locking is involved anywhere in the request path.
#[derive(Clone)]
pub struct AppState {
    /// The knowledge base, loaded once at startup.
    pub store: Arc<KnowledgeStore>,
    /// Streaming completion provider behind the chat gateway.
    pub model: Arc<dyn ModelBackend>,
    /// Wall-clock budget for one whole chat exchange.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: KnowledgeStore,
        model: Arc<dyn ModelBackend>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store: Arc::new(store),
            model,
            request_timeout,
        }
    }
}
