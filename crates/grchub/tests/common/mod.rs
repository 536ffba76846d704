//! Test utilities and common setup.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use futures::stream;
use grchub::api::{self, AppState};
use grchub::knowledge::KnowledgeStore;
use grchub::model::{BackendMessage, DeltaStream, ModelBackend, ModelError};

/// Scripted model backend: streams a fixed delta sequence or fails on
/// demand, and counts how often it is invoked so tests can assert that
/// rejected requests never reach the model.
pub struct MockBackend {
    deltas: Vec<String>,
    fail_on_call: Option<String>,
    fail_mid_stream: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn streaming(deltas: &[&str]) -> Self {
        Self {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            fail_on_call: None,
            fail_mid_stream: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails before any delta is produced.
    pub fn failing(message: &str) -> Self {
        Self {
            deltas: Vec::new(),
            fail_on_call: Some(message.to_string()),
            fail_mid_stream: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Streams the given deltas, then fails.
    pub fn failing_mid_stream(deltas: &[&str], message: &str) -> Self {
        Self {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            fail_on_call: None,
            fail_mid_stream: Some(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared invocation counter.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait::async_trait]
impl ModelBackend for MockBackend {
    async fn stream_chat(
        &self,
        _system: &str,
        _messages: &[BackendMessage],
    ) -> Result<DeltaStream, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_on_call {
            return Err(ModelError::Upstream {
                status: 502,
                body: message.clone(),
            });
        }

        let mut items: Vec<Result<String, ModelError>> =
            self.deltas.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.fail_mid_stream {
            items.push(Err(ModelError::Stream(message.clone())));
        }
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Build the application router around the given backend, with the default
/// knowledge feed and a short request budget.
pub fn test_app(model: Arc<dyn ModelBackend>) -> Router {
    let store = KnowledgeStore::load_default().expect("default feed loads");
    let state = AppState::new(store, model, Duration::from_secs(5));
    Router::new().nest("/api", api::create_router(state, &[]))
}

/// Extract the `data:` payloads from an SSE body, skipping keep-alives.
pub fn sse_data_frames(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|payload| payload.to_string())
        .collect()
}
