//! External model collaborator.
//!
//! The gateway needs exactly one capability from the language-model
//! provider: given a system instruction and an ordered list of role-tagged
//! messages, produce a streaming sequence of text deltas or fail. That
//! capability is the [`ModelBackend`] trait; provider identity lives in
//! configuration. Dropping the returned stream cancels the upstream request.

mod openai;

use futures::stream::BoxStream;
use thiserror::Error;

pub use openai::OpenAiBackend;

/// Errors from the model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model backend not configured: {0}")]
    Config(String),

    #[error("model request failed: {0}")]
    Request(String),

    #[error("model upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("model stream error: {0}")]
    Stream(String),
}

/// One role-tagged turn in the shape the completion API expects.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackendMessage {
    pub role: String,
    pub content: String,
}

/// Stream of incremental assistant text.
pub type DeltaStream = BoxStream<'static, Result<String, ModelError>>;

/// A streaming chat-completion provider.
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    /// Start a streaming completion. Deltas arrive in model order; the
    /// stream ends on completion or yields a terminal `Err`.
    async fn stream_chat(
        &self,
        system: &str,
        messages: &[BackendMessage],
    ) -> Result<DeltaStream, ModelError>;
}
