//! Stream-event frames carried over the chat SSE channel.

use serde::{Deserialize, Serialize};

/// Literal data frame written after the last [`StreamEvent`] to mark the end
/// of the stream. Kept separate from the typed events so clients can stop
/// reading without attempting to parse it.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One frame of the gateway's response stream, serialized as the `data:`
/// payload of an SSE event.
///
/// Frame order within one request: `start`, zero or more `text-delta`
/// frames (arrival order preserved), then `finish` on normal completion or
/// `error` on upstream failure/timeout, then [`DONE_SENTINEL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// The gateway accepted the request and is about to stream.
    Start,
    /// One incremental chunk of assistant text.
    TextDelta { delta: String },
    /// Normal end of the assistant turn.
    Finish,
    /// Terminal failure; partial text already delivered stays valid.
    Error { message: String },
}

impl StreamEvent {
    pub fn text_delta(delta: impl Into<String>) -> Self {
        Self::TextDelta {
            delta: delta.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
