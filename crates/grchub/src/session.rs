//! Client-side chat session state machine.
//!
//! Owns the conversation and the in-flight request lifecycle; does no I/O of
//! its own. A driver (the terminal client, a test) calls [`ChatSession::submit`],
//! ships the returned snapshot to the gateway, and feeds stream results back
//! through [`ChatSession::apply_delta`] and friends. Views subscribe to a
//! revision counter and re-read the session on every change.
//!
//! Every submission carries a generation number. Results are only applied
//! while their generation is current, so deltas from a request that was
//! in flight when the session was reset land nowhere.

use grchub_protocol::{Category, ChatMessage, ChatRequest, MessageRole};
use tokio::sync::watch;

/// Request lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No request in flight.
    Idle,
    /// Request sent, no delta received yet.
    Submitting,
    /// Receiving deltas.
    Streaming,
}

/// Snapshot handed to the transport on a successful submit.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Generation fencing this request's stream results.
    pub generation: u64,
    /// The request body to POST to the gateway.
    pub request: ChatRequest,
}

/// The conversation plus its current request lifecycle state.
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    state: SessionState,
    category: Option<Category>,
    generation: u64,
    last_error: Option<String>,
    revision: watch::Sender<u64>,
}

impl ChatSession {
    pub fn new(category: Option<Category>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            messages: Vec::new(),
            state: SessionState::Idle,
            category,
            generation: 0,
            last_error: None,
            revision,
        }
    }

    /// Subscribe to change notifications. The value is a revision counter;
    /// re-read the session state on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    /// Switch the active filter. Takes effect on the next submission; the
    /// conversation is kept.
    pub fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
        self.notify();
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, SessionState::Submitting | SessionState::Streaming)
    }

    /// True exactly in the window between submit and the first delta, which
    /// is when a view shows its loading indicator.
    pub fn show_typing_indicator(&self) -> bool {
        self.state == SessionState::Submitting
    }

    /// Error from the most recent failed request, cleared on the next
    /// submission or reset.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Submit user input. Rejected (returns `None`, conversation unchanged)
    /// when the text is empty/whitespace or a request is already in flight.
    pub fn submit(&mut self, text: &str) -> Option<Submission> {
        let text = text.trim();
        if text.is_empty() || self.state != SessionState::Idle {
            return None;
        }

        self.messages.push(ChatMessage::text(MessageRole::User, text));
        self.state = SessionState::Submitting;
        self.last_error = None;
        self.generation += 1;

        let submission = Submission {
            generation: self.generation,
            request: ChatRequest {
                messages: self.messages.clone(),
                category: self.category,
            },
        };
        self.notify();
        Some(submission)
    }

    /// Apply one streamed delta. The first delta creates the assistant
    /// message; later ones append to it. Stale generations are discarded.
    pub fn apply_delta(&mut self, generation: u64, delta: &str) {
        if generation != self.generation || !self.is_busy() {
            return;
        }

        match self.state {
            SessionState::Submitting => {
                self.messages
                    .push(ChatMessage::text(MessageRole::Assistant, delta));
                self.state = SessionState::Streaming;
            }
            SessionState::Streaming => {
                if let Some(message) = self.messages.last_mut() {
                    message.push_text(delta);
                }
            }
            SessionState::Idle => unreachable!("guarded by is_busy above"),
        }
        self.notify();
    }

    /// Normal end of stream; the assistant message is final from here on.
    pub fn finish(&mut self, generation: u64) {
        if generation != self.generation || !self.is_busy() {
            return;
        }
        self.state = SessionState::Idle;
        self.notify();
    }

    /// Stream failed. The conversation is left as-is: the user message stays
    /// visible, a partial assistant message stays in whatever state it
    /// reached.
    pub fn fail(&mut self, generation: u64, message: impl Into<String>) {
        if generation != self.generation || !self.is_busy() {
            return;
        }
        self.state = SessionState::Idle;
        self.last_error = Some(message.into());
        self.notify();
    }

    /// Clean client-side abort; not an error.
    pub fn abort(&mut self, generation: u64) {
        if generation != self.generation || !self.is_busy() {
            return;
        }
        self.state = SessionState::Idle;
        self.notify();
    }

    /// Clear the whole session. Bumps the generation so deltas from any
    /// request still in flight are discarded instead of landing in the
    /// cleared conversation.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.state = SessionState::Idle;
        self.last_error = None;
        self.generation += 1;
        self.notify();
    }

    fn notify(&mut self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// Fixed example queries offered while the conversation is empty, keyed by
/// the active category filter.
pub fn suggested_queries(category: Option<Category>) -> &'static [&'static str] {
    match category {
        None => &[
            "What are the top critical risks?",
            "Show me all compliance gaps",
            "Summarize regulatory deadlines",
            "What are the priority recommendations?",
        ],
        Some(Category::Risks) => &[
            "List all critical and high severity risks",
            "What risks are currently active?",
            "Which risks have recommendations?",
            "Show vendor-related risks",
        ],
        Some(Category::Compliance) => &[
            "Which compliance items need immediate attention?",
            "Show GDPR compliance status",
            "List all SOC 2 findings",
            "What frameworks are we tracking?",
        ],
        Some(Category::Regulatory) => &[
            "What are the upcoming regulatory deadlines?",
            "Show EU regulations affecting us",
            "List US regulatory requirements",
            "What is the EU AI Act impact?",
        ],
        Some(Category::Recommendation) => &[
            "Prioritize recommendations by impact",
            "What is Zero Trust Architecture?",
            "Show automation recommendations",
            "Which recommendations reduce risk most?",
        ],
    }
}
