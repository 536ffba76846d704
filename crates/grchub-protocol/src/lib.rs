//! Canonical protocol types for the GRC Hub chat boundary.
//!
//! This crate defines the message and stream-event formats spoken across the
//! chat boundary:
//!
//! ```text
//! Client <--[POST /api/chat: ChatRequest]--> Gateway <--[SSE: StreamEvent frames]--> Client
//! ```
//!
//! Clients speak only the canonical protocol. They do not know or care which
//! model provider sits behind the gateway.
//!
//! ## Design Principles
//!
//! 1. **Parts are the atomic content unit.** A message is an ordered list of
//!    typed parts; today only text parts exist, but the tagged representation
//!    leaves room for more.
//! 2. **Stream events form a state machine.** A well-behaved stream is
//!    `start`, zero or more `text-delta` frames, then exactly one of
//!    `finish` or `error`, followed by the `[DONE]` sentinel.
//! 3. **Absent category means all categories.** The gateway treats a missing
//!    `category` as "answer over the whole knowledge base".

pub mod events;
pub mod messages;

pub use events::{DONE_SENTINEL, StreamEvent};
pub use messages::{Category, ChatMessage, ChatRequest, MessagePart, MessageRole};
