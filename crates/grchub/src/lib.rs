//! GRC Hub backend library.
//!
//! Serves a fixed governance/risk/compliance knowledge base over HTTP and
//! relays a streaming chat assistant grounded in that knowledge base. The
//! binary in `main.rs` wires this together; integration tests drive the
//! router directly.

pub mod api;
pub mod client;
pub mod config;
pub mod knowledge;
pub mod model;
pub mod session;
