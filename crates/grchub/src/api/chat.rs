//! Streaming completion gateway.
//!
//! `POST /api/chat` takes the conversation plus an optional category filter,
//! injects the matching slice of the knowledge base into the system prompt,
//! and relays the model's deltas to the caller as SSE frames. Each request is
//! stateless apart from the read-only knowledge store.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use grchub_protocol::{ChatRequest, DONE_SENTINEL, StreamEvent};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::knowledge::context;
use crate::model::BackendMessage;

type SseSender = mpsc::Sender<Result<Event, Infallible>>;

/// Serialize a frame onto the response channel. Returns false once the
/// client has disconnected, which is the signal to stop all work.
async fn emit(tx: &SseSender, event: &StreamEvent) -> bool {
    let Ok(payload) = serde_json::to_string(event) else {
        return false;
    };
    tx.send(Ok(Event::default().data(payload))).await.is_ok()
}

async fn emit_done(tx: &SseSender) {
    let _ = tx.send(Ok(Event::default().data(DONE_SENTINEL))).await;
}

/// Handle a chat request by streaming the model's answer back as SSE.
#[instrument(skip(state, request))]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Sse<KeepAliveStream<ReceiverStream<Result<Event, Infallible>>>>> {
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("Conversation must not be empty"));
    }

    let system = context::system_prompt(&state.store, request.category);

    // Text parts only; empty turns are skipped.
    let messages: Vec<BackendMessage> = request
        .messages
        .iter()
        .filter_map(|message| {
            let content = message.plain_text();
            if content.trim().is_empty() {
                return None;
            }
            Some(BackendMessage {
                role: message.role.to_string(),
                content,
            })
        })
        .collect();

    if messages.is_empty() {
        return Err(ApiError::bad_request("Conversation has no text content"));
    }

    info!(
        turns = messages.len(),
        category = ?request.category,
        "Chat request"
    );

    let model = state.model.clone();
    let deadline = tokio::time::Instant::now() + state.request_timeout;

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(32);

    // Relay task: read a delta, write a frame, until end or error. If the
    // client goes away the channel send fails, the task returns, and the
    // dropped delta stream cancels the upstream call.
    tokio::spawn(async move {
        use futures::StreamExt;

        let started = match tokio::time::timeout_at(deadline, model.stream_chat(&system, &messages))
            .await
        {
            Ok(Ok(stream)) => Some(stream),
            Ok(Err(err)) => {
                debug!(error = %err, "Model call failed before streaming");
                emit(&tx, &StreamEvent::error(err.to_string())).await;
                None
            }
            Err(_) => {
                emit(&tx, &StreamEvent::error("Model request timed out")).await;
                None
            }
        };

        if let Some(mut stream) = started {
            if !emit(&tx, &StreamEvent::Start).await {
                return;
            }

            loop {
                match tokio::time::timeout_at(deadline, stream.next()).await {
                    Ok(Some(Ok(delta))) => {
                        if !emit(&tx, &StreamEvent::text_delta(delta)).await {
                            // Client disconnected; dropping the stream
                            // cancels the upstream request.
                            return;
                        }
                    }
                    Ok(Some(Err(err))) => {
                        debug!(error = %err, "Model stream failed");
                        emit(&tx, &StreamEvent::error(err.to_string())).await;
                        break;
                    }
                    Ok(None) => {
                        emit(&tx, &StreamEvent::Finish).await;
                        break;
                    }
                    Err(_) => {
                        emit(&tx, &StreamEvent::error("Model response timed out")).await;
                        break;
                    }
                }
            }
        }

        emit_done(&tx).await;
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}
