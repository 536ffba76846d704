//! OpenAI-compatible streaming chat-completions backend.

use futures::StreamExt;
use reqwest_eventsource::{Error as EsError, Event as SseEvent, EventSource};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::config::ModelConfig;
use crate::model::{BackendMessage, DeltaStream, ModelBackend, ModelError};

/// Sentinel the completion APIs write as the final SSE data frame.
const UPSTREAM_DONE: &str = "[DONE]";

/// Talks to any OpenAI-compatible `/chat/completions` endpoint with
/// `stream: true`. Which provider that is (OpenAI, OpenRouter, a local
/// gateway) is purely configuration.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: Option<f32>,
}

impl OpenAiBackend {
    /// Resolve the backend from config. A missing API key is not fatal here;
    /// chat requests fail with [`ModelError::Config`] until it is set, while
    /// the rest of the service stays usable.
    pub fn from_config(config: &ModelConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
        }
    }
}

#[async_trait::async_trait]
impl ModelBackend for OpenAiBackend {
    async fn stream_chat(
        &self,
        system: &str,
        messages: &[BackendMessage],
    ) -> Result<DeltaStream, ModelError> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            ModelError::Config(format!(
                "API key missing; set the {} environment variable",
                self.api_key_env
            ))
        })?;

        let mut payload = Vec::with_capacity(messages.len() + 1);
        payload.push(BackendMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
        payload.extend(messages.iter().cloned());

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": payload,
            "stream": true,
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body);

        let mut es =
            EventSource::new(request).map_err(|e| ModelError::Request(e.to_string()))?;

        debug!(model = %self.model, "Starting streaming completion");

        // Bridge the upstream SSE into a delta stream through a channel.
        // Dropping the returned stream closes the receiver; the next send
        // fails and the task drops the EventSource, cancelling the request.
        let (tx, rx) = mpsc::channel::<Result<String, ModelError>>(32);

        tokio::spawn(async move {
            while let Some(event) = es.next().await {
                match event {
                    Ok(SseEvent::Open) => {}
                    Ok(SseEvent::Message(msg)) => {
                        if msg.data == UPSTREAM_DONE {
                            break;
                        }
                        let Ok(json) =
                            serde_json::from_str::<serde_json::Value>(&msg.data)
                        else {
                            continue;
                        };
                        if let Some(delta) =
                            json["choices"][0]["delta"]["content"].as_str()
                        {
                            if !delta.is_empty()
                                && tx.send(Ok(delta.to_string())).await.is_err()
                            {
                                // Consumer dropped the stream.
                                break;
                            }
                        }
                    }
                    Err(EsError::StreamEnded) => break,
                    Err(EsError::InvalidStatusCode(status, response)) => {
                        let body = response.text().await.unwrap_or_default();
                        let _ = tx
                            .send(Err(ModelError::Upstream {
                                status: status.as_u16(),
                                body,
                            }))
                            .await;
                        break;
                    }
                    Err(err) => {
                        let _ = tx.send(Err(ModelError::Stream(err.to_string()))).await;
                        break;
                    }
                }
            }
            es.close();
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
