//! Interactive terminal chat client.
//!
//! Drives a [`ChatSession`] against a running server: reads lines from
//! stdin, POSTs the canonical `ChatRequest`, consumes the SSE response, and
//! prints deltas as they arrive. Ctrl-C during a stream aborts just that
//! turn; dropping the EventSource closes the connection, which the server
//! observes as a client disconnect and propagates upstream.

use std::io::Write as _;

use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use grchub_protocol::{Category, DONE_SENTINEL, StreamEvent};
use reqwest_eventsource::{Error as EsError, Event as SseEvent, EventSource};
use tokio::io::AsyncBufReadExt;
use tracing::debug;

use crate::session::{ChatSession, Submission, suggested_queries};

/// Run the chat REPL until `/quit` or end of input.
pub async fn run(base_url: String, category: Option<Category>) -> Result<()> {
    let base_url = base_url.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();
    let mut session = ChatSession::new(category);

    println!("GRC Knowledge Assistant ({})", base_url);
    println!("Commands: /reset, /category <name|all>, /quit");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        if session.messages().is_empty() {
            println!("\nTry one of:");
            for query in suggested_queries(session.category()) {
                println!("  - {query}");
            }
        }

        print!("\n> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();

        match line.as_str() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                println!("Conversation cleared.");
                continue;
            }
            command if command.starts_with("/category") => {
                handle_category_command(&mut session, command);
                continue;
            }
            command if command.starts_with('/') => {
                println!("Unknown command: {command}");
                continue;
            }
            _ => {}
        }

        let Some(submission) = session.submit(&line) else {
            continue;
        };

        if let Err(err) = stream_turn(&client, &base_url, &mut session, &submission).await {
            session.fail(submission.generation, err.to_string());
            eprintln!("\nerror: {err:#}");
        }
    }

    Ok(())
}

fn handle_category_command(session: &mut ChatSession, command: &str) {
    let value = command.trim_start_matches("/category").trim();
    match value {
        "" => {
            let active = session
                .category()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "all".to_string());
            println!("Active category: {active}");
        }
        "all" => {
            session.set_category(None);
            println!("Category filter cleared.");
        }
        other => match other.parse::<Category>() {
            Ok(category) => {
                session.set_category(Some(category));
                println!("Category set to {category}.");
            }
            Err(err) => println!("{err}"),
        },
    }
}

/// Stream one assistant turn, feeding results back into the session.
async fn stream_turn(
    client: &reqwest::Client,
    base_url: &str,
    session: &mut ChatSession,
    submission: &Submission,
) -> Result<()> {
    let request = client
        .post(format!("{base_url}/api/chat"))
        .json(&submission.request);
    let mut es = EventSource::new(request).context("connecting to chat endpoint")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                es.close();
                session.abort(submission.generation);
                println!("\n[cancelled]");
                return Ok(());
            }
            event = es.next() => {
                let Some(event) = event else { break };
                match event {
                    Ok(SseEvent::Open) => {}
                    Ok(SseEvent::Message(msg)) => {
                        if msg.data == DONE_SENTINEL {
                            break;
                        }
                        match serde_json::from_str::<StreamEvent>(&msg.data) {
                            Ok(StreamEvent::Start) => {}
                            Ok(StreamEvent::TextDelta { delta }) => {
                                print!("{delta}");
                                std::io::stdout().flush().ok();
                                session.apply_delta(submission.generation, &delta);
                            }
                            Ok(StreamEvent::Finish) => {
                                session.finish(submission.generation);
                                println!();
                            }
                            Ok(StreamEvent::Error { message }) => {
                                session.fail(submission.generation, message.clone());
                                eprintln!("\nassistant error: {message}");
                            }
                            Err(err) => {
                                debug!(error = %err, data = %msg.data, "Ignoring unknown stream frame");
                            }
                        }
                    }
                    Err(EsError::StreamEnded) => break,
                    Err(err) => {
                        es.close();
                        return Err(anyhow!("stream failed: {err}"));
                    }
                }
            }
        }
    }

    es.close();

    // Server closed without a terminal frame; treat it as a clean abort.
    if session.is_busy() {
        session.abort(submission.generation);
        println!();
    }

    Ok(())
}
