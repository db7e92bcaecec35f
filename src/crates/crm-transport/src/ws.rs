//! Push-mode WebSocket handler (spec §4.7 development mode): on connect,
//! deliver any stored pending interrupt, then heartbeat every 30s and
//! terminate idle peers. Grounded in the teacher's
//! `orchestrator::api::ws::timeout::TimeoutConfig` defaults, narrowed to the
//! single heartbeat/idle pair the spec names.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use tracing::{info, warn};

use crate::Transport;

/// Heartbeat cadence (spec §4.7).
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// A peer that hasn't sent anything in this long is considered gone.
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Drives one accepted WebSocket connection for `session_id` until it
/// closes, is superseded, or goes idle.
pub async fn handle_connection(socket: WebSocket, session_id: String, transport: std::sync::Arc<Transport>) {
    let (mut sink, mut stream) = futures::StreamExt::split(socket);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    transport.pool.connect(&session_id, tx);

    if let Some(interrupt) = transport.registry.poll(&session_id) {
        match serde_json::to_string(&interrupt.payload) {
            Ok(json) => {
                if !transport.pool.push(&session_id, Message::Text(json)) {
                    warn!(session_id = %session_id, "[TRANSPORT:WS] failed to deliver stored interrupt on connect");
                }
            }
            Err(err) => warn!(session_id = %session_id, error = %err, "[TRANSPORT:WS] couldn't encode stored interrupt"),
        }
    }

    info!(session_id = %session_id, "[TRANSPORT:WS] connection established");

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if futures::SinkExt::send(&mut sink, Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Some(message) => {
                        if futures::SinkExt::send(&mut sink, message).await.is_err() {
                            break;
                        }
                    }
                    // The pool dropped our sender — a newer connection superseded us.
                    None => break,
                }
            }
            incoming = tokio::time::timeout(IDLE_TIMEOUT, futures::StreamExt::next(&mut stream)) => {
                match incoming {
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
                    Ok(Some(Ok(_))) => continue, // any client traffic counts as activity
                    Ok(Some(Err(err))) => {
                        warn!(session_id = %session_id, error = %err, "[TRANSPORT:WS] read error");
                        break;
                    }
                    Err(_) => {
                        info!(session_id = %session_id, "[TRANSPORT:WS] idle timeout, closing");
                        break;
                    }
                }
            }
        }
    }

    transport.pool.disconnect(&session_id);
    info!(session_id = %session_id, "[TRANSPORT:WS] connection closed");
}
