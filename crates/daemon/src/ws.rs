// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real-time protocol (spec §6/§4.8): a bearer-authenticated WebSocket,
//! auto-joined to the caller's user group, with `subscribe:job`/
//! `unsubscribe:job` joining/leaving job-scoped groups on demand.

use std::collections::HashMap;
use std::task::Poll;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ff_core::Event;
use ff_realtime::{to_wire, Subscription};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::auth::authenticate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    token: Option<String>,
}

/// `GET /v1/events?token=...` (browsers cannot set `Authorization` on a
/// WebSocket handshake, so the token travels as a query parameter; an
/// `Authorization` header is also accepted for non-browser clients).
pub async fn connect(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
    headers: axum::http::HeaderMap,
    upgrade: WebSocketUpgrade,
) -> Response {
    let bearer = query
        .token
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        });

    let principal = match bearer.and_then(|token| authenticate(&state, &token)) {
        Some(principal) => principal,
        None => return StatusCode::UNAUTHORIZED.into_response(),
    };

    upgrade.on_upgrade(move |socket| handle_socket(socket, state, principal.user_id))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op")]
enum ClientMessage {
    #[serde(rename = "subscribe:job")]
    SubscribeJob { job_id: String },
    #[serde(rename = "unsubscribe:job")]
    UnsubscribeJob { job_id: String },
}

async fn handle_socket(mut socket: WebSocket, state: AppState, user_id: String) {
    debug!(user_id, "realtime connection established");
    let mut sub = state.realtime.connect(&user_id);

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_client_message(&mut socket, &mut sub, &state, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(%err, user_id, "realtime socket error");
                        break;
                    }
                }
            }
            event = sub.user_events_mut().recv() => {
                match event {
                    Some(event) => send_wire(&mut socket, &event, false).await,
                    None => break,
                }
            }
            job_event = recv_any_job(sub.job_events_mut()) => {
                if let Some((_job_id, event)) = job_event {
                    send_wire(&mut socket, &event, true).await;
                }
            }
        }
    }
    debug!(user_id, "realtime connection closed");
}

/// Joins/leaves a job group; joining additionally replays accumulated
/// delta chunks for a client catching up on an already-active stream.
async fn handle_client_message(socket: &mut WebSocket, sub: &mut Subscription, state: &AppState, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SubscribeJob { job_id }) => {
            sub.subscribe_job(&job_id);
            for chunk in state.realtime.replay_deltas(&job_id) {
                let frame = serde_json::json!({ "event": format!("job:{job_id}:delta"), "payload": chunk });
                if socket.send(Message::Text(frame.to_string())).await.is_err() {
                    return;
                }
            }
        }
        Ok(ClientMessage::UnsubscribeJob { job_id }) => sub.unsubscribe_job(&job_id),
        Err(err) => debug!(%err, "ignoring malformed realtime control message"),
    }
}

async fn send_wire(socket: &mut WebSocket, event: &Event, job_scoped: bool) {
    let Some(wire) = to_wire(event, job_scoped) else { return };
    let frame = serde_json::json!({ "event": wire.name, "payload": wire.payload });
    let _ = socket.send(Message::Text(frame.to_string())).await;
}

/// Poll every job-scoped receiver in turn; used from `tokio::select!` since
/// the set of subscriptions changes at runtime and can't be named statically.
async fn recv_any_job(job_rx: &mut HashMap<String, mpsc::Receiver<Event>>) -> Option<(String, Event)> {
    std::future::poll_fn(|cx| {
        for (job_id, rx) in job_rx.iter_mut() {
            if let Poll::Ready(maybe_event) = rx.poll_recv(cx) {
                return Poll::Ready(maybe_event.map(|event| (job_id.clone(), event)));
            }
        }
        Poll::Pending
    })
    .await
}
