//! Route handlers for the MCP HTTP surface.
//!
//! `POST /mcp` runs the session negotiator before anything else: the request
//! is classified as reuse, create, or reject purely from the `mcp-session-id`
//! header and the body shape, with no side effects until the decision is
//! made. The legacy `/sse` + `/messages` pair bypasses the negotiator and
//! correlates by query parameter instead.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use super::{security, AppState, SESSION_ID_HEADER};
use crate::error::Error;
use crate::mcp::protocol::error_codes;
use crate::metrics::Metrics;
use crate::session::{LegacySession, SessionFrame, SessionRegistry, StreamableSession};

/// Routing decision for a `POST /mcp` request.
pub enum Negotiation {
    /// The header named a live session; deliver to it.
    Reuse(Arc<StreamableSession>),
    /// No header and the body opens a handshake; create a session.
    Create,
    /// Anything else.
    Reject,
}

/// Classify a request before any side effect happens.
///
/// A header naming an unknown session is always rejected, even when the body
/// is an initialize request; a retired id is never resurrected.
pub fn classify(
    headers: &HeaderMap,
    body: &Value,
    sessions: &SessionRegistry<StreamableSession>,
) -> Negotiation {
    match session_header(headers) {
        Some(id) => match sessions.lookup(id) {
            Some(session) => Negotiation::Reuse(session),
            None => Negotiation::Reject,
        },
        None if is_initialize(body) => Negotiation::Create,
        None => Negotiation::Reject,
    }
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Whether a body is a single initialize request. Batches never initialize.
fn is_initialize(body: &Value) -> bool {
    body.as_object()
        .and_then(|envelope| envelope.get("method"))
        .and_then(Value::as_str)
        == Some("initialize")
}

/// `POST /mcp`: the Streamable HTTP endpoint.
pub async fn post_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(response) = security::guard(&state.config, &headers) {
        return response;
    }
    state.metrics.inc_requests();

    let message: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    if message.get("method").and_then(Value::as_str) == Some("tools/call") {
        state.metrics.inc_tool_calls();
    }

    match classify(&headers, &message, &state.streaming) {
        Negotiation::Reuse(session) => deliver(&state, session, message).await,
        Negotiation::Create => establish(&state, message).await,
        Negotiation::Reject => {
            debug!("rejected request with no usable session");
            state.metrics.inc_failed();
            bad_request_envelope()
        }
    }
}

/// Create path: run the handshake on a fresh session, register on success.
async fn establish(state: &AppState, message: Value) -> Response {
    let session = Arc::new(StreamableSession::new(state.new_server()));

    let response = match session.handle_message(message).await {
        Ok(Some(response)) => response,
        Ok(None) => {
            // initialize is a request, never a notification
            state.metrics.inc_failed();
            return internal_error_envelope();
        }
        Err(e) => {
            error!("handshake dispatch failed: {}", e);
            state.metrics.inc_failed();
            return internal_error_envelope();
        }
    };

    if response.error.is_some() {
        // Failed handshake; the session is never registered.
        state.metrics.inc_failed();
        return (StatusCode::OK, Json(response)).into_response();
    }

    if let Err(e) = state.streaming.register(session.id(), session.clone()) {
        error!("session registration failed: {}", e);
        state.metrics.inc_failed();
        return internal_error_envelope();
    }

    state.metrics.inc_sessions_created();
    info!(session_id = %session.id(), "streamable session established");

    with_session_header(
        (StatusCode::OK, Json(response)).into_response(),
        session.id(),
    )
}

/// Reuse path: dispatch to the session named by the header.
async fn deliver(
    state: &AppState,
    session: Arc<StreamableSession>,
    message: Value,
) -> Response {
    match session.handle_message(message).await {
        Ok(Some(response)) => with_session_header(
            (StatusCode::OK, Json(response)).into_response(),
            session.id(),
        ),
        // Notifications are accepted with no body.
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(Error::SessionClosed(_)) => {
            state.metrics.inc_failed();
            bad_request_envelope()
        }
        Err(e) => {
            error!(session_id = %session.id(), "dispatch failed: {}", e);
            state.metrics.inc_failed();
            internal_error_envelope()
        }
    }
}

/// `GET /mcp`: opens or resumes the session's push stream.
pub async fn get_mcp(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = security::guard(&state.config, &headers) {
        return response;
    }

    let Some(session) = session_header(&headers).and_then(|id| state.streaming.lookup(id))
    else {
        return invalid_session_text();
    };

    let receiver = match session.take_stream().await {
        Ok(receiver) => receiver,
        Err(_) => return invalid_session_text(),
    };

    debug!(session_id = %session.id(), "push stream attached");
    Sse::new(push_stream(receiver))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn push_stream(
    mut receiver: broadcast::Receiver<SessionFrame>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(SessionFrame::Message(frame)) => {
                    yield Ok(Event::default().event("message").data(frame));
                }
                Ok(SessionFrame::Close) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push stream lagged, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

/// `DELETE /mcp`: terminates a session. The id is never valid again.
pub async fn delete_mcp(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = security::guard(&state.config, &headers) {
        return response;
    }

    let Some(session) = session_header(&headers).and_then(|id| state.streaming.remove(id))
    else {
        return invalid_session_text();
    };

    session.close().await;
    state.metrics.inc_sessions_closed();
    info!(session_id = %session.id(), "session terminated by client");

    StatusCode::OK.into_response()
}

/// `GET /sse`: creates a legacy session bound to this stream's lifetime.
pub async fn get_sse(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = security::guard(&state.config, &headers) {
        return response;
    }

    let (session, receiver) = LegacySession::new(state.new_server());
    let session = Arc::new(session);

    if let Err(e) = state.legacy.register(session.id(), session.clone()) {
        error!("legacy session registration failed: {}", e);
        state.metrics.inc_failed();
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
    }

    state.metrics.inc_legacy_created();
    info!(session_id = %session.id(), "legacy session established");

    let guard = StreamGuard {
        session_id: session.id().to_string(),
        registry: state.legacy.clone(),
        metrics: state.metrics.clone(),
    };

    Sse::new(legacy_stream(session.id().to_string(), receiver, guard))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn legacy_stream(
    session_id: String,
    mut receiver: mpsc::Receiver<SessionFrame>,
    guard: StreamGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let _guard = guard;

        // First event tells the client where to POST its messages.
        yield Ok(Event::default()
            .event("endpoint")
            .data(format!("/messages?sessionId={session_id}")));

        while let Some(frame) = receiver.recv().await {
            match frame {
                SessionFrame::Message(frame) => {
                    yield Ok(Event::default().event("message").data(frame));
                }
                SessionFrame::Close => break,
            }
        }
    }
}

/// Removes the registry entry when the stream ends, however it ends.
struct StreamGuard {
    session_id: String,
    registry: Arc<SessionRegistry<LegacySession>>,
    metrics: Arc<Metrics>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.registry.remove(&self.session_id).is_some() {
            self.metrics.inc_legacy_closed();
            info!(session_id = %self.session_id, "legacy session disconnected");
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// `POST /messages?sessionId=<id>`: the legacy inbound endpoint.
pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(response) = security::guard(&state.config, &headers) {
        return response;
    }
    state.metrics.inc_requests();

    let Some(session) = query
        .session_id
        .as_deref()
        .and_then(|id| state.legacy.lookup(id))
    else {
        state.metrics.inc_failed();
        return invalid_session_text();
    };

    let message: Value = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(_) => {
            state.metrics.inc_failed();
            return (StatusCode::BAD_REQUEST, "Invalid message").into_response();
        }
    };
    if message.get("method").and_then(Value::as_str) == Some("tools/call") {
        state.metrics.inc_tool_calls();
    }

    match session.handle_message(message).await {
        // The response travels over the SSE stream, not this exchange.
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Err(Error::SessionClosed(_)) => {
            state.metrics.inc_failed();
            invalid_session_text()
        }
        Err(e) => {
            error!("legacy dispatch failed: {}", e);
            state.metrics.inc_failed();
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// `GET /health`: status plus live session counts.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "activeSessions": state.streaming.len(),
        "legacySessions": state.legacy.len(),
        "version": crate::VERSION,
    }))
}

/// `GET /`.
pub async fn root() -> &'static str {
    "This is a demo MCP server. Use `/mcp` for Streamable HTTP."
}

fn with_session_header(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    response
}

/// Reject body for POST requests that reach no session.
fn bad_request_envelope() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": error_codes::BAD_REQUEST,
                "message": "Bad Request: No valid session ID provided"
            },
            "id": null
        })),
    )
        .into_response()
}

fn internal_error_envelope() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": error_codes::INTERNAL_ERROR,
                "message": "Internal server error"
            },
            "id": null
        })),
    )
        .into_response()
}

fn invalid_session_text() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid or missing session ID").into_response()
}
