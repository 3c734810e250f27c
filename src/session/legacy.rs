//! Legacy HTTP+SSE sessions.
//!
//! The older transport pairs a long-lived `GET /sse` stream with
//! `POST /messages?sessionId=<id>` requests. The session id is assigned when
//! the stream opens, every response travels back over the stream, and the
//! session dies with the stream.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use super::{new_session_id, SessionFrame};
use crate::error::{Error, Result};
use crate::mcp::McpServer;

const FRAME_BUFFER: usize = 100;

/// One legacy SSE session.
pub struct LegacySession {
    id: String,
    created_at: DateTime<Utc>,
    server: McpServer,
    closed: AtomicBool,
    outbound: mpsc::Sender<SessionFrame>,
}

impl LegacySession {
    /// Create a session and the receiver feeding its SSE stream.
    ///
    /// The receiver is consumed by the `GET /sse` handler that created the
    /// session; there is no reconnecting in this transport.
    pub fn new(server: McpServer) -> (Self, mpsc::Receiver<SessionFrame>) {
        let (outbound, stream) = mpsc::channel(FRAME_BUFFER);

        let session = Self {
            id: new_session_id(),
            created_at: Utc::now(),
            server,
            closed: AtomicBool::new(false),
            outbound,
        };

        (session, stream)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Dispatch an envelope from `POST /messages` and relay any response over
    /// the session's stream.
    pub async fn handle_message(&self, message: Value) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed(self.id.clone()));
        }

        let Some(response) = self.server.handle_message(message).await else {
            return Ok(());
        };

        let frame = serde_json::to_string(&response)?;
        self.outbound
            .send(SessionFrame::Message(frame))
            .await
            .map_err(|_| Error::SessionClosed(self.id.clone()))
    }

    /// Close the session. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let _ = self.outbound.send(SessionFrame::Close).await;

        let age = Utc::now().signed_duration_since(self.created_at);
        debug!(
            session_id = %self.id,
            age_secs = age.num_seconds(),
            "legacy session closed"
        );
    }
}
