//! Streamable HTTP sessions.
//!
//! Each session binds an `mcp-session-id` to its own [`McpServer`] instance.
//! Requests arrive as `POST /mcp` bodies and are answered in the HTTP
//! response; server-initiated messages are queued on a broadcast channel that
//! `GET /mcp` drains as an SSE stream.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::{new_session_id, SessionFrame};
use crate::error::{Error, Result};
use crate::mcp::protocol::{JsonRpcNotification, JsonRpcResponse};
use crate::mcp::McpServer;

const FRAME_BUFFER: usize = 100;

/// One Streamable HTTP session.
pub struct StreamableSession {
    id: String,
    created_at: DateTime<Utc>,
    server: McpServer,
    closed: AtomicBool,
    frames: broadcast::Sender<SessionFrame>,
    /// Receiver subscribed at creation, so frames pushed before the first
    /// `GET /mcp` are not lost. Taken once; later streams subscribe fresh.
    backlog: Mutex<Option<broadcast::Receiver<SessionFrame>>>,
}

impl StreamableSession {
    /// Create a session with a fresh id around a dedicated server instance.
    ///
    /// The session is not visible to any registry until the caller registers
    /// it after a successful `initialize`.
    pub fn new(server: McpServer) -> Self {
        let (frames, backlog) = broadcast::channel(FRAME_BUFFER);

        Self {
            id: new_session_id(),
            created_at: Utc::now(),
            server,
            closed: AtomicBool::new(false),
            frames,
            backlog: Mutex::new(Some(backlog)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Dispatch one JSON-RPC envelope to the session's server.
    ///
    /// Returns `None` for notifications, which have no response body.
    pub async fn handle_message(&self, message: Value) -> Result<Option<JsonRpcResponse>> {
        if self.is_closed() {
            return Err(Error::SessionClosed(self.id.clone()));
        }

        Ok(self.server.handle_message(message).await)
    }

    /// Queue a server-initiated notification for the session's event stream.
    pub fn push(&self, notification: &JsonRpcNotification) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed(self.id.clone()));
        }

        let frame = serde_json::to_string(notification)?;
        // No receiver means no connected stream; the frame is dropped.
        let _ = self.frames.send(SessionFrame::Message(frame));
        Ok(())
    }

    /// Obtain a receiver for the session's event stream.
    ///
    /// The first call takes the backlog receiver and with it every frame
    /// queued since creation. Later calls subscribe from the current point,
    /// which is how a reconnecting client resumes.
    pub async fn take_stream(&self) -> Result<broadcast::Receiver<SessionFrame>> {
        if self.is_closed() {
            return Err(Error::SessionClosed(self.id.clone()));
        }

        let mut backlog = self.backlog.lock().await;
        Ok(match backlog.take() {
            Some(receiver) => receiver,
            None => self.frames.subscribe(),
        })
    }

    /// Close the session. Idempotent; a closed session is never reopened.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Tell connected streams to end, then drop the unconsumed backlog.
        let _ = self.frames.send(SessionFrame::Close);
        self.backlog.lock().await.take();

        let age = Utc::now().signed_duration_since(self.created_at);
        debug!(
            session_id = %self.id,
            age_secs = age.num_seconds(),
            "streamable session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{McpHandler, PromptRegistry, ResourceRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn test_session() -> StreamableSession {
        let server = McpServer::new(
            Arc::new(McpHandler::new()),
            Arc::new(PromptRegistry::new()),
            Arc::new(ResourceRegistry::new()),
            "test-server",
            "0.0.0",
        );
        StreamableSession::new(server)
    }

    fn initialize_request() -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.0"}
            }
        })
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let session = test_session();

        let response = session
            .handle_message(initialize_request())
            .await
            .unwrap()
            .unwrap();

        assert!(response.error.is_none());
        assert!(response.result.is_some());
        assert!(!session.id().is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_messages() {
        let session = test_session();
        session.close().await;

        let err = session.handle_message(initialize_request()).await.unwrap_err();
        assert!(matches!(err, Error::SessionClosed(_)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let session = test_session();

        session.close().await;
        session.close().await;

        assert!(session.is_closed());
        assert!(session.take_stream().await.is_err());
    }

    #[tokio::test]
    async fn test_push_before_stream_is_buffered() {
        let session = test_session();
        let notification = JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: "notifications/tools/list_changed".to_string(),
            params: None,
        };

        session.push(&notification).unwrap();

        let mut stream = session.take_stream().await.unwrap();
        match stream.recv().await.unwrap() {
            SessionFrame::Message(frame) => {
                assert!(frame.contains("notifications/tools/list_changed"));
            }
            SessionFrame::Close => panic!("expected a message frame"),
        }
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let session = test_session();
        let mut stream = session.take_stream().await.unwrap();

        session.close().await;

        assert!(matches!(
            stream.recv().await.unwrap(),
            SessionFrame::Close
        ));
    }

    #[tokio::test]
    async fn test_second_stream_resumes_from_current_point() {
        let session = test_session();
        let mut first = session.take_stream().await.unwrap();
        let mut second = session.take_stream().await.unwrap();

        let notification = JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: "notifications/resources/list_changed".to_string(),
            params: None,
        };
        session.push(&notification).unwrap();

        assert!(matches!(
            first.recv().await.unwrap(),
            SessionFrame::Message(_)
        ));
        assert!(matches!(
            second.recv().await.unwrap(),
            SessionFrame::Message(_)
        ));
    }
}
