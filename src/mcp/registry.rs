//! Registry of open SSE sessions
//!
//! Maps the session id handed out on stream open to the channel feeding that
//! stream. Entries are removed when the stream is dropped, through the
//! [`SessionGuard`] the stream owns.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;

use crate::{auth::Identity, errors::AppError};

pub const SESSION_CHANNEL_CAPACITY: usize = 64;

/// Sending half of an SSE stream.
#[derive(Debug, Clone)]
pub struct SessionConnection {
    sender: mpsc::Sender<Value>,
}

impl SessionConnection {
    pub fn channel() -> (Self, mpsc::Receiver<Value>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        (Self { sender }, receiver)
    }

    pub async fn send(&self, message: Value) -> Result<(), AppError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| AppError::internal("sse stream is closed"))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn same_channel(&self, other: &SessionConnection) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

#[derive(Debug)]
struct SessionEntry {
    connection: SessionConnection,
    identity: Option<Identity>,
}

/// Connection and identity of a session at the time it was read.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub connection: SessionConnection,
    pub identity: Option<Identity>,
}

#[derive(Debug, Default)]
pub struct TransportRegistry {
    sessions: DashMap<String, SessionEntry>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with a fresh id and returns the guard that keeps it
    /// registered together with the receiving half of its stream.
    pub fn open_session(
        self: &Arc<Self>,
        identity: Option<Identity>,
    ) -> (SessionGuard, mpsc::Receiver<Value>) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (connection, receiver) = SessionConnection::channel();
        self.register(session_id.clone(), connection);
        self.refresh_identity(&session_id, identity);

        info!(session_id = %session_id, sessions = self.len(), "sse session opened");
        (
            SessionGuard {
                registry: Arc::clone(self),
                session_id,
            },
            receiver,
        )
    }

    pub fn register(&self, session_id: String, connection: SessionConnection) {
        self.sessions.insert(
            session_id,
            SessionEntry {
                connection,
                identity: None,
            },
        );
    }

    pub fn lookup(&self, session_id: &str) -> Option<SessionConnection> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.connection.clone())
    }

    /// Replaces the identity stored for a session and returns the updated
    /// entry, or `None` when the session is not registered.
    pub fn refresh_identity(
        &self,
        session_id: &str,
        identity: Option<Identity>,
    ) -> Option<SessionSnapshot> {
        let mut entry = self.sessions.get_mut(session_id)?;
        entry.identity = identity;
        Some(SessionSnapshot {
            connection: entry.connection.clone(),
            identity: entry.identity.clone(),
        })
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every registered connection so the matching streams end.
    pub fn close_all(&self) -> usize {
        let closed = self.sessions.len();
        self.sessions.clear();
        closed
    }
}

/// Removes its session from the registry when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    registry: Arc<TransportRegistry>,
    session_id: String,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.registry.remove(&self.session_id) {
            info!(
                session_id = %self.session_id,
                sessions = self.registry.len(),
                "sse session closed"
            );
        }
    }
}
