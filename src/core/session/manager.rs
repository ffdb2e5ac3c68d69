//! Session table shared by the transport and the dispatcher.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::SessionError;
use crate::core::notification::LogLevel;

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Accepting requests.
    Active,
    /// Terminated; no further dispatch or delivery.
    Closed,
}

/// A client session.
///
/// Values handed out by [`SessionManager::get_session`] are snapshots; the
/// manager owns the live state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Session creation time.
    pub created_at: DateTime<Utc>,
    /// When the session was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Protocol version negotiated during `initialize`.
    pub protocol_version: String,
    /// `clientInfo` sent with `initialize`.
    pub client_info: Option<Value>,
    /// Minimum level of log notifications the client wants.
    pub log_level: Option<LogLevel>,
    /// Requests currently running on this session.
    pub in_flight: HashSet<String>,
    /// Flips to `true` once the session is closed.
    closed_signal: Arc<watch::Sender<bool>>,
}

impl Session {
    fn new(id: String, protocol_version: String, client_info: Option<Value>) -> Self {
        Self {
            id,
            status: SessionStatus::Active,
            created_at: Utc::now(),
            closed_at: None,
            protocol_version,
            client_info,
            log_level: None,
            in_flight: HashSet::new(),
            closed_signal: Arc::new(watch::channel(false).0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    fn closed_before(&self, cutoff: DateTime<Utc>) -> bool {
        matches!(self.closed_at, Some(closed) if closed < cutoff)
    }
}

/// Thread-safe session manager.
///
/// Closed sessions stay in the table as tombstones until purged, so a closed
/// id keeps being rejected instead of looking unknown.
pub struct SessionManager {
    sessions: DashMap<String, Session>,
    /// Active sessions plus slots reserved by in-progress creations.
    active: AtomicUsize,
    max_sessions: usize,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            active: AtomicUsize::new(0),
            max_sessions,
        }
    }

    /// Create and register a fresh active session.
    pub fn create_session(
        &self,
        protocol_version: impl Into<String>,
        client_info: Option<Value>,
    ) -> Result<Session, SessionError> {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_sessions).then_some(n + 1)
            })
            .map_err(|_| SessionError::CapacityReached(self.max_sessions))?;

        let protocol_version = protocol_version.into();
        loop {
            match self.sessions.entry(generate_session_id()) {
                Entry::Vacant(slot) => {
                    let session =
                        Session::new(slot.key().clone(), protocol_version, client_info);
                    slot.insert(session.clone());
                    debug!("Created session: {}", session.id);
                    return Ok(session);
                }
                // Practically unreachable with v4 ids, but never reuse one.
                Entry::Occupied(_) => continue,
            }
        }
    }

    /// Get a snapshot of a session by id.
    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    /// Whether the session exists and is active.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|s| s.is_active())
    }

    /// Watch the session's closed flag.
    ///
    /// The receiver observes `true` as soon as [`Self::close_session`]
    /// transitions the session. Returns `None` for unknown ids.
    pub fn subscribe_close(&self, session_id: &str) -> Option<watch::Receiver<bool>> {
        self.sessions
            .get(session_id)
            .map(|s| s.closed_signal.subscribe())
    }

    /// Fail unless the session exists and is active.
    pub fn ensure_active(&self, session_id: &str) -> Result<(), SessionError> {
        match self.sessions.get(session_id) {
            Some(s) if s.is_active() => Ok(()),
            Some(_) => Err(SessionError::closed(session_id)),
            None => Err(SessionError::not_found(session_id)),
        }
    }

    /// Close a session.
    ///
    /// Returns `Ok(true)` when the session transitioned to closed and
    /// `Ok(false)` when it was already closed.
    pub fn close_session(&self, session_id: &str) -> Result<bool, SessionError> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::not_found(session_id))?;

        if !session.is_active() {
            return Ok(false);
        }

        let abandoned = session.in_flight.len();
        session.status = SessionStatus::Closed;
        session.closed_at = Some(Utc::now());
        session.in_flight.clear();
        session.closed_signal.send_replace(true);
        self.active.fetch_sub(1, Ordering::SeqCst);
        info!(
            "Closed session {} ({} in-flight request(s) will not be delivered)",
            session_id, abandoned
        );
        Ok(true)
    }

    /// Register a request as in flight on an active session.
    pub fn begin_request(&self, session_id: &str, request_key: &str) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::not_found(session_id))?;

        if !session.is_active() {
            return Err(SessionError::closed(session_id));
        }
        if !session.in_flight.insert(request_key.to_string()) {
            return Err(SessionError::DuplicateRequest(request_key.to_string()));
        }
        Ok(())
    }

    /// Remove a request from the in-flight set.
    pub fn finish_request(&self, session_id: &str, request_key: &str) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.in_flight.remove(request_key);
        }
    }

    /// Set the minimum log level delivered to this session.
    pub fn set_log_level(&self, session_id: &str, level: LogLevel) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::not_found(session_id))?;
        session.log_level = Some(level);
        Ok(())
    }

    /// Minimum log level requested by the session, if any.
    pub fn log_level(&self, session_id: &str) -> Option<LogLevel> {
        self.sessions.get(session_id).and_then(|s| s.log_level)
    }

    /// Get active session count.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Get total session count, tombstones included.
    pub fn total_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop closed sessions whose close is older than `retention`.
    pub fn purge_closed(&self, retention: Duration) -> usize {
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return 0;
        };

        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.closed_before(cutoff));
        before.saturating_sub(self.sessions.len())
    }

    /// Periodically purge closed sessions until the manager is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, retention: Duration) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        let period = retention.clamp(Duration::from_secs(1), Duration::from_secs(60));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let removed = manager.purge_closed(retention);
                if removed > 0 {
                    info!("Purged {} closed session(s)", removed);
                }
            }
        })
    }
}

/// Generate an opaque session id.
fn generate_session_id() -> String {
    format!("mcp_{}", Uuid::new_v4().simple())
}
