//! Notification channel between running tool handlers and the client.
//!
//! Each invocation gets a [`Notifier`] bound to its session, its request id
//! and the response stream it was received on. Handlers push
//! `notifications/message` (and optionally `notifications/progress`) events
//! through it; the dispatcher uses the same channel for the terminal
//! response, so an invocation's notifications always precede its result.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::session::SessionManager;
use super::transport::protocol::{JsonRpcNotification, JsonRpcResponse, OutboundMessage};

/// Log severity, ordered from least to most severe (RFC 5424).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

/// A log message emitted by a running handler.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub level: LogLevel,
    pub logger: Option<String>,
    pub data: Value,
}

impl NotificationEvent {
    pub fn new(level: LogLevel, data: impl Into<Value>) -> Self {
        Self {
            level,
            logger: None,
            data: data.into(),
        }
    }

    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    fn into_message(self) -> OutboundMessage {
        let mut params = json!({ "level": self.level, "data": self.data });
        if let Some(logger) = self.logger {
            params["logger"] = Value::String(logger);
        }
        OutboundMessage::Notification(JsonRpcNotification::new("notifications/message", params))
    }
}

/// Sending half of a response stream.
pub type OutboundSender = mpsc::Sender<OutboundMessage>;

/// Capability to push notifications for one invocation.
///
/// Emission never fails from the handler's point of view: events for a
/// closed session, a finished invocation or a dropped stream are logged and
/// discarded.
#[derive(Clone)]
pub struct Notifier {
    sessions: Arc<SessionManager>,
    session_id: String,
    request_id: Value,
    progress_token: Option<Value>,
    outbound: OutboundSender,
    finished: Arc<AtomicBool>,
}

impl Notifier {
    pub(crate) fn new(
        sessions: Arc<SessionManager>,
        session_id: impl Into<String>,
        request_id: Value,
        progress_token: Option<Value>,
        outbound: OutboundSender,
    ) -> Self {
        Self {
            sessions,
            session_id: session_id.into(),
            request_id,
            progress_token,
            outbound,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Session this notifier delivers to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request this notifier is scoped to.
    pub fn request_id(&self) -> &Value {
        &self.request_id
    }

    /// Emit a `notifications/message` event.
    ///
    /// Returns once the event is queued on the response stream, waiting for
    /// capacity if the client is reading slowly.
    pub async fn send_notification(&self, level: LogLevel, data: impl Into<Value>) {
        self.emit(NotificationEvent::new(level, data)).await;
    }

    /// Emit a prepared event.
    pub async fn emit(&self, event: NotificationEvent) {
        if let Some(min) = self.sessions.log_level(&self.session_id) {
            if event.level < min {
                debug!(
                    "Filtered {} notification below session level {}",
                    event.level, min
                );
                return;
            }
        }
        self.deliver(event.into_message()).await;
    }

    /// Emit `notifications/progress` if the client asked for progress.
    pub async fn progress(&self, progress: f64, total: Option<f64>, message: Option<String>) {
        let Some(token) = self.progress_token.clone() else {
            return;
        };

        let mut params = json!({ "progressToken": token, "progress": progress });
        if let Some(total) = total {
            params["total"] = json!(total);
        }
        if let Some(message) = message {
            params["message"] = Value::String(message);
        }
        self.deliver(OutboundMessage::Notification(JsonRpcNotification::new(
            "notifications/progress",
            params,
        )))
        .await;
    }

    /// Queue the terminal response. Later emissions are dropped.
    ///
    /// Returns whether the response was handed to the stream.
    pub(crate) async fn finish(&self, response: JsonRpcResponse) -> bool {
        if self.finished.swap(true, Ordering::SeqCst) {
            warn!("Invocation {} already finished", self.request_id);
            return false;
        }
        self.send(OutboundMessage::Response(response)).await
    }

    async fn deliver(&self, message: OutboundMessage) {
        if self.finished.load(Ordering::SeqCst) {
            warn!(
                "Dropping notification for finished request {} on session {}",
                self.request_id, self.session_id
            );
            return;
        }
        self.send(message).await;
    }

    async fn send(&self, message: OutboundMessage) -> bool {
        if !self.sessions.is_active(&self.session_id) {
            debug!(
                "Dropping message for request {}: session {} is closed",
                self.request_id, self.session_id
            );
            return false;
        }
        if self.outbound.send(message).await.is_err() {
            debug!(
                "Dropping message for request {}: response stream is gone",
                self.request_id
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(buffer: usize) -> (Arc<SessionManager>, String, mpsc::Receiver<OutboundMessage>, Notifier) {
        let sessions = Arc::new(SessionManager::new(8));
        let session = sessions.create_session("2025-03-26", None).unwrap();
        let (tx, rx) = mpsc::channel(buffer);
        let notifier = Notifier::new(sessions.clone(), &session.id, json!(1), None, tx);
        (sessions, session.id, rx, notifier)
    }

    fn params(message: &OutboundMessage) -> Value {
        match message {
            OutboundMessage::Notification(n) => n.params.clone().unwrap(),
            OutboundMessage::Response(_) => panic!("expected a notification"),
        }
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert_eq!(serde_json::to_value(LogLevel::Warning).unwrap(), "warning");
        assert_eq!(LogLevel::Emergency.to_string(), "emergency");
    }

    #[tokio::test]
    async fn test_notifications_preserve_order() {
        let (_sessions, _id, mut rx, notifier) = setup(8);

        notifier.send_notification(LogLevel::Debug, "one").await;
        notifier.send_notification(LogLevel::Info, "two").await;
        notifier
            .emit(NotificationEvent::new(LogLevel::Info, "three").with_logger("greeter"))
            .await;

        let first = params(&rx.recv().await.unwrap());
        assert_eq!(first["level"], "debug");
        assert_eq!(first["data"], "one");
        assert_eq!(params(&rx.recv().await.unwrap())["data"], "two");
        let third = params(&rx.recv().await.unwrap());
        assert_eq!(third["logger"], "greeter");
    }

    #[tokio::test]
    async fn test_closed_session_drops_notifications() {
        let (sessions, id, mut rx, notifier) = setup(8);
        sessions.close_session(&id).unwrap();

        notifier.send_notification(LogLevel::Info, "late").await;
        assert!(!notifier.finish(JsonRpcResponse::success(Some(json!(1)), json!({}))).await);

        drop(notifier);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_session_level_filters_notifications() {
        let (sessions, id, mut rx, notifier) = setup(8);
        sessions.set_log_level(&id, LogLevel::Warning).unwrap();

        notifier.send_notification(LogLevel::Info, "quiet").await;
        notifier.send_notification(LogLevel::Error, "loud").await;

        assert_eq!(params(&rx.recv().await.unwrap())["data"], "loud");
    }

    #[tokio::test]
    async fn test_nothing_delivered_after_finish() {
        let (_sessions, _id, mut rx, notifier) = setup(8);

        assert!(notifier.finish(JsonRpcResponse::success(Some(json!(1)), json!({}))).await);
        notifier.send_notification(LogLevel::Info, "after").await;
        drop(notifier);

        assert!(rx.recv().await.unwrap().is_response());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_stream_does_not_fail_emitter() {
        let (_sessions, _id, rx, notifier) = setup(1);
        drop(rx);
        notifier.send_notification(LogLevel::Info, "nobody listening").await;
    }

    #[tokio::test]
    async fn test_progress_requires_token() {
        let sessions = Arc::new(SessionManager::new(8));
        let session = sessions.create_session("2025-03-26", None).unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        let silent = Notifier::new(sessions.clone(), &session.id, json!(1), None, tx.clone());
        silent.progress(1.0, Some(2.0), None).await;

        let tracked = Notifier::new(sessions, &session.id, json!(2), Some(json!("tok")), tx);
        tracked.progress(1.0, Some(2.0), Some("half".into())).await;

        let message = rx.recv().await.unwrap();
        let OutboundMessage::Notification(note) = message else {
            panic!("expected progress notification");
        };
        assert_eq!(note.method, "notifications/progress");
        let params = note.params.unwrap();
        assert_eq!(params["progressToken"], "tok");
        assert_eq!(params["total"], 2.0);
        assert_eq!(params["message"], "half");
    }
}
