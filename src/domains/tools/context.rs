//! Execution context handed to a tool for one invocation.

use rmcp::model::JsonObject;
use serde_json::Value;

use crate::core::notification::{LogLevel, NotificationEvent, Notifier};

/// Per-invocation context.
///
/// Carries the validated arguments, the identity of the calling session and
/// request, and the capability to emit notifications before the result.
pub struct ToolContext {
    arguments: JsonObject,
    notifier: Notifier,
}

impl ToolContext {
    pub(crate) fn new(arguments: JsonObject, notifier: Notifier) -> Self {
        Self {
            arguments,
            notifier,
        }
    }

    /// The validated raw arguments.
    pub fn arguments(&self) -> &JsonObject {
        &self.arguments
    }

    /// Id of the session this invocation belongs to.
    pub fn session_id(&self) -> &str {
        self.notifier.session_id()
    }

    /// JSON-RPC id of the `tools/call` request.
    pub fn request_id(&self) -> &Value {
        self.notifier.request_id()
    }

    /// Send a `notifications/message` to the client.
    pub async fn send_notification(&self, level: LogLevel, data: impl Into<Value>) {
        self.notifier.send_notification(level, data).await;
    }

    /// Send a prepared notification event.
    pub async fn emit(&self, event: NotificationEvent) {
        self.notifier.emit(event).await;
    }

    /// Report progress, if the client supplied a progress token.
    pub async fn progress(&self, progress: f64, total: Option<f64>, message: Option<String>) {
        self.notifier.progress(progress, total, message).await;
    }

    /// A cloned notifier, for work spawned by the handler.
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::core::session::SessionManager;
    use crate::core::transport::protocol::OutboundMessage;

    /// A context bound to a fresh session, plus the receiving end of its stream.
    pub(crate) fn test_context() -> (ToolContext, mpsc::Receiver<OutboundMessage>) {
        let sessions = Arc::new(SessionManager::new(4));
        let session = sessions
            .create_session("2025-03-26", None)
            .expect("session");
        let (tx, rx) = mpsc::channel(16);
        let notifier = Notifier::new(sessions, session.id, json!(1), None, tx);
        (ToolContext::new(JsonObject::new(), notifier), rx)
    }
}
