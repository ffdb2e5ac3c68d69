//! Request dispatcher: turns a `tools/call` into a running invocation.
//!
//! Every accepted call runs as its own tokio task, so a slow tool never
//! blocks other requests on the same session. Lookup and argument
//! validation happen before the handler is touched; whatever the handler
//! does, the invocation ends with exactly one [`InvocationOutcome`],
//! delivered on the invocation's response stream after its notifications.

use std::sync::Arc;
use std::time::Duration;

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::notification::{Notifier, OutboundSender};
use super::session::{SessionError, SessionManager};
use super::transport::protocol::JsonRpcResponse;
use crate::domains::tools::{ToolContext, ToolError, ToolHandler, ToolRegistry};

/// A decoded `tools/call` request.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// JSON-RPC id of the request.
    pub request_id: Value,
    /// Name of the tool to invoke.
    pub name: String,
    /// Raw arguments; absent means `{}`.
    pub arguments: Option<JsonObject>,
    /// `_meta.progressToken`, if the client wants progress notifications.
    pub progress_token: Option<Value>,
}

/// Terminal outcome of an invocation.
#[derive(Debug, Clone)]
pub enum InvocationOutcome {
    /// The handler produced a result (which may itself flag an error).
    Completed(CallToolResult),
    /// No tool with this name is registered.
    ToolNotFound(String),
    /// Arguments did not match the declared input shape.
    InvalidArguments(String),
    /// The handler failed or panicked.
    Failed(String),
    /// The handler exceeded the invocation timeout.
    TimedOut(Duration),
}

impl InvocationOutcome {
    /// Whether the invocation did not complete normally.
    pub fn is_error(&self) -> bool {
        match self {
            Self::Completed(result) => result.is_error.unwrap_or(false),
            _ => true,
        }
    }

    /// JSON-RPC response delivering this outcome.
    ///
    /// Lookup and validation failures are protocol errors; execution
    /// failures are tool results flagged with `isError`.
    pub fn to_response(&self, id: Value) -> JsonRpcResponse {
        match self {
            Self::Completed(result) => match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(Some(id), value),
                Err(e) => JsonRpcResponse::internal_error(Some(id), e.to_string()),
            },
            Self::ToolNotFound(name) => {
                JsonRpcResponse::invalid_params(Some(id), ToolError::not_found(name).to_string())
            }
            Self::InvalidArguments(msg) => JsonRpcResponse::invalid_params(
                Some(id),
                ToolError::invalid_arguments(msg.as_str()).to_string(),
            ),
            Self::Failed(msg) => error_result(id, msg.clone()),
            Self::TimedOut(after) => error_result(
                id,
                format!("{} after {}s", ToolError::Timeout, after.as_secs()),
            ),
        }
    }
}

fn error_result(id: Value, message: String) -> JsonRpcResponse {
    let result = CallToolResult::error(vec![Content::text(message)]);
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(Some(id), value),
        Err(e) => JsonRpcResponse::internal_error(Some(id), e.to_string()),
    }
}

/// Handle to a running invocation.
pub struct InvocationHandle {
    request_id: Value,
    task: JoinHandle<InvocationOutcome>,
}

impl InvocationHandle {
    pub fn request_id(&self) -> &Value {
        &self.request_id
    }

    /// Wait for the terminal outcome.
    pub async fn outcome(self) -> InvocationOutcome {
        self.task
            .await
            .unwrap_or_else(|e| InvocationOutcome::Failed(format!("Invocation task failed: {}", e)))
    }
}

/// Handler and arguments of a call that passed lookup and validation.
struct Prepared {
    handler: Arc<dyn ToolHandler>,
    arguments: JsonObject,
}

/// Routes tool calls to registered handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionManager>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionManager>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            sessions,
            timeout,
        }
    }

    /// Start an invocation on an active session.
    ///
    /// Fails without creating an invocation if the session is unknown or
    /// closed, or if the request id is already in flight on it. Every other
    /// failure is reported through the invocation's outcome.
    pub fn dispatch(
        &self,
        session_id: &str,
        call: ToolCall,
        outbound: OutboundSender,
    ) -> Result<InvocationHandle, SessionError> {
        let key = request_key(&call.request_id);
        self.sessions.begin_request(session_id, &key)?;

        info!(
            "Dispatching tool '{}' (request {}) on session {}",
            call.name, key, session_id
        );

        let prepared = self.prepare(&call.name, call.arguments.unwrap_or_default());
        let notifier = Notifier::new(
            self.sessions.clone(),
            session_id,
            call.request_id.clone(),
            call.progress_token,
            outbound,
        );
        let sessions = self.sessions.clone();
        let session_id = session_id.to_string();
        let request_id = call.request_id.clone();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let outcome = match prepared {
                Ok(prepared) => run(prepared, notifier.clone(), timeout).await,
                Err(outcome) => outcome,
            };

            if outcome.is_error() {
                debug!("Request {} ended with {:?}", key, outcome);
            }
            if !notifier.finish(outcome.to_response(request_id)).await {
                warn!(
                    "Discarded outcome of request {}: session {} can no longer receive it",
                    key, session_id
                );
            }
            sessions.finish_request(&session_id, &key);
            outcome
        });

        Ok(InvocationHandle {
            request_id: call.request_id,
            task,
        })
    }

    fn prepare(&self, name: &str, arguments: JsonObject) -> Result<Prepared, InvocationOutcome> {
        let Some(tool) = self.registry.lookup(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(InvocationOutcome::ToolNotFound(name.to_string()));
        };

        tool.validate(&arguments).map_err(|e| match e {
            ToolError::InvalidArguments(msg) => InvocationOutcome::InvalidArguments(msg),
            other => InvocationOutcome::Failed(other.to_string()),
        })?;

        Ok(Prepared {
            handler: tool.handler().clone(),
            arguments,
        })
    }
}

/// Run a handler in its own task so panics and timeouts stay contained.
async fn run(
    prepared: Prepared,
    notifier: Notifier,
    timeout: Option<Duration>,
) -> InvocationOutcome {
    let Prepared { handler, arguments } = prepared;
    let ctx = ToolContext::new(arguments.clone(), notifier);
    let mut task = tokio::spawn(async move { handler.call(arguments, ctx).await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                warn!("Tool invocation timed out after {:?}", limit);
                return InvocationOutcome::TimedOut(limit);
            }
        },
        None => task.await,
    };

    match joined {
        Ok(Ok(result)) => InvocationOutcome::Completed(result),
        Ok(Err(ToolError::InvalidArguments(msg))) => InvocationOutcome::InvalidArguments(msg),
        Ok(Err(e)) => InvocationOutcome::Failed(e.to_string()),
        Err(e) => {
            error!("Tool handler panicked: {}", e);
            InvocationOutcome::Failed(format!("Tool handler crashed: {}", e))
        }
    }
}

/// Key identifying a request id within its session.
///
/// Uses the JSON encoding so that `1` and `"1"` stay distinct.
pub fn request_key(id: &Value) -> String {
    id.to_string()
}
