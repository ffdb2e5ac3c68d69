//! Streamable HTTP transport.
//!
//! A single endpoint (`/mcp` by default) carries the whole protocol:
//!
//! - `POST` with `initialize` creates a session and returns its id in the
//!   `mcp-session-id` header.
//! - `POST` with notifications only is acknowledged with `202 Accepted`.
//! - `POST` with plain requests (`ping`, `tools/list`, `logging/setLevel`)
//!   is answered with JSON.
//! - `POST` containing a `tools/call` is answered with a server-sent event
//!   stream carrying each invocation's notifications followed by its result.
//! - `DELETE` terminates the session.
//!
//! A response stream dropped before its last result closes the session.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::{self, Stream};
use rmcp::model::JsonObject;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};

use super::config::HttpConfig;
use super::error::{ProtocolError, TransportError, TransportResult};
use super::protocol::{
    IncomingMessage, JsonRpcRequest, JsonRpcResponse, OutboundMessage, parse_messages,
};
use crate::core::McpServer;
use crate::core::dispatcher::ToolCall;
use crate::core::notification::{LogLevel, OutboundSender};
use crate::core::session::SessionManager;

/// Header carrying the session id.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
struct AppState {
    server: Arc<McpServer>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Build the axum router serving `server`.
    pub fn router(&self, server: Arc<McpServer>) -> Router {
        let state = AppState { server };

        let mut app = Router::new()
            .route(
                &self.config.rpc_path,
                post(handle_post).get(handle_get).delete(handle_delete),
            )
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([HeaderName::from_static(SESSION_ID_HEADER)]);
            app = app.layer(cors);
        }

        app
    }

    /// Run the HTTP transport until Ctrl-C.
    pub async fn run(self, server: Arc<McpServer>) -> TransportResult<()> {
        let addr = self.address();
        let sweeper = server
            .sessions()
            .spawn_sweeper(server.config().session.closed_retention());
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - {} (CORS {})",
            self.config.description(),
            cors_status
        );
        info!("  → MCP:    POST/DELETE {}", self.config.rpc_path);
        info!("  → Health: GET /health");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();
        served.map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.server.config();
    Json(json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "Streamable HTTP",
        "endpoints": {
            "mcp": config.transport.rpc_path,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0",
        "documentation": format!(
            "POST an initialize request to {} and send the returned {} header with every later message",
            config.transport.rpc_path, SESSION_ID_HEADER
        )
    }))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "activeSessions": state.server.sessions().active_count(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// There is no standalone server-initiated stream.
async fn handle_get() -> ProtocolError {
    ProtocolError::MethodNotAllowed
}

/// Terminate a session.
#[instrument(skip_all, fields(session))]
async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match delete_session(&state, &headers) {
        Ok(response) => response,
        Err(e) => {
            warn!("Rejected DELETE: {}", e);
            e.into_response()
        }
    }
}

fn delete_session(state: &AppState, headers: &HeaderMap) -> Result<Response, ProtocolError> {
    let session_id = header_session_id(headers)?.ok_or(ProtocolError::MissingSessionId)?;
    tracing::Span::current().record("session", session_id.as_str());

    if state.server.sessions().close_session(&session_id)? {
        info!("Session {} terminated by client", session_id);
        Ok(StatusCode::OK.into_response())
    } else {
        Err(ProtocolError::SessionNotFound(session_id))
    }
}

/// Handle a POSTed JSON-RPC message or batch.
#[instrument(skip_all, fields(session))]
async fn handle_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    match process_post(&state, &headers, &body) {
        Ok(response) => response,
        Err(e) => {
            warn!("Rejected request: {}", e);
            e.into_response()
        }
    }
}

fn process_post(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ProtocolError> {
    let messages = parse_messages(body)?;
    let session_id = header_session_id(headers)?;

    if messages.iter().any(IncomingMessage::is_initialize) {
        if session_id.is_some() {
            return Err(ProtocolError::AlreadyInitialized);
        }
        if messages.len() > 1 {
            return Err(ProtocolError::InvalidRequest(
                "initialize must not be part of a batch".to_string(),
            ));
        }
        let Some(IncomingMessage::Request(request)) = messages.into_iter().next() else {
            return Err(ProtocolError::InvalidRequest("missing initialize".to_string()));
        };
        return handle_initialize(state, request);
    }

    let session_id = session_id.ok_or(ProtocolError::MissingSessionId)?;
    tracing::Span::current().record("session", session_id.as_str());
    state.server.sessions().ensure_active(&session_id)?;

    let mut requests = Vec::new();
    for message in messages {
        match message {
            IncomingMessage::Request(request) => requests.push(request),
            IncomingMessage::Notification(note) => handle_notification(&session_id, &note),
            IncomingMessage::Response(_) => debug!("Ignoring client response"),
        }
    }

    if requests.is_empty() {
        return Ok(StatusCode::ACCEPTED.into_response());
    }

    let mut response = if requests.iter().any(|r| r.method == "tools/call") {
        stream_response(state, &session_id, requests)
    } else {
        let responses: Vec<JsonRpcResponse> = requests
            .into_iter()
            .map(|r| handle_request(&state.server, &session_id, r))
            .collect();
        json_response(is_batch(body), responses)
    };

    insert_session_header(&mut response, &session_id);
    Ok(response)
}

/// Create a session for an `initialize` request.
fn handle_initialize(state: &AppState, request: JsonRpcRequest) -> Result<Response, ProtocolError> {
    let params = request.params.unwrap_or_else(|| json!({}));
    let requested = params.get("protocolVersion").and_then(Value::as_str);
    let client_info = params.get("clientInfo").cloned();

    let (session, result) = state.server.initialize(requested, client_info)?;

    let mut response = Json(JsonRpcResponse::success(request.id, result)).into_response();
    insert_session_header(&mut response, &session.id);
    Ok(response)
}

/// Handle client notifications (no response).
fn handle_notification(session_id: &str, note: &JsonRpcRequest) {
    match note.method.as_str() {
        "notifications/initialized" => {
            info!("Client on session {} sent initialized notification", session_id)
        }
        "notifications/cancelled" => {
            let request_id = note.params.as_ref().and_then(|p| p.get("requestId"));
            info!(
                "Client cancelled request {:?}; the invocation will still run to completion",
                request_id
            );
        }
        method => debug!("Received notification: {}", method),
    }
}

/// Answer a request that does not invoke a tool.
fn handle_request(server: &McpServer, session_id: &str, request: JsonRpcRequest) -> JsonRpcResponse {
    debug!("Processing {} request", request.method);

    match request.method.as_str() {
        "ping" => JsonRpcResponse::success(request.id, json!({})),

        "tools/list" => JsonRpcResponse::success(request.id, server.list_tools()),

        "logging/setLevel" => {
            let level = request
                .params
                .as_ref()
                .and_then(|p| p.get("level"))
                .cloned()
                .map(serde_json::from_value::<LogLevel>);
            match level {
                Some(Ok(level)) => match server.sessions().set_log_level(session_id, level) {
                    Ok(()) => {
                        info!("Session {} log level set to {}", session_id, level);
                        JsonRpcResponse::success(request.id, json!({}))
                    }
                    Err(e) => JsonRpcResponse::invalid_request(request.id, e.to_string()),
                },
                Some(Err(e)) => JsonRpcResponse::invalid_params(request.id, e.to_string()),
                None => JsonRpcResponse::invalid_params(request.id, "Missing level"),
            }
        }

        "initialize" => {
            JsonRpcResponse::invalid_request(request.id, ProtocolError::AlreadyInitialized.to_string())
        }

        method => {
            warn!("Unknown method: {}", method);
            JsonRpcResponse::method_not_found(request.id, method)
        }
    }
}

/// `tools/call` params.
#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<JsonObject>,
    #[serde(default, rename = "_meta")]
    meta: Option<Value>,
}

fn decode_tool_call(request: JsonRpcRequest) -> Result<ToolCall, JsonRpcResponse> {
    let request_id = request.id.unwrap_or(Value::Null);
    let Some(params) = request.params else {
        return Err(JsonRpcResponse::invalid_params(Some(request_id), "Missing params"));
    };
    let params: CallToolParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcResponse::invalid_params(Some(request_id.clone()), e.to_string()))?;

    let progress_token = params
        .meta
        .as_ref()
        .and_then(|m| m.get("progressToken"))
        .cloned();

    Ok(ToolCall {
        request_id,
        name: params.name,
        arguments: params.arguments,
        progress_token,
    })
}

/// Answer a batch containing tool calls on one event stream.
fn stream_response(state: &AppState, session_id: &str, requests: Vec<JsonRpcRequest>) -> Response {
    let buffer = state.server.config().session.stream_buffer;
    let (tx, rx) = mpsc::channel(buffer);

    tokio::spawn(route_requests(
        state.server.clone(),
        session_id.to_string(),
        requests,
        tx,
    ));

    // A session purged in the meantime counts as closed.
    let closed = state
        .server
        .sessions()
        .subscribe_close(session_id)
        .unwrap_or_else(|| watch::channel(true).1);

    let guard = DisconnectGuard {
        sessions: state.server.sessions().clone(),
        session_id: session_id.to_string(),
        completed: false,
    };

    Sse::new(event_stream(rx, closed, guard))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Dispatch tool calls and queue answers to everything else.
///
/// The stream ends once this task and every invocation it started have
/// dropped their senders.
async fn route_requests(
    server: Arc<McpServer>,
    session_id: String,
    requests: Vec<JsonRpcRequest>,
    outbound: OutboundSender,
) {
    for request in requests {
        if request.method != "tools/call" {
            let response = handle_request(&server, &session_id, request);
            reply(server.sessions(), &session_id, &outbound, response).await;
            continue;
        }

        let call = match decode_tool_call(request) {
            Ok(call) => call,
            Err(response) => {
                reply(server.sessions(), &session_id, &outbound, response).await;
                continue;
            }
        };

        let request_id = call.request_id.clone();
        if let Err(e) = server
            .dispatcher()
            .dispatch(&session_id, call, outbound.clone())
        {
            warn!("Could not dispatch request {}: {}", request_id, e);
            let response = JsonRpcResponse::invalid_request(Some(request_id), e.to_string());
            reply(server.sessions(), &session_id, &outbound, response).await;
        }
    }
}

async fn reply(
    sessions: &SessionManager,
    session_id: &str,
    outbound: &OutboundSender,
    response: JsonRpcResponse,
) {
    if !sessions.is_active(session_id) {
        debug!("Dropping response: session {} is closed", session_id);
        return;
    }
    if outbound.send(OutboundMessage::Response(response)).await.is_err() {
        debug!("Dropping response: stream for session {} is gone", session_id);
    }
}

/// Closes the session if the response stream is dropped before it ends.
struct DisconnectGuard {
    sessions: Arc<SessionManager>,
    session_id: String,
    completed: bool,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        warn!(
            "Response stream for session {} dropped before completion",
            self.session_id
        );
        if let Err(e) = self.sessions.close_session(&self.session_id) {
            debug!("Session already gone: {}", e);
        }
    }
}

/// Turn queued messages into SSE events.
///
/// Ends when every sender is gone or as soon as the session closes; messages
/// still queued at that point are discarded.
fn event_stream(
    rx: mpsc::Receiver<OutboundMessage>,
    closed: watch::Receiver<bool>,
    guard: DisconnectGuard,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(
        (rx, closed, guard),
        |(mut rx, mut closed, mut guard)| async move {
            let next = tokio::select! {
                biased;
                _ = closed.wait_for(|closed| *closed) => None,
                message = rx.recv() => message,
            };

            match next {
                Some(message) if guard.sessions.is_active(&guard.session_id) => {
                    let event = Event::default().event("message").json_data(&message);
                    Some((event, (rx, closed, guard)))
                }
                Some(_) | None => {
                    guard.completed = true;
                    None
                }
            }
        },
    )
}

fn json_response(batch: bool, responses: Vec<JsonRpcResponse>) -> Response {
    if batch {
        return Json(responses).into_response();
    }
    match responses.into_iter().next() {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Session id from the request headers, if present.
fn header_session_id(headers: &HeaderMap) -> Result<Option<String>, ProtocolError> {
    headers
        .get(SESSION_ID_HEADER)
        .map(|v| {
            v.to_str()
                .map(str::to_string)
                .map_err(|_| ProtocolError::InvalidRequest("malformed session id".to_string()))
        })
        .transpose()
}

fn insert_session_header(response: &mut Response, session_id: &str) {
    match HeaderValue::from_str(session_id) {
        Ok(value) => {
            response.headers_mut().insert(SESSION_ID_HEADER, value);
        }
        Err(e) => error!("Session id {} is not a valid header: {}", session_id, e),
    }
}

fn is_batch(body: &[u8]) -> bool {
    body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'[')
}
