//! JSON-RPC 2.0 message types carried by the streamable HTTP transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ProtocolError;

/// Standard JSON-RPC error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// JSON-RPC request structure. A request without `id` is a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Server-to-client notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, error_codes::INVALID_REQUEST, msg)
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, error_codes::INVALID_PARAMS, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, error_codes::INTERNAL_ERROR, msg)
    }
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params: Some(params),
        }
    }
}

/// A message queued for delivery on a response stream.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl OutboundMessage {
    /// Whether this message terminates a request.
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }
}

/// A decoded client message.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// Expects a response.
    Request(JsonRpcRequest),
    /// Fire-and-forget client notification.
    Notification(JsonRpcRequest),
    /// A response to a server-initiated request; accepted and ignored.
    Response(Value),
}

impl IncomingMessage {
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) | Self::Notification(r) => Some(&r.method),
            Self::Response(_) => None,
        }
    }

    pub fn is_initialize(&self) -> bool {
        matches!(self, Self::Request(r) if r.method == "initialize")
    }

    fn classify(value: Value) -> Result<Self, ProtocolError> {
        if value.get("method").is_none() {
            if value.get("result").is_some() || value.get("error").is_some() {
                return Ok(Self::Response(value));
            }
            return Err(ProtocolError::InvalidRequest(
                "message has neither method nor result".to_string(),
            ));
        }

        let request: JsonRpcRequest = serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))?;
        if request.jsonrpc != "2.0" {
            return Err(ProtocolError::InvalidRequest(format!(
                "unsupported jsonrpc version '{}'",
                request.jsonrpc
            )));
        }

        Ok(match request.id {
            Some(_) => Self::Request(request),
            None => Self::Notification(request),
        })
    }
}

/// Decode a POST body holding a single message or a batch.
pub fn parse_messages(body: &[u8]) -> Result<Vec<IncomingMessage>, ProtocolError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ProtocolError::Parse(e.to_string()))?;

    match value {
        Value::Array(items) if items.is_empty() => Err(ProtocolError::InvalidRequest(
            "empty batch".to_string(),
        )),
        Value::Array(items) => items.into_iter().map(IncomingMessage::classify).collect(),
        other => Ok(vec![IncomingMessage::classify(other)?]),
    }
}
