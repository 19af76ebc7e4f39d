// crates/parchment-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server implementations for stdio and HTTP transports.
// Purpose: Expose Parchment tools via JSON-RPC 2.0.
// Dependencies: parchment-config, parchment-core, axum, tokio
// ============================================================================

//! ## Overview
//! The MCP server exposes Parchment tools using JSON-RPC 2.0. It supports
//! stdio and HTTP transports and always routes calls through
//! [`crate::registry::ToolRegistry`]. Inputs are untrusted and must be
//! validated before dispatch; the HTTP transport additionally checks bearer
//! tokens before a request body is even parsed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::post;
use parchment_config::ParchmentConfig;
use parchment_config::ServerTransport;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::AuditSink;
use crate::audit::McpAuditEvent;
use crate::audit::StderrAuditSink;
use crate::auth::AuthPolicy;
use crate::auth::RequestContext;
use crate::auth::RequestTransport;
use crate::registry::ToolDefinition;
use crate::registry::ToolError;
use crate::registry::ToolRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol revision reported by initialize.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported by initialize.
const SERVER_NAME: &str = "parchment";

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: ParchmentConfig,
    /// Tool registry for request dispatch.
    registry: Arc<ToolRegistry>,
    /// Bearer-token policy for the HTTP transport.
    auth: AuthPolicy,
    /// Transport-level audit sink.
    audit: Arc<dyn AuditSink>,
}

impl McpServer {
    /// Builds a new MCP server over a registry.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Config`] when the configuration is invalid.
    pub fn new(config: ParchmentConfig, registry: ToolRegistry) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let auth = AuthPolicy::new(config.server.auth_tokens.clone());
        Ok(Self {
            config,
            registry: Arc::new(registry),
            auth,
            audit: Arc::new(StderrAuditSink),
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.config.server.transport {
            ServerTransport::Stdio => serve_stdio(
                self.registry.as_ref(),
                self.audit.as_ref(),
                self.config.server.max_body_bytes,
            ),
            ServerTransport::Http => serve_http(self).await,
        }
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves JSON-RPC requests over stdin/stdout.
fn serve_stdio(
    registry: &ToolRegistry,
    audit: &dyn AuditSink,
    max_body_bytes: usize,
) -> Result<(), McpServerError> {
    let mut reader = BufReader::new(std::io::stdin());
    let mut writer = std::io::stdout();
    let context = RequestContext::stdio();
    loop {
        let Some(bytes) = read_framed(&mut reader, max_body_bytes)? else {
            return Ok(());
        };
        let request: JsonRpcRequest = serde_json::from_slice(&bytes)
            .map_err(|_| McpServerError::Transport("invalid json-rpc request".to_string()))?;
        let response = handle_request(registry, audit, &context, request);
        let payload = serde_json::to_vec(&response.1)
            .map_err(|_| McpServerError::Transport("json-rpc serialization failed".to_string()))?;
        write_framed(&mut writer, &payload)?;
    }
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(server: McpServer) -> Result<(), McpServerError> {
    let addr = server
        .config
        .server
        .bind_addr()
        .map_err(|err| McpServerError::Config(err.to_string()))?;
    let state = Arc::new(ServerState {
        registry: Arc::clone(&server.registry),
        auth: server.auth.clone(),
        audit: Arc::clone(&server.audit),
        max_body_bytes: server.config.server.max_body_bytes,
    });
    let app = Router::new().route("/rpc", post(handle_http)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Shared server state for the HTTP handler.
struct ServerState {
    /// Tool registry for request dispatch.
    registry: Arc<ToolRegistry>,
    /// Bearer-token policy.
    auth: AuthPolicy,
    /// Transport-level audit sink.
    audit: Arc<dyn AuditSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let auth_header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    if !state.auth.authorize(auth_header) {
        state.audit.record(&McpAuditEvent::AuthRejected {
            peer: Some(peer.ip().to_string()),
        });
        let response = JsonRpcResponse {
            jsonrpc: "2.0",
            id: Value::Null,
            result: None,
            error: Some(JsonRpcError {
                code: -32001,
                message: "unauthenticated".to_string(),
            }),
        };
        return (StatusCode::UNAUTHORIZED, axum::Json(response));
    }
    let context = RequestContext::http(peer.ip());
    let response = parse_request(&state, &context, &bytes);
    (response.0, axum::Json(response.1))
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier.
    id: Value,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// JSON tool output.
    Json {
        /// JSON payload.
        json: Value,
    },
}

/// Dispatches a JSON-RPC request to the tool registry.
fn handle_request(
    registry: &ToolRegistry,
    audit: &dyn AuditSink,
    context: &RequestContext,
    request: JsonRpcRequest,
) -> (StatusCode, JsonRpcResponse) {
    if request.jsonrpc != "2.0" {
        return (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse {
                jsonrpc: "2.0",
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32600,
                    message: "invalid json-rpc version".to_string(),
                }),
            },
        );
    }
    audit.record(&McpAuditEvent::RequestReceived {
        transport: transport_label(context.transport),
        method: request.method.clone(),
        request_id: request.id.to_string(),
    });
    match request.method.as_str() {
        "initialize" => (
            StatusCode::OK,
            JsonRpcResponse {
                jsonrpc: "2.0",
                id: request.id,
                result: Some(initialize_result()),
                error: None,
            },
        ),
        "ping" => (
            StatusCode::OK,
            JsonRpcResponse {
                jsonrpc: "2.0",
                id: request.id,
                result: Some(json!({})),
                error: None,
            },
        ),
        "tools/list" => {
            match serde_json::to_value(ToolListResult {
                tools: registry.definitions(),
            }) {
                Ok(value) => (
                    StatusCode::OK,
                    JsonRpcResponse {
                        jsonrpc: "2.0",
                        id: request.id,
                        result: Some(value),
                        error: None,
                    },
                ),
                Err(_) => jsonrpc_error(request.id, &ToolError::Serialization),
            }
        }
        "tools/call" => {
            let id = request.id;
            let params = request.params.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => {
                    audit.record(&McpAuditEvent::ToolCalled {
                        tool: call.name.clone(),
                        request_id: id.to_string(),
                    });
                    match call_tool_with_blocking(registry, &call.name, &call.arguments) {
                        Ok(result) => match serde_json::to_value(ToolCallResult {
                            content: vec![ToolContent::Json {
                                json: result,
                            }],
                        }) {
                            Ok(value) => (
                                StatusCode::OK,
                                JsonRpcResponse {
                                    jsonrpc: "2.0",
                                    id,
                                    result: Some(value),
                                    error: None,
                                },
                            ),
                            Err(_) => jsonrpc_error(id, &ToolError::Serialization),
                        },
                        Err(err) => jsonrpc_error(id, &err),
                    }
                }
                Err(_) => (
                    StatusCode::BAD_REQUEST,
                    JsonRpcResponse {
                        jsonrpc: "2.0",
                        id,
                        result: None,
                        error: Some(JsonRpcError {
                            code: -32602,
                            message: "invalid tool params".to_string(),
                        }),
                    },
                ),
            }
        }
        _ => (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse {
                jsonrpc: "2.0",
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: "method not found".to_string(),
                }),
            },
        ),
    }
}

/// Builds the initialize response payload.
fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": {},
        },
    })
}

/// Executes a tool call, shifting to a blocking context when available.
fn call_tool_with_blocking(
    registry: &ToolRegistry,
    name: &str,
    arguments: &Value,
) -> Result<Value, ToolError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| registry.call(name, arguments))
        }
        _ => registry.call(name, arguments),
    }
}

/// Parses and validates a JSON-RPC request payload.
fn parse_request(
    state: &ServerState,
    context: &RequestContext,
    bytes: &Bytes,
) -> (StatusCode, JsonRpcResponse) {
    if bytes.len() > state.max_body_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            JsonRpcResponse {
                jsonrpc: "2.0",
                id: Value::Null,
                result: None,
                error: Some(JsonRpcError {
                    code: -32070,
                    message: "request body too large".to_string(),
                }),
            },
        );
    }
    let request: Result<JsonRpcRequest, _> = serde_json::from_slice(bytes.as_ref());
    request.map_or_else(
        |_| {
            (
                StatusCode::BAD_REQUEST,
                JsonRpcResponse {
                    jsonrpc: "2.0",
                    id: Value::Null,
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32600,
                        message: "invalid json-rpc request".to_string(),
                    }),
                },
            )
        },
        |request| handle_request(&state.registry, state.audit.as_ref(), context, request),
    )
}

/// Audit label for a request transport.
const fn transport_label(transport: RequestTransport) -> &'static str {
    match transport {
        RequestTransport::Stdio => "stdio",
        RequestTransport::Http => "http",
    }
}

/// Builds a JSON-RPC error response for a registry failure.
fn jsonrpc_error(id: Value, error: &ToolError) -> (StatusCode, JsonRpcResponse) {
    let (status, code, message) = match error {
        ToolError::UnknownTool(name) => {
            (StatusCode::BAD_REQUEST, -32601, format!("unknown tool: {name}"))
        }
        ToolError::InvalidParams(message) => (StatusCode::BAD_REQUEST, -32602, message.clone()),
        ToolError::Serialization => (StatusCode::OK, -32060, "serialization failed".to_string()),
    };
    (
        status,
        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
            }),
        },
    )
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed stdio payload using MCP Content-Length headers.
///
/// Returns `None` on a clean end-of-stream before any header byte.
fn read_framed(
    reader: &mut BufReader<impl Read>,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
        }
        if line.trim().is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes a framed stdio payload using MCP Content-Length headers.
fn write_framed(writer: &mut impl Write, payload: &[u8]) -> Result<(), McpServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer.flush().map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
