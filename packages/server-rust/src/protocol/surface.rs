//! MCP method dispatch over the tool-call pipeline.
//!
//! Handles `initialize`, `ping`, `tools/list` and `tools/call`. Operation
//! failures are not JSON-RPC errors: they come back as a successful response
//! whose result has `isError: true` and a structured `error` object, so the
//! client model can read and react to them. JSON-RPC errors are reserved for
//! malformed requests and unknown methods.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::messages::{error_codes, JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION};
use crate::service::middleware::metrics::MetricsService;
use crate::service::{BridgeService, OperationError, ToolCall, ToolRouter};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "resolve-mcp";

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Stateless-per-request MCP dispatcher bound to one bridge.
pub struct McpSurface {
    router: ToolRouter,
    pipeline: MetricsService<ToolRouter>,
    next_call_id: AtomicU64,
}

impl McpSurface {
    #[must_use]
    pub fn new(bridge: &BridgeService) -> Self {
        Self {
            router: bridge.router().clone(),
            pipeline: bridge.pipeline(),
            next_call_id: AtomicU64::new(1),
        }
    }

    /// Handles one raw line. Returns the serialized response, or `None` for
    /// notifications.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => Some(JsonRpcResponse::error(
                None,
                error_codes::PARSE_ERROR,
                format!("parse error: {e}"),
            )),
            Ok(raw) => {
                let id = raw
                    .get("id")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<RequestId>(v).ok());
                match serde_json::from_value::<JsonRpcRequest>(raw) {
                    Ok(request) => self.handle(request).await,
                    Err(e) => Some(JsonRpcResponse::error(
                        id,
                        error_codes::INVALID_REQUEST,
                        format!("invalid request: {e}"),
                    )),
                }
            }
        }?;

        match serde_json::to_string(&response) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                None
            }
        }
    }

    /// Dispatches a parsed request. Notifications never get a response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                Some(id),
                error_codes::INVALID_REQUEST,
                format!("unsupported jsonrpc version {:?}", request.jsonrpc),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.tools_list(id),
            "tools/call" => self.tools_call(id, request.params).await,
            other => JsonRpcResponse::error(
                Some(id),
                error_codes::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        };
        Some(response)
    }

    fn tools_list(&self, id: RequestId) -> JsonRpcResponse {
        match serde_json::to_value(self.router.list_tools()) {
            Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => JsonRpcResponse::error(Some(id), error_codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params = match params.map(serde_json::from_value::<CallParams>) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    Some(id),
                    error_codes::INVALID_PARAMS,
                    format!("invalid tools/call params: {e}"),
                )
            }
            None => {
                return JsonRpcResponse::error(
                    Some(id),
                    error_codes::INVALID_PARAMS,
                    "tools/call requires params",
                )
            }
        };

        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let call = ToolCall::new(call_id, params.name, params.arguments);
        let result = match self.pipeline.clone().oneshot(call).await {
            Ok(response) => tool_success(&response.content),
            Err(err) => tool_failure(&err),
        };
        JsonRpcResponse::success(id, result)
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn tool_success(content: &Value) -> Value {
    let text = match content {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": false,
    })
}

fn tool_failure(err: &OperationError) -> Value {
    json!({
        "content": [{ "type": "text", "text": err.to_string() }],
        "isError": true,
        "error": err.to_json(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
