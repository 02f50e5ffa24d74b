//! Tool routing: dispatches a client `ToolCall` by the current exposure mode.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use resolve_mcp_core::ExposureMode;
use tower::Service;

use super::discovery::DiscoveryGateway;
use super::exposure::ExposureController;
use super::gateway::ExecutionGateway;
use super::operation::{tool_names, OperationError, ToolCall, ToolDefinition, ToolResponse};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<ToolResponse, OperationError>> + Send>>;

// ---------------------------------------------------------------------------
// ToolRouter
// ---------------------------------------------------------------------------

/// Routes tool calls to the execution or discovery gateway.
///
/// The exposure snapshot is loaded once per call and decides both the route
/// and, on the direct path, admission:
/// - **Direct**: the tool name is an operation name, checked against the
///   resolved set by [`ExecutionGateway`]
/// - **Discovery**: only `search_operations` and `execute_operation` are
///   callable; any operation name is reported as not enabled
///
/// Cheap to clone; all state lives behind `Arc`s.
#[derive(Clone)]
pub struct ToolRouter {
    exposure: Arc<ExposureController>,
    gateway: Arc<ExecutionGateway>,
    discovery: Arc<DiscoveryGateway>,
}

impl ToolRouter {
    #[must_use]
    pub fn new(
        exposure: Arc<ExposureController>,
        gateway: Arc<ExecutionGateway>,
        discovery: Arc<DiscoveryGateway>,
    ) -> Self {
        Self {
            exposure,
            gateway,
            discovery,
        }
    }

    /// Tools currently advertised to the client, in registration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        let snapshot = self.exposure.current();
        match snapshot.effective_mode() {
            ExposureMode::Discovery => self.discovery.tool_definitions(),
            ExposureMode::Direct | ExposureMode::Auto => {
                let registry = self.gateway.registry();
                snapshot
                    .result
                    .names
                    .iter()
                    .filter_map(|name| registry.lookup(name).ok())
                    .map(|op| ToolDefinition {
                        name: op.name().to_string(),
                        description: op.description().to_string(),
                        input_schema: op.parameters().to_json_schema(),
                    })
                    .collect()
            }
        }
    }

    #[must_use]
    pub fn exposure(&self) -> &Arc<ExposureController> {
        &self.exposure
    }
}

impl Service<ToolCall> for ToolRouter {
    type Response = ToolResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Backpressure is applied by the serial executor's queue.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: ToolCall) -> Self::Future {
        let router = self.clone();
        Box::pin(async move {
            let ToolCall {
                call_id,
                tool,
                arguments,
            } = call;
            let snapshot = router.exposure.current();

            let content = match snapshot.effective_mode() {
                ExposureMode::Discovery => {
                    if tool == tool_names::SEARCH_OPERATIONS || tool == tool_names::EXECUTE_OPERATION
                    {
                        router.discovery.call_tool(&tool, &arguments).await
                    } else if router.gateway.registry().contains(&tool) {
                        Err(OperationError::NotEnabled {
                            name: tool,
                            profile: snapshot.profile_label().to_string(),
                        })
                    } else {
                        Err(OperationError::UnknownOperation { name: tool })
                    }
                }
                ExposureMode::Direct | ExposureMode::Auto => {
                    router.gateway.invoke_with(&snapshot, &tool, &arguments).await
                }
            }?;

            Ok(ToolResponse { call_id, content })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use resolve_mcp_core::ProxyConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::service::executor::SerialExecutor;
    use crate::service::resolver::tests::large_registry;

    fn router_with(config: ProxyConfig) -> ToolRouter {
        let registry = large_registry();
        let exposure = Arc::new(ExposureController::new(Arc::clone(&registry), config).unwrap());
        let gateway = Arc::new(ExecutionGateway::new(
            registry,
            Arc::clone(&exposure),
            Arc::new(SerialExecutor::start(8)),
        ));
        let discovery = Arc::new(DiscoveryGateway::new(Arc::clone(&gateway), 10));
        ToolRouter::new(exposure, gateway, discovery)
    }

    #[tokio::test]
    async fn direct_mode_lists_resolved_operations() {
        let router = router_with(ProxyConfig::default());
        let tools = router.list_tools();
        assert_eq!(tools.len(), 40);
        assert_eq!(tools[0].name, "core_op_0");
        assert_eq!(tools[0].input_schema["type"], "object");
        assert!(tools.iter().all(|t| t.name != "delete_project"));
    }

    #[tokio::test]
    async fn direct_mode_routes_by_operation_name() {
        let router = router_with(ProxyConfig::default());
        let resp = router
            .clone()
            .oneshot(ToolCall::new(7, "timeline_op_0", json!({})))
            .await
            .unwrap();
        assert_eq!(resp, ToolResponse { call_id: 7, content: Value::Null });

        let err = router
            .oneshot(ToolCall::new(8, "search_operations", json!({ "query": "x" })))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_operation");
    }

    #[tokio::test]
    async fn discovery_mode_exposes_two_tools() {
        let config = ProxyConfig {
            exposure: ExposureMode::Discovery,
            ..ProxyConfig::default()
        };
        let router = router_with(config);
        let names: Vec<String> = router.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["search_operations", "execute_operation"]);

        let err = router
            .clone()
            .oneshot(ToolCall::new(1, "core_op_0", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "operation_not_enabled");

        let resp = router
            .oneshot(ToolCall::new(
                2,
                "execute_operation",
                json!({ "name": "delete_project", "parameters": {} }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.call_id, 2);
    }

    #[tokio::test]
    async fn auto_mode_switches_with_truncation() {
        let config = ProxyConfig {
            exposure: ExposureMode::Auto,
            ..ProxyConfig::default()
        };
        let router = router_with(config);
        // editing over 143 operations is truncated.
        assert_eq!(router.list_tools().len(), 2);

        router.exposure().switch_profile("minimal").unwrap();
        assert_eq!(router.list_tools().len(), 30);
    }

    #[tokio::test]
    async fn proxy_disabled_lists_every_operation() {
        let config = ProxyConfig {
            proxy_enabled: false,
            ..ProxyConfig::default()
        };
        let router = router_with(config);
        assert_eq!(router.list_tools().len(), 143);
    }
}
