//! Bridge assembly: wires the registry, exposure, executor and gateways.

use std::sync::Arc;

use resolve_mcp_core::ProxyConfig;

use super::config::ServerConfig;
use super::discovery::DiscoveryGateway;
use super::executor::SerialExecutor;
use super::exposure::ExposureController;
use super::gateway::ExecutionGateway;
use super::middleware::build_tool_pipeline;
use super::middleware::metrics::MetricsService;
use super::operation::ProfileError;
use super::registry::OperationRegistry;
use super::router::ToolRouter;

/// The assembled proxy, ready to serve tool calls.
///
/// Startup order:
/// 1. the caller populates the registry
/// 2. [`BridgeService::start`] seals it, resolves the active profile and
///    starts the serial executor
/// 3. tool calls flow through [`BridgeService::pipeline`]
/// 4. [`BridgeService::shutdown`] drains queued calls
pub struct BridgeService {
    registry: Arc<OperationRegistry>,
    exposure: Arc<ExposureController>,
    executor: Arc<SerialExecutor>,
    gateway: Arc<ExecutionGateway>,
    discovery: Arc<DiscoveryGateway>,
    router: ToolRouter,
}

impl BridgeService {
    /// Seals the registry and builds every component. Must be called inside a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownProfile`] if the configured active
    /// profile does not exist; the bridge does not fall back to another one.
    pub fn start(
        registry: Arc<OperationRegistry>,
        config: ProxyConfig,
        server: &ServerConfig,
    ) -> Result<Self, ProfileError> {
        registry.mark_ready();

        let exposure = Arc::new(ExposureController::new(Arc::clone(&registry), config)?);
        let executor = Arc::new(SerialExecutor::start(server.executor_queue_capacity));
        let gateway = Arc::new(ExecutionGateway::new(
            Arc::clone(&registry),
            Arc::clone(&exposure),
            Arc::clone(&executor),
        ));
        let discovery = Arc::new(DiscoveryGateway::new(
            Arc::clone(&gateway),
            server.default_search_limit,
        ));
        let router = ToolRouter::new(
            Arc::clone(&exposure),
            Arc::clone(&gateway),
            Arc::clone(&discovery),
        );

        let snapshot = exposure.current();
        tracing::info!(
            operations = registry.len(),
            profile = snapshot.profile_label(),
            exposed = snapshot.result.len(),
            mode = ?snapshot.effective_mode(),
            "bridge started"
        );

        Ok(Self {
            registry,
            exposure,
            executor,
            gateway,
            discovery,
            router,
        })
    }

    /// A fresh handle on the instrumented call pipeline.
    #[must_use]
    pub fn pipeline(&self) -> MetricsService<ToolRouter> {
        build_tool_pipeline(self.router.clone())
    }

    #[must_use]
    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn exposure(&self) -> &Arc<ExposureController> {
        &self.exposure
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<ExecutionGateway> {
        &self.gateway
    }

    #[must_use]
    pub fn discovery(&self) -> &Arc<DiscoveryGateway> {
        &self.discovery
    }

    /// Stops accepting calls and waits for queued ones to finish.
    pub async fn shutdown(&self) {
        self.executor.stop().await;
        tracing::info!("bridge stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
