//! Pipeline composition: wraps the tool router in the middleware stack.

use tower::ServiceBuilder;

use super::metrics::{MetricsLayer, MetricsService};
use crate::service::router::ToolRouter;

/// Build the tool-call pipeline by wrapping the `ToolRouter` with middleware.
///
/// Only the metrics layer is applied. Calls must queue in arrival order and
/// run without a deadline, so there is no load-shedding or timeout layer.
///
/// The returned service implements `tower::Service<ToolCall>` and is `Clone`,
/// so each request can take its own handle.
#[must_use]
pub fn build_tool_pipeline(router: ToolRouter) -> MetricsService<ToolRouter> {
    ServiceBuilder::new().layer(MetricsLayer).service(router)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
