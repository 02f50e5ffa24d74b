//! Tower middleware layers for the tool-call pipeline.
//!
//! - [`metrics`]: Call timing and counting via `tracing` spans and the `metrics` facade
//! - [`pipeline`]: Composes the layers around the [`ToolRouter`](crate::service::ToolRouter)

pub mod metrics;
pub mod pipeline;

pub use metrics::MetricsLayer;
pub use pipeline::build_tool_pipeline;
