//! Metrics middleware for tool calls.
//!
//! Wraps each call in a `tool_call` tracing span with duration and outcome,
//! and records `tool_calls_total` / `tool_call_duration_seconds` through the
//! `metrics` facade. No recorder is installed here; without one the macros
//! are no-ops.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{OperationError, ToolCall, ToolResponse};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments tool calls with timing and counting.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records call duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<ToolCall> for MetricsService<S>
where
    S: Service<ToolCall, Response = ToolResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = ToolResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<ToolResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: ToolCall) -> Self::Future {
        let tool = call.tool.clone();
        let call_id = call.call_id;

        let span = info_span!(
            "tool_call",
            tool = %tool,
            call_id = call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(call);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(e) => e.kind(),
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                metrics::counter!("tool_calls_total", "tool" => tool.clone(), "outcome" => outcome)
                    .increment(1);
                metrics::histogram!("tool_call_duration_seconds", "tool" => tool.clone())
                    .record(elapsed.as_secs_f64());

                match &result {
                    Ok(_) => tracing::info!(tool = %tool, call_id, duration_ms, "tool call complete"),
                    Err(e) => tracing::warn!(
                        tool = %tool,
                        call_id,
                        duration_ms,
                        outcome,
                        error = %e,
                        "tool call failed"
                    ),
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    /// Immediately-completing service that echoes the arguments back.
    struct EchoService;

    impl Service<ToolCall> for EchoService {
        type Response = ToolResponse;
        type Error = OperationError;
        type Future = Pin<Box<dyn Future<Output = Result<ToolResponse, OperationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, call: ToolCall) -> Self::Future {
            Box::pin(async move {
                if call.tool == "missing" {
                    return Err(OperationError::UnknownOperation { name: call.tool });
                }
                Ok(ToolResponse {
                    call_id: call.call_id,
                    content: call.arguments,
                })
            })
        }
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_response() {
        let svc = MetricsLayer.layer(EchoService);
        let resp = svc
            .oneshot(ToolCall::new(42, "get_current_page", json!({ "x": 1 })))
            .await
            .unwrap();
        assert_eq!(resp.call_id, 42);
        assert_eq!(resp.content, json!({ "x": 1 }));
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_errors() {
        let svc = MetricsLayer.layer(EchoService);
        let err = svc
            .oneshot(ToolCall::new(1, "missing", Value::Null))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_operation");
    }
}
