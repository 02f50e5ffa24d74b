//! Handler abstraction for registered operations.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Callable behind a registered operation.
///
/// Handlers receive arguments already validated and coerced against the
/// operation's parameter schema. Any error they return is reported to the
/// client as an execution failure carrying the error's message.
#[async_trait]
pub trait OperationHandler: Send + Sync + 'static {
    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Value>;
}

/// Adapter turning an async closure into an [`OperationHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> OperationHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Value> {
        (self.0)(arguments).await
    }
}

/// Wraps an async closure as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn OperationHandler>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Handler for operations declared only as metadata (e.g. from a manifest)
/// with no backend attached. Every call fails.
pub struct UnboundHandler {
    pub operation: String,
}

#[async_trait]
impl OperationHandler for UnboundHandler {
    async fn call(&self, _arguments: Map<String, Value>) -> anyhow::Result<Value> {
        anyhow::bail!("no backend is attached for {}", self.operation)
    }
}
