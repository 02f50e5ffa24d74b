//! Execution gateway: the direct call path for exposed operations.

use std::sync::Arc;

use serde_json::Value;

use super::executor::SerialExecutor;
use super::exposure::{ExposureController, ExposureSnapshot};
use super::operation::OperationError;
use super::registry::{Operation, OperationRegistry};

/// Admits, validates and executes calls by operation name.
///
/// Checks run in a fixed order so the reported error is predictable:
/// 1. registry membership (`UnknownOperation`)
/// 2. membership in the current resolution (`NotEnabled`)
/// 3. parameter validation and coercion (`InvalidParameters`)
/// 4. serialized execution (`Execution`)
///
/// Holds no per-call state; every call loads the exposure snapshot once.
pub struct ExecutionGateway {
    registry: Arc<OperationRegistry>,
    exposure: Arc<ExposureController>,
    executor: Arc<SerialExecutor>,
}

impl ExecutionGateway {
    #[must_use]
    pub fn new(
        registry: Arc<OperationRegistry>,
        exposure: Arc<ExposureController>,
        executor: Arc<SerialExecutor>,
    ) -> Self {
        Self {
            registry,
            exposure,
            executor,
        }
    }

    /// Calls an operation that must be exposed by the active profile.
    ///
    /// # Errors
    ///
    /// See the check order on [`ExecutionGateway`].
    pub async fn invoke(&self, name: &str, parameters: &Value) -> Result<Value, OperationError> {
        let snapshot = self.exposure.current();
        self.invoke_with(&snapshot, name, parameters).await
    }

    /// [`ExecutionGateway::invoke`] against a snapshot the caller already
    /// loaded, so routing and admission agree on one profile.
    pub(crate) async fn invoke_with(
        &self,
        snapshot: &ExposureSnapshot,
        name: &str,
        parameters: &Value,
    ) -> Result<Value, OperationError> {
        let op = self.registry.lookup(name)?;
        if !snapshot.result.contains(name) {
            return Err(OperationError::NotEnabled {
                name: name.to_string(),
                profile: snapshot.profile_label().to_string(),
            });
        }

        self.dispatch(op, parameters).await
    }

    /// Validates and executes an already looked-up operation, skipping the
    /// exposure check. Shared with the discovery path.
    pub(crate) async fn dispatch(
        &self,
        op: Arc<Operation>,
        parameters: &Value,
    ) -> Result<Value, OperationError> {
        let arguments =
            op.parameters()
                .validate(parameters)
                .map_err(|issues| OperationError::InvalidParameters {
                    operation: op.name().to_string(),
                    issues,
                })?;
        self.executor.execute(op, arguments).await
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn exposure(&self) -> &Arc<ExposureController> {
        &self.exposure
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
