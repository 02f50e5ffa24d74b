//! Serial executor for handler invocations.
//!
//! The handlers drive a single-instance, stateful external application that
//! cannot take concurrent command streams. Every accepted call is therefore
//! queued on one mpsc channel and run by a single background task: one call in
//! flight, the rest waiting in arrival order.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::operation::OperationError;
use super::registry::Operation;

type Reply = Result<Value, OperationError>;

struct Job {
    operation: Arc<Operation>,
    arguments: Map<String, Value>,
    reply: oneshot::Sender<Reply>,
}

// ---------------------------------------------------------------------------
// PendingCall
// ---------------------------------------------------------------------------

/// A call that has been queued and will run when its turn comes.
///
/// Dropping it does not cancel the call: once queued, the handler runs.
pub struct PendingCall {
    operation: String,
    rx: oneshot::Receiver<Reply>,
}

impl PendingCall {
    /// Waits for the handler's result.
    ///
    /// # Errors
    ///
    /// Returns the handler's failure as [`OperationError::Execution`], or
    /// [`OperationError::Internal`] if the executor went away first.
    pub async fn wait(self) -> Reply {
        self.rx.await.map_err(|_| {
            OperationError::Internal(anyhow::anyhow!(
                "executor dropped call to {}",
                self.operation
            ))
        })?
    }
}

// ---------------------------------------------------------------------------
// SerialExecutor
// ---------------------------------------------------------------------------

/// Runs handlers strictly one at a time in FIFO order.
///
/// The executor spawns a tokio task that:
/// 1. Receives jobs from the mpsc channel in send order
/// 2. Runs each job's handler to completion before taking the next
/// 3. Converts handler errors and panics into `OperationError::Execution`
/// 4. Exits once the channel is closed and drained
///
/// No timeout and no retry are applied: a slow call simply holds the queue,
/// and a failed call is reported once.
pub struct SerialExecutor {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SerialExecutor {
    /// Starts the executor task. Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(queue_capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(queue_capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let Job {
                    operation,
                    arguments,
                    reply,
                } = job;
                let name = operation.name().to_string();
                let handler = operation.handler();

                // Run on its own task so a panicking handler surfaces as a
                // `JoinError` instead of taking the executor down.
                let outcome = tokio::spawn(async move { handler.call(arguments).await }).await;

                let result = match outcome {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(OperationError::Execution {
                        operation: name,
                        message: format!("{err:#}"),
                    }),
                    Err(join_err) => {
                        let message = if join_err.is_panic() {
                            panic_message(join_err.into_panic().as_ref())
                        } else {
                            "handler task was cancelled".to_string()
                        };
                        tracing::error!(operation = %name, %message, "handler panicked");
                        Err(OperationError::Execution {
                            operation: name,
                            message,
                        })
                    }
                };

                // The caller may have stopped waiting; the result is dropped.
                let _ = reply.send(result);
            }
            tracing::debug!("serial executor drained");
        });

        Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queues a call behind every call queued before it.
    ///
    /// Waits only for queue space, not for the call to run.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Internal`] if the executor has been stopped.
    pub async fn enqueue(
        &self,
        operation: Arc<Operation>,
        arguments: Map<String, Value>,
    ) -> Result<PendingCall, OperationError> {
        let tx = self
            .tx
            .lock()
            .clone()
            .ok_or_else(|| OperationError::Internal(anyhow::anyhow!("executor is not running")))?;

        let name = operation.name().to_string();
        let (reply, rx) = oneshot::channel();
        tracing::debug!(operation = %name, "queued for serial execution");
        tx.send(Job {
            operation,
            arguments,
            reply,
        })
        .await
        .map_err(|_| OperationError::Internal(anyhow::anyhow!("executor channel closed")))?;

        Ok(PendingCall {
            operation: name,
            rx,
        })
    }

    /// Queues a call and waits for its result.
    ///
    /// # Errors
    ///
    /// See [`SerialExecutor::enqueue`] and [`PendingCall::wait`].
    pub async fn execute(
        &self,
        operation: Arc<Operation>,
        arguments: Map<String, Value>,
    ) -> Result<Value, OperationError> {
        self.enqueue(operation, arguments).await?.wait().await
    }

    /// Stops accepting calls, lets queued calls finish, and waits for the task.
    pub async fn stop(&self) {
        self.tx.lock().take();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use resolve_mcp_core::ParameterSchema;
    use serde_json::json;

    use super::*;
    use crate::service::handler::{handler_fn, OperationHandler};
    use crate::service::registry::OperationRegistry;

    fn operation(name: &str, handler: Arc<dyn OperationHandler>) -> Arc<Operation> {
        let registry = OperationRegistry::new();
        registry
            .register(name, "core", "", ParameterSchema::new(), handler)
            .unwrap();
        registry.lookup(name).unwrap()
    }

    #[tokio::test]
    async fn runs_calls_in_arrival_order() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let op = operation("append", {
            let log = log.clone();
            handler_fn(move |args| {
                let log = log.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    log.lock().push(args["n"].as_u64().unwrap());
                    Ok(Value::Null)
                }
            })
        });

        let executor = SerialExecutor::start(16);
        let mut pending = Vec::new();
        for n in 0..6u64 {
            let mut args = Map::new();
            args.insert("n".into(), json!(n));
            pending.push(executor.enqueue(op.clone(), args).await.unwrap());
        }
        // Wait in reverse to show completion order is independent of waiting order.
        for call in pending.into_iter().rev() {
            call.wait().await.unwrap();
        }

        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4, 5]);
        executor.stop().await;
    }

    #[tokio::test]
    async fn never_runs_two_handlers_at_once() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let op = operation("probe", {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            handler_fn(move |_| {
                let in_flight = in_flight.clone();
                let max_seen = max_seen.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            })
        });

        let executor = Arc::new(SerialExecutor::start(4));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let executor = executor.clone();
            let op = op.clone();
            tasks.push(tokio::spawn(async move { executor.execute(op, Map::new()).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_error_becomes_execution_error() {
        let op = operation(
            "start_rendering",
            handler_fn(|_| async { anyhow::bail!("render queue is empty") }),
        );
        let executor = SerialExecutor::start(4);

        let err = executor.execute(op, Map::new()).await.unwrap_err();
        match err {
            OperationError::Execution { operation, message } => {
                assert_eq!(operation, "start_rendering");
                assert_eq!(message, "render queue is empty");
            }
            other => panic!("expected Execution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_the_executor() {
        let boom = operation(
            "boom",
            handler_fn(|_| async { panic!("resolve went away") }),
        );
        let ok = operation("ok", handler_fn(|_| async { Ok(json!("fine")) }));
        let executor = SerialExecutor::start(4);

        let err = executor.execute(boom, Map::new()).await.unwrap_err();
        assert!(matches!(
            &err,
            OperationError::Execution { message, .. } if message.contains("resolve went away")
        ));

        assert_eq!(executor.execute(ok, Map::new()).await.unwrap(), json!("fine"));
    }

    #[tokio::test]
    async fn execute_after_stop_is_internal_error() {
        let op = operation("noop", handler_fn(|_| async { Ok(Value::Null) }));
        let executor = SerialExecutor::start(4);
        executor.stop().await;

        let err = executor.execute(op, Map::new()).await.unwrap_err();
        assert!(matches!(err, OperationError::Internal(_)));
    }
}
