//! Deadline and panic supervision of one request pipeline.
//!
//! # Responsibilities
//! - Run the pipeline on its own task
//! - Surface a panic as an internal error
//! - Stop waiting once the deadline elapses
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The worker task is not aborted on timeout; in-flight backend calls end
//!   on their own deadline-bound timeouts
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::error::GatewayError;

/// Await `future` on a spawned task, bounded by `timeout`.
pub async fn run_supervised<F, T>(timeout: Duration, future: F) -> Result<T, GatewayError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(future);

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(join_error)) if join_error.is_panic() => {
            tracing::error!(error = %join_error, "Request pipeline panicked");
            Err(GatewayError::internal("request pipeline panicked"))
        }
        Ok(Err(join_error)) => Err(GatewayError::internal(join_error.to_string())),
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Request deadline exceeded");
            Err(GatewayError::gateway_timeout("gateway timeout"))
        }
    }
}
