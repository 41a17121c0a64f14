//! Deadline and cancellation wrapper for suspended calls.

use newsdesk_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Await `call`, giving up when `limit` elapses or `cancel` fires.
pub(crate) async fn bounded<T, F>(
    what: &str,
    limit: Duration,
    cancel: &CancellationToken,
    call: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled(what.to_string())),
        result = tokio::time::timeout(limit, call) => match result {
            Ok(inner) => inner,
            Err(_) => Err(AppError::Timeout(format!("{} after {}s", what, limit.as_secs()))),
        },
    }
}
