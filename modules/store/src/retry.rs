use std::time::Duration;

use tracing::warn;

use crate::error::Error;

/// Bounded exponential backoff around a single write transaction, per §4.2:
/// "writer retries with bounded exponential backoff on transient contention,
/// up to 3 attempts, before failing with `StoreBusy`."
pub(crate) async fn with_busy_retry<F, Fut, T>(mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error>>,
{
    let mut delay = Duration::from_millis(50);
    for attempt in 0..3 {
        match op().await {
            Err(Error::StoreBusy) if attempt < 2 => {
                warn!(attempt, "store busy, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            other => return other,
        }
    }
    Err(Error::StoreBusy)
}
