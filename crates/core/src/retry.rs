//! Re-running operations that lost a lock race.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::LedgerError;

const BASE_BACKOFF: Duration = Duration::from_millis(10);

/// Runs `op` until it succeeds, fails with a non-retryable error, or
/// `attempts` runs have all failed with [`LedgerError::Contention`].
///
/// Every attempt starts from scratch: `op` must open its own unit of work.
/// Between attempts the helper sleeps 10 ms, 20 ms, 40 ms, and so on.
/// `attempts` of zero is treated as one.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last contention error once
/// the attempts are used up.
pub async fn retry_on_contention<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < attempts => {
                let backoff = BASE_BACKOFF * 2_u32.saturating_pow(attempt - 1);
                warn!(attempt, max_attempts = attempts, error = %err, "Retrying after contention");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
