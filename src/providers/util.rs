use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Runs an async HTTP operation, retrying transient failures.
///
/// `retries` is the number of re-attempts after the first try, `delay_ms`
/// the pause between attempts. The final error is returned once the
/// attempts are exhausted.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt <= retries => {
                debug!(
                    "Attempt {} failed: {}. Retrying in {}ms...",
                    attempt, err, delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
