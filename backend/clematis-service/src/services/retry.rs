/// Retry with exponential backoff and jitter for operations that fail with
/// retryable [`AppError`]s. Other errors are returned on the first attempt.
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

pub async fn retry_transient<F, Fut, T>(config: &RetryConfig, operation: &str, mut f: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 1;
    let mut backoff = config.initial_backoff;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_attempts => {
                let delay = with_jitter(backoff);
                warn!(
                    operation,
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %err,
                    "retrying after {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                backoff = (backoff * 2).min(config.max_backoff);
            }
            Err(err) => return Err(err),
        }
    }
}

/// ±30%
fn with_jitter(backoff: Duration) -> Duration {
    let millis = backoff.as_millis() as f64;
    let factor = rand::thread_rng().gen_range(0.7..=1.3);
    Duration::from_millis((millis * factor) as u64)
}
