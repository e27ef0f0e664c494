//! Resilience wrapper: bounded retry with exponential backoff and jitter.

use std::time::Duration;

use serde_json::Value;
use skein_capabilities::{CapabilityError, CapabilityFut};

/// Retry policy for a single dispatched invocation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first (engine-wide default: 5, i.e. up
    /// to 4 retries).
    pub max_attempts: u32,
    /// Backoff delay before the first retry.
    pub initial_delay: Duration,
    /// Backoff delay cap.
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = delay multiplied by a random factor in
    /// [0.75, 1.0]).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

/// Backoff delay before retry number `backoff_step + 1`: exponential from
/// `initial_delay`, capped at `max_delay`, with down-jitter applied.
#[must_use]
pub fn calculate_retry_delay(backoff_step: u32, config: &RetryConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step.cast_signed());
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

/// Invoke an operation, retrying failures classified as transient.
///
/// Non-transient failures (invalid arguments, cancellation, terminal
/// failures) propagate immediately. After the final attempt fails, the
/// original error is returned unmodified - never swallowed or replaced.
/// Each retry is logged with the attempt number and the classified reason;
/// this is the engine's only per-step failure logging.
pub async fn invoke_with_retry<'a, F>(
    mut op: F,
    config: &RetryConfig,
) -> Result<Value, CapabilityError>
where
    F: FnMut() -> CapabilityFut<'a>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < max_attempts => {
                let delay = calculate_retry_delay(attempt - 1, config);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %error,
                    delay_ms = delay.as_millis(),
                    "retrying capability invocation after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fast retry config for tests (no meaningful delays, no jitter).
    fn fast_retry_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            jitter_factor: 0.0,
        }
    }

    fn flaky<'a>(
        attempts: &'a AtomicU32,
        failures_before_success: u32,
    ) -> impl FnMut() -> CapabilityFut<'a> {
        move || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                if n <= failures_before_success {
                    Err(CapabilityError::transient(format!("failure {n}")))
                } else {
                    Ok(Value::String("ok".to_string()))
                }
            })
        }
    }

    #[test]
    fn delay_bounds_with_jitter() {
        let config = RetryConfig::default();

        // First retry (backoff_step=0): base 500ms, down-jitter to [375, 500].
        for _ in 0..100 {
            let delay = calculate_retry_delay(0, &config);
            assert!(delay >= Duration::from_millis(375));
            assert!(delay <= Duration::from_millis(500));
        }

        // Far step: capped at max_delay before jitter.
        for _ in 0..100 {
            let delay = calculate_retry_delay(10, &config);
            assert!(delay <= config.max_delay);
            assert!(delay >= Duration::from_secs_f64(8.0 * 0.75));
        }
    }

    #[tokio::test]
    async fn success_on_first_attempt_invokes_once() {
        let attempts = AtomicU32::new(0);
        let result = invoke_with_retry(flaky(&attempts, 0), &fast_retry_config()).await;
        assert_eq!(result, Ok(Value::String("ok".to_string())));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_then_success_on_final_attempt() {
        let attempts = AtomicU32::new(0);
        let result = invoke_with_retry(flaky(&attempts, 4), &fast_retry_config()).await;
        assert_eq!(result, Ok(Value::String("ok".to_string())));
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_the_original_transient_error() {
        let attempts = AtomicU32::new(0);
        let result = invoke_with_retry(flaky(&attempts, 99), &fast_retry_config()).await;
        assert_eq!(
            result,
            Err(CapabilityError::Transient {
                reason: "failure 5".to_string(),
            })
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn non_transient_failures_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let mut op = || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                Err(CapabilityError::InvalidArguments(
                    "missing argument `text`".to_string(),
                ))
            }) as CapabilityFut<'_>
        };
        let result = invoke_with_retry(&mut op, &fast_retry_config()).await;
        assert!(matches!(result, Err(CapabilityError::InvalidArguments(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_propagates_immediately() {
        let attempts = AtomicU32::new(0);
        let mut op = || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(CapabilityError::Cancelled) }) as CapabilityFut<'_>
        };
        let result = invoke_with_retry(&mut op, &fast_retry_config()).await;
        assert_eq!(result, Err(CapabilityError::Cancelled));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
