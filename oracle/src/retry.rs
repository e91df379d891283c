//! HTTP retry policy for oracle round trips.
//!
//! # Retry Policy
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 200ms, doubling per retry
//! - Max delay: 2 seconds
//! - Jitter: down-jitter up to 25% (multiplier in [0.75, 1.0])
//!
//! # Retryable Conditions
//!
//! - HTTP 408, 429, 5xx
//! - Connect and timeout failures
//!
//! # Headers
//!
//! - `X-Reach-Retry-Count`: 0 for the initial attempt, 1+ for retries
//! - `X-Reach-Request-Id`: `reach-{uuid}`, identical across all attempts

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use uuid::Uuid;

pub const RETRY_COUNT_HEADER: &str = "X-Reach-Retry-Count";
pub const REQUEST_ID_HEADER: &str = "X-Reach-Request-Id";

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 0.25 = delays shrink by up to 25%.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            jitter_factor: 0.25,
        }
    }
}

#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}

/// Exponential backoff: `initial_delay * 2^backoff_step`, capped, then jittered down.
#[must_use]
pub fn retry_delay(backoff_step: u32, config: &RetryConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

#[must_use]
pub fn request_id() -> String {
    format!("reach-{}", Uuid::new_v4())
}

/// How a retried request ended.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx status.
    Success(Response),
    /// Non-2xx status that was not retryable or exhausted the retries.
    HttpError(Response),
    /// Transport failure on the final attempt.
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
}

/// Send the request produced by `build_request`, retrying per `config`.
///
/// `build_request` is invoked once per attempt.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let request_id = request_id();
    let mut attempt: u32 = 0;

    loop {
        let request = build_request()
            .header(RETRY_COUNT_HEADER, attempt.to_string())
            .header(REQUEST_ID_HEADER, &request_id);
        let can_retry = attempt < config.max_retries;

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return RetryOutcome::Success(response);
                }
                if !(can_retry && should_retry(status)) {
                    return RetryOutcome::HttpError(response);
                }
                let delay = retry_delay(attempt, config);
                tracing::debug!(
                    status = %status,
                    retry_count = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying oracle request after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if !(can_retry && is_retryable_error(&e)) {
                    return RetryOutcome::ConnectionError {
                        attempts: attempt + 1,
                        source: e,
                    };
                }
                let delay = retry_delay(attempt, config);
                tracing::debug!(
                    error = %e,
                    retry_count = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying oracle request after connection error"
                );
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}
