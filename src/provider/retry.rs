// src/provider/retry.rs — Transient-failure retry for model providers
//
// Wraps any ModelProvider and re-issues chat calls that fail with a
// retriable error (rate limits, 5xx, timeouts). Client errors such as
// bad requests or auth failures surface immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider};
use crate::infra::errors::ScrutineerError;

/// Retry behavior. The delay doubles per attempt up to `max_delay`, and
/// a server-sent rate-limit wait overrides the schedule. Defaults stay
/// modest: one model call is a fraction of an iteration, and the run
/// budget is only checked between iterations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(15),
            jitter_fraction: 0.2,
        }
    }
}

/// Provider wrapper adding bounded retry around `chat`.
pub struct RetryProvider {
    inner: Arc<dyn ModelProvider>,
    config: RetryConfig,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn ModelProvider>) -> Self {
        Self::with_config(inner, RetryConfig::default())
    }

    pub fn with_config(inner: Arc<dyn ModelProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

/// Delay before the given retry attempt (0-indexed). A rate-limit hint
/// from the server wins over the doubling schedule.
fn backoff_delay(config: &RetryConfig, attempt: u32, hint: Option<Duration>) -> Duration {
    if let Some(wait) = hint {
        return wait + Duration::from_millis(100);
    }

    let base_ms = config.initial_delay.as_millis() as u64;
    let doubled_ms = base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    let capped_ms = doubled_ms.min(config.max_delay.as_millis() as u64);

    let jittered = capped_ms as f64 * jitter_multiplier(attempt, config.jitter_fraction);
    Duration::from_millis(jittered as u64)
}

/// Deterministic multiplier in [1 - fraction, 1 + fraction], keyed on
/// the attempt number. Spreads concurrent retries without making tests
/// flaky.
fn jitter_multiplier(attempt: u32, fraction: f64) -> f64 {
    let unit = f64::from(attempt.wrapping_mul(0x9E37_79B9)) / f64::from(u32::MAX);
    (1.0 - fraction) + 2.0 * fraction * unit
}

/// Server-sent wait from a rate-limit error, if it carried one.
fn retry_after_hint(error: &ScrutineerError) -> Option<Duration> {
    match error {
        ScrutineerError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

#[async_trait]
impl ModelProvider for RetryProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ScrutineerError> {
        let mut attempt = 0;
        loop {
            let err = match self.inner.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if attempt >= self.config.max_retries || !err.is_retriable() {
                return Err(err);
            }

            let delay = backoff_delay(&self.config, attempt, retry_after_hint(&err));
            tracing::warn!(
                provider = self.inner.id(),
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                "retriable provider error: {err}"
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
