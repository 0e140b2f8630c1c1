//! Retry wrapper for the conversational-agent backend
//!
//! Wraps any `LlmPort` with exponential backoff so that a dropped connection
//! or a malformed body does not surface to the player as a failed reply.
//! The dialogue gateway still bounds the whole exchange with its own timeout,
//! so retries never extend a wait past that bound.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

/// Backoff schedule for retried requests
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Fraction (0.0-1.0) of the delay to randomize in either direction
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), capped.
    fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);

        if self.jitter_factor <= 0.0 {
            return capped;
        }
        let spread = capped.as_secs_f64() * self.jitter_factor;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((capped.as_secs_f64() + offset).max(0.0))
    }
}

/// `LlmPort` decorator that retries transient failures
pub struct ResilientLlmClient {
    inner: Arc<dyn LlmPort>,
    config: RetryConfig,
}

impl ResilientLlmClient {
    pub fn new(inner: Arc<dyn LlmPort>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Client errors (bad request, auth) will fail the same way every time.
    fn is_retryable(error: &LlmError) -> bool {
        match error {
            LlmError::RequestFailed(msg) => {
                !["400", "401", "403", "404"]
                    .iter()
                    .any(|code| msg.starts_with(code))
            }
            LlmError::InvalidResponse(_) => true,
        }
    }
}

#[async_trait]
impl LlmPort for ResilientLlmClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut retry = 0;
        loop {
            let error = match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    if retry > 0 {
                        tracing::info!(retries = retry, "Agent reply succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => e,
            };

            if !Self::is_retryable(&error) {
                tracing::error!(error = %error, "Agent request failed with non-retryable error");
                return Err(error);
            }
            if retry >= self.config.max_retries {
                tracing::error!(
                    attempts = retry + 1,
                    error = %error,
                    "Agent request failed after all retry attempts"
                );
                return Err(error);
            }

            retry += 1;
            let delay = self.config.delay_for(retry);
            tracing::warn!(
                retry,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Agent request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{FinishReason, MockLlmPort};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ok_response() -> LlmResponse {
        LlmResponse {
            content: "Fine. Talk.".to_string(),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }

    fn no_jitter(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            jitter_factor: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let mut inner = MockLlmPort::new();
        inner.expect_generate().times(3).returning(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LlmError::RequestFailed("connection reset".into()))
            } else {
                Ok(ok_response())
            }
        });

        let client = ResilientLlmClient::new(Arc::new(inner), no_jitter(3));
        let response = client
            .generate(LlmRequest::new(vec![]))
            .await
            .expect("third attempt succeeds");

        assert_eq!(response.content, "Fine. Talk.");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let mut inner = MockLlmPort::new();
        inner
            .expect_generate()
            .times(3)
            .returning(|_| Err(LlmError::InvalidResponse("truncated body".into())));

        let client = ResilientLlmClient::new(Arc::new(inner), no_jitter(2));
        let err = client.generate(LlmRequest::new(vec![])).await.unwrap_err();

        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_not_retried() {
        let mut inner = MockLlmPort::new();
        inner
            .expect_generate()
            .times(1)
            .returning(|_| Err(LlmError::RequestFailed("401 Unauthorized: bad key".into())));

        let client = ResilientLlmClient::new(Arc::new(inner), no_jitter(3));
        assert!(client.generate(LlmRequest::new(vec![])).await.is_err());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = no_jitter(5);
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(300));
        assert_eq!(config.delay_for(6), Duration::from_millis(300));
    }
}
