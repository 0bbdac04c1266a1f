//! Retry provider - decorator that adds rate-limit aware retry with
//! exponential backoff.
//!
//! Wraps any [`LLMProvider`] and retries rate-limit and network-level
//! failures according to an explicit [`RetryPolicy`]. Waiting goes through an
//! injected [`Sleeper`] so the schedule can be asserted with a fake clock.
//!
//! # Example
//!
//! ```rust,ignore
//! use helmsman::providers::retry::{RetryPolicy, RetryProvider};
//! use helmsman::providers::OpenAIProvider;
//!
//! let inner = OpenAIProvider::new("gsk-xxx");
//! let provider = RetryProvider::new(Box::new(inner))
//!     .with_policy(RetryPolicy::default().with_max_retries(5));
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{HelmError, ModelError, Result};
use crate::session::Message;
use crate::utils::clock::{Sleeper, TokioSleeper};

use super::{ChatOptions, LLMProvider, LLMResponse, ToolDefinition};

/// Backoff schedule for one outbound model call.
///
/// The delay before retry `n` (0-indexed) is `base_delay_ms * 2^n`, so the
/// default policy waits 1s, 2s, 4s. No jitter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Default: 3.
    pub max_retries: u32,
    /// Base delay in milliseconds. Default: 1000.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Delay before the given retry (0-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// A decorator provider that retries transient model errors.
///
/// Only [`ProviderError`](crate::error::ProviderError)s reporting
/// `is_retryable()` are retried. Once the budget is spent the last error is
/// surfaced as [`ModelError::Transient`]; anything else is surfaced
/// immediately as [`ModelError::Fatal`]. Errors that are not provider errors
/// pass through untouched.
pub struct RetryProvider {
    inner: Box<dyn LLMProvider>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryProvider")
            .field("inner", &self.inner.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RetryProvider {
    /// Wrap `inner` with the default policy and the tokio timer.
    pub fn new(inner: Box<dyn LLMProvider>) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the timer used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl LLMProvider for RetryProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let mut retry = 0u32;
        loop {
            let result = self
                .inner
                .chat(messages.clone(), tools.clone(), model, options.clone())
                .await;

            let provider_err = match result {
                Ok(response) => return Ok(response),
                Err(HelmError::Provider(pe)) => pe,
                Err(other) => return Err(other),
            };

            if !provider_err.is_retryable() {
                return Err(ModelError::Fatal(provider_err).into());
            }

            if retry >= self.policy.max_retries {
                return Err(ModelError::Transient {
                    attempts: retry + 1,
                    source: provider_err,
                }
                .into());
            }

            let delay = self.policy.delay_for(retry);
            warn!(
                provider = self.inner.name(),
                attempt = retry + 1,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %provider_err,
                "Retrying model call after transient error"
            );
            self.sleeper.sleep(delay).await;
            retry += 1;
        }
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::utils::clock::RecordingSleeper;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed script of outcomes, one per call.
    struct ScriptedProvider {
        script: Mutex<Vec<Result<LLMResponse>>>,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedProvider {
        fn new(mut script: Vec<Result<LLMResponse>>) -> (Self, Arc<AtomicU32>) {
            script.reverse();
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    script: Mutex::new(script),
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn chat(
            &self,
            _messages: Vec<Message>,
            _tools: Vec<ToolDefinition>,
            _model: Option<&str>,
            _options: ChatOptions,
        ) -> Result<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(LLMResponse::text("exhausted")))
        }

        fn default_model(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn rate_limited() -> Result<LLMResponse> {
        Err(HelmError::Provider(ProviderError::RateLimit("429".into())))
    }

    fn retry_over(script: Vec<Result<LLMResponse>>) -> (RetryProvider, RecordingSleeper, Arc<AtomicU32>) {
        let (inner, calls) = ScriptedProvider::new(script);
        let sleeper = RecordingSleeper::new();
        let provider =
            RetryProvider::new(Box::new(inner)).with_sleeper(Arc::new(sleeper.clone()));
        (provider, sleeper, calls)
    }

    async fn call(provider: &RetryProvider) -> Result<LLMResponse> {
        provider
            .chat(vec![Message::user("hi")], vec![], None, ChatOptions::new())
            .await
    }

    #[test]
    fn test_policy_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_policy_delay_saturates() {
        let policy = RetryPolicy::default().with_base_delay_ms(u64::MAX);
        assert_eq!(policy.delay_for(3), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn test_two_rate_limits_then_success() {
        let (provider, sleeper, calls) =
            retry_over(vec![rate_limited(), rate_limited(), Ok(LLMResponse::text("ok"))]);

        let response = call(&provider).await.unwrap();

        assert_eq!(response.content, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_four_rate_limits_exhaust_budget() {
        let (provider, sleeper, calls) = retry_over(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
        ]);

        let err = call(&provider).await.unwrap_err();

        match err {
            HelmError::Model(ModelError::Transient { attempts, source }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(source, ProviderError::RateLimit(_)));
            }
            other => panic!("expected transient model error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            sleeper.recorded(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test]
    async fn test_network_failure_uses_same_schedule() {
        let (provider, sleeper, _) = retry_over(vec![
            Err(HelmError::Provider(ProviderError::Network("reset".into()))),
            Ok(LLMResponse::text("recovered")),
        ]);

        assert_eq!(call(&provider).await.unwrap().content, "recovered");
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_without_retry() {
        let (provider, sleeper, calls) = retry_over(vec![Err(HelmError::Provider(
            ProviderError::ServerError("boom".into()),
        ))]);

        let err = call(&provider).await.unwrap_err();

        assert!(matches!(err, HelmError::Model(ModelError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_non_provider_error_passes_through() {
        let (provider, _, _) = retry_over(vec![Err(HelmError::Cancelled("m1".into()))]);
        assert!(call(&provider).await.unwrap_err().is_cancellation());
    }

    #[tokio::test]
    async fn test_zero_retries_fails_on_first_rate_limit() {
        let (inner, _) = ScriptedProvider::new(vec![rate_limited()]);
        let sleeper = RecordingSleeper::new();
        let provider = RetryProvider::new(Box::new(inner))
            .with_policy(RetryPolicy::default().with_max_retries(0))
            .with_sleeper(Arc::new(sleeper.clone()));

        let err = call(&provider).await.unwrap_err();
        assert!(matches!(
            err,
            HelmError::Model(ModelError::Transient { attempts: 1, .. })
        ));
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn test_delegates_identity() {
        let (inner, _) = ScriptedProvider::new(vec![]);
        let provider = RetryProvider::new(Box::new(inner));
        assert_eq!(provider.name(), "scripted");
        assert_eq!(provider.default_model(), "scripted");
        assert_eq!(provider.policy().max_retries, 3);
    }
}
