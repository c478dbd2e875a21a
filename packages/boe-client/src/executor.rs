//! Retry driver.
//!
//! [`RequestExecutor`] runs one logical request: transient faults are retried
//! with linear backoff (`retry_delay * (attempt + 1)`), permanent failures
//! surface on first sight, and attempts never overlap. Every suspension point
//! races the caller's cancellation token.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::transport::{AttemptOutcome, HttpRequest, Transport, TransportFault};

/// How many times to retry transient faults, and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Single attempt, no backoff.
    pub fn no_retries() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt.saturating_add(1))
    }
}

/// What an observer sees after each attempt.
#[derive(Debug)]
pub struct AttemptEvent<'a> {
    /// 1-based.
    pub attempt: u32,
    pub max_attempts: u32,
    pub target: &'a str,
    /// Backoff slept before this attempt.
    pub delay_before: Duration,
    pub elapsed: Duration,
    pub outcome: &'a AttemptOutcome,
}

/// Hook notified after every attempt.
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, event: &AttemptEvent<'_>);
}

/// Logs attempts through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        let elapsed_ms = event.elapsed.as_millis();
        match event.outcome {
            AttemptOutcome::Success(body) => debug!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                url = event.target,
                elapsed_ms,
                bytes = body.len(),
                "BOE request succeeded"
            ),
            AttemptOutcome::TransientFailure(fault) => warn!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                url = event.target,
                elapsed_ms,
                error = %fault,
                "BOE request failed, transient"
            ),
            AttemptOutcome::PermanentFailure { status, .. } => warn!(
                attempt = event.attempt,
                url = event.target,
                status,
                elapsed_ms,
                "BOE request rejected"
            ),
        }
    }
}

/// One try inside the retry loop.
struct RequestAttempt {
    number: u32,
    delay_before: Duration,
    outcome: AttemptOutcome,
}

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    observer: Arc<dyn AttemptObserver>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run `request` to completion under `policy`.
    pub async fn execute(&self, request: &HttpRequest, policy: &RetryPolicy) -> Result<String> {
        self.execute_with_cancel(request, policy, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), abandoned when `deadline` passes.
    pub async fn execute_with_deadline(
        &self,
        request: &HttpRequest,
        policy: &RetryPolicy,
        deadline: Duration,
    ) -> Result<String> {
        match tokio::time::timeout(deadline, self.execute(request, policy)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %request.endpoint, ?deadline, "BOE request deadline passed");
                Err(ApiError::cancelled(&request.url()))
            }
        }
    }

    /// Like [`execute`](Self::execute), abandoned when `cancel` fires.
    pub async fn execute_with_cancel(
        &self,
        request: &HttpRequest,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let target = request.url();
        let max_attempts = policy.max_attempts();
        let mut delay_before = Duration::ZERO;
        let mut last_fault: Option<TransportFault> = None;

        for number in 0..=policy.max_retries {
            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&target, number)),
                outcome = self.transport.send(request) => outcome,
            };

            let attempt = RequestAttempt {
                number,
                delay_before,
                outcome,
            };
            self.observer.on_attempt(&AttemptEvent {
                attempt: attempt.number + 1,
                max_attempts,
                target: &target,
                delay_before: attempt.delay_before,
                elapsed: started.elapsed(),
                outcome: &attempt.outcome,
            });

            match attempt.outcome {
                AttemptOutcome::Success(body) => return Ok(body),
                AttemptOutcome::PermanentFailure { status, body } => {
                    return Err(ApiError::remote(status, &body));
                }
                AttemptOutcome::TransientFailure(fault) => {
                    last_fault = Some(fault);
                    if number < policy.max_retries {
                        delay_before = policy.backoff(number);
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(self.cancelled(&target, number + 1)),
                            _ = tokio::time::sleep(delay_before) => {}
                        }
                    }
                }
            }
        }

        let cause = last_fault
            .map(|fault| fault.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());
        warn!(url = %target, attempts = max_attempts, error = %cause, "BOE request gave up");
        Err(ApiError::retries_exhausted(max_attempts, cause))
    }

    fn cancelled(&self, target: &str, attempts_made: u32) -> ApiError {
        debug!(url = target, attempts_made, "BOE request cancelled");
        ApiError::cancelled(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Endpoint, ResourceCategory};
    use crate::error::{ErrorKind, NetworkFailure};
    use crate::normalize::DocumentFormat;
    use crate::testing::{RecordingObserver, ScriptedTransport};
    use crate::transport::TransportFault;

    fn request() -> HttpRequest {
        HttpRequest::get(
            Endpoint::new("http://boe.test", ResourceCategory::Legislation),
            DocumentFormat::Json,
            Duration::from_secs(5),
        )
    }

    fn refused() -> AttemptOutcome {
        AttemptOutcome::TransientFailure(TransportFault::connect("connection refused"))
    }

    fn executor(transport: &Arc<ScriptedTransport>) -> RequestExecutor {
        RequestExecutor::new(transport.clone())
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(300));
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(RetryPolicy::new(u32::MAX, Duration::ZERO).max_attempts(), u32::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_exhaust_retries() {
        let transport = Arc::new(ScriptedTransport::always(refused()));
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let started = Instant::now();
        let err = executor(&transport).execute(&request(), &policy).await.unwrap_err();

        assert_eq!(transport.calls(), 4);
        assert_eq!(err.kind, ErrorKind::Network(NetworkFailure::RetriesExhausted));
        assert_eq!(err.code, 500);
        assert!(err.detail.unwrap().contains("connection refused"));
        // 1s + 2s + 3s of backoff, none after the last attempt.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(7), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_one_attempt() {
        let transport = Arc::new(ScriptedTransport::always(refused()));
        let started = Instant::now();
        let err = executor(&transport)
            .execute(&request(), &RetryPolicy::new(0, Duration::from_secs(10)))
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(err.kind, ErrorKind::Network(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::always(AttemptOutcome::PermanentFailure {
            status: 404,
            body: "Not Found".into(),
        }));
        let err = executor(&transport)
            .execute(&request(), &RetryPolicy::new(5, Duration::from_secs(1)))
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert_eq!(err.kind, ErrorKind::Remote);
        assert_eq!(err.code, 404);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_after_transient_stops_immediately() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .then(refused())
                .then(AttemptOutcome::PermanentFailure {
                    status: 503,
                    body: String::new(),
                })
                .then(AttemptOutcome::Success("{}".into())),
        );
        let err = executor(&transport)
            .execute(&request(), &RetryPolicy::new(5, Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert_eq!(transport.calls(), 2);
        assert_eq!(err.code, 503);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .then(AttemptOutcome::TransientFailure(TransportFault::timeout("timed out")))
                .then(AttemptOutcome::Success("ok".into())),
        );
        let observer = Arc::new(RecordingObserver::new());
        let executor = executor(&transport).with_observer(observer.clone());

        let body = executor
            .execute(&request(), &RetryPolicy::new(3, Duration::from_millis(250)))
            .await
            .unwrap();

        assert_eq!(body, "ok");
        let attempts = observer.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].attempt, 1);
        assert_eq!(attempts[0].delay_before, Duration::ZERO);
        assert_eq!(attempts[1].attempt, 2);
        assert_eq!(attempts[1].delay_before, Duration::from_millis(250));
        assert!(attempts[1].outcome.is_success());
        assert_eq!(attempts[1].target, "http://boe.test/legislacion-consolidada");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let transport = Arc::new(ScriptedTransport::always(refused()));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let err = executor(&transport)
            .execute_with_cancel(&request(), &RetryPolicy::new(3, Duration::from_secs(1)), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_skips_network() {
        let transport = Arc::new(ScriptedTransport::always(AttemptOutcome::Success("x".into())));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = executor(&transport)
            .execute_with_cancel(&request(), &RetryPolicy::no_retries(), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_slow_attempt() {
        let transport = Arc::new(
            ScriptedTransport::always(AttemptOutcome::Success("late".into()))
                .with_latency(Duration::from_secs(60)),
        );
        let err = executor(&transport)
            .execute_with_deadline(&request(), &RetryPolicy::no_retries(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Network(NetworkFailure::Cancelled));
    }
}
