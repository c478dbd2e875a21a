//! Testing utilities including scripted doubles.
//!
//! These let callers exercise retry, parsing and validation paths without
//! touching the network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::executor::{AttemptEvent, AttemptObserver};
use crate::transport::{AttemptOutcome, FaultKind, HttpRequest, Transport, TransportFault};

/// A transport that replays a fixed list of outcomes.
///
/// Outcomes are consumed in order; the last one repeats forever. Every
/// request is recorded for assertions.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Arc<RwLock<VecDeque<AttemptOutcome>>>,
    latency: Duration,
    calls: AtomicUsize,
    requests: Arc<RwLock<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request with `outcome`.
    pub fn always(outcome: AttemptOutcome) -> Self {
        Self::new().then(outcome)
    }

    /// Queue the next outcome.
    pub fn then(self, outcome: AttemptOutcome) -> Self {
        self.script.write().unwrap().push_back(outcome);
        self
    }

    /// Delay every answer, e.g. to trip deadlines.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of attempts received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.read().unwrap().clone()
    }

    fn next_outcome(&self) -> AttemptOutcome {
        let mut script = self.script.write().unwrap();
        if script.len() > 1 {
            if let Some(outcome) = script.pop_front() {
                return outcome;
            }
        }
        script.front().cloned().unwrap_or_else(|| {
            AttemptOutcome::TransientFailure(TransportFault::new(
                FaultKind::Other,
                "no scripted outcome",
            ))
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> AttemptOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.write().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.next_outcome()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Owned copy of an [`AttemptEvent`].
#[derive(Debug, Clone)]
pub struct RecordedAttempt {
    pub attempt: u32,
    pub max_attempts: u32,
    pub target: String,
    pub delay_before: Duration,
    pub outcome: AttemptOutcome,
}

/// Observer that keeps every attempt it sees.
#[derive(Default)]
pub struct RecordingObserver {
    attempts: Arc<RwLock<Vec<RecordedAttempt>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> Vec<RecordedAttempt> {
        self.attempts.read().unwrap().clone()
    }
}

impl AttemptObserver for RecordingObserver {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        self.attempts.write().unwrap().push(RecordedAttempt {
            attempt: event.attempt,
            max_attempts: event.max_attempts,
            target: event.target.to_string(),
            delay_before: event.delay_before,
            outcome: event.outcome.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Endpoint, ResourceCategory};
    use crate::normalize::DocumentFormat;

    #[tokio::test]
    async fn test_script_replays_then_repeats_last() {
        let transport = ScriptedTransport::new()
            .then(AttemptOutcome::Success("one".into()))
            .then(AttemptOutcome::Success("two".into()));
        let request = HttpRequest::get(
            Endpoint::new("http://boe.test", ResourceCategory::BoeSummary),
            DocumentFormat::Json,
            Duration::from_secs(1),
        );

        let mut bodies = Vec::new();
        for _ in 0..3 {
            if let AttemptOutcome::Success(body) = transport.send(&request).await {
                bodies.push(body);
            }
        }
        assert_eq!(bodies, vec!["one", "two", "two"]);
        assert_eq!(transport.calls(), 3);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_is_transient() {
        let transport = ScriptedTransport::new();
        let request = HttpRequest::get(
            Endpoint::new("http://boe.test", ResourceCategory::BoeSummary),
            DocumentFormat::Json,
            Duration::from_secs(1),
        );
        assert!(matches!(
            transport.send(&request).await,
            AttemptOutcome::TransientFailure(_)
        ));
    }
}
