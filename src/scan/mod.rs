// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Scan engine - drives a single scan from start to verdict
//!
//! ```text
//! Idle --start()--> Scanning --(detector resolves)--> Complete --reset()--> Idle
//!                      |
//!                      +--(detector error | stream lost | timeout | dropped)--> Idle
//! ```
//!
//! Only one scan can be in flight. A `start()` that arrives while another is
//! running is rejected, never queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capture::StreamView;
use crate::core::{EventBus, SessionEvent};
use crate::detection::{Detector, DetectorError, Verdict};

/// Coarse scan status, as shown to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Idle,
    Scanning,
    Complete,
}

/// Full scan state. The verdict only exists in `Complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSession {
    Idle,
    Scanning {
        scan_id: u64,
        started_at: DateTime<Utc>,
    },
    Complete {
        scan_id: u64,
        verdict: Verdict,
        completed_at: DateTime<Utc>,
    },
}

impl ScanSession {
    pub fn status(&self) -> ScanStatus {
        match self {
            ScanSession::Idle => ScanStatus::Idle,
            ScanSession::Scanning { .. } => ScanStatus::Scanning,
            ScanSession::Complete { .. } => ScanStatus::Complete,
        }
    }

    pub fn result(&self) -> Option<Verdict> {
        match self {
            ScanSession::Complete { verdict, .. } => Some(*verdict),
            _ => None,
        }
    }
}

/// Emitted exactly once per successful scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCompleted {
    pub scan_id: u64,
    pub verdict: Verdict,
    /// Taken when the detector resolved, not when the scan started
    pub timestamp: DateTime<Utc>,
}

/// Why a scan ended without a verdict
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanFailure {
    #[error("capture stream lost during scan")]
    StreamLost,

    #[error("detector did not answer within {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("detector failed: {0}")]
    Detector(String),

    #[error("scan cancelled")]
    Cancelled,
}

/// Result of one call to [`ScanEngine::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(ScanCompleted),
    Failed { scan_id: u64, reason: ScanFailure },
    /// Another scan was already running; nothing happened
    Rejected,
}

impl ScanOutcome {
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            ScanOutcome::Completed(c) => Some(c.verdict),
            _ => None,
        }
    }
}

/// Scan state machine around a pluggable [`Detector`]
pub struct ScanEngine {
    detector: Arc<dyn Detector>,
    event_bus: Arc<EventBus>,
    detector_timeout: Option<Duration>,
    session: Mutex<ScanSession>,
    next_scan_id: AtomicU64,
}

impl ScanEngine {
    pub fn new(
        detector: Arc<dyn Detector>,
        event_bus: Arc<EventBus>,
        detector_timeout: Option<Duration>,
    ) -> Self {
        Self {
            detector,
            event_bus,
            detector_timeout,
            session: Mutex::new(ScanSession::Idle),
            next_scan_id: AtomicU64::new(1),
        }
    }

    pub fn status(&self) -> ScanStatus {
        self.session.lock().status()
    }

    pub fn result(&self) -> Option<Verdict> {
        self.session.lock().result()
    }

    pub fn session(&self) -> ScanSession {
        self.session.lock().clone()
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Run one scan over `stream`.
    ///
    /// Starting from `Complete` resets implicitly. Returns `Rejected` without
    /// touching any state if a scan is already running.
    pub async fn start(&self, stream: &StreamView) -> ScanOutcome {
        let scan_id = match self.begin() {
            Some(id) => id,
            None => {
                debug!("Scan already in flight, start() ignored");
                return ScanOutcome::Rejected;
            }
        };

        info!("Scan #{} started on {} using {} detector", scan_id, stream.id(), self.detector.name());
        self.event_bus.publish(SessionEvent::ScanStarted { scan_id });

        let mut in_flight = InFlight { engine: self, scan_id, armed: true };
        let result = self.run_detector(stream).await;
        in_flight.armed = false;

        match result {
            Ok(verdict) => self.complete(scan_id, verdict),
            Err(reason) => self.fail(scan_id, reason),
        }
    }

    /// Back to `Idle` from `Complete`. Returns false (and does nothing) in
    /// any other state.
    pub fn reset(&self) -> bool {
        let mut session = self.session.lock();
        let scan_id = match *session {
            ScanSession::Complete { scan_id, .. } => scan_id,
            _ => return false,
        };
        debug!("Scan #{} reset", scan_id);
        *session = ScanSession::Idle;
        true
    }

    fn begin(&self) -> Option<u64> {
        let mut session = self.session.lock();
        if matches!(*session, ScanSession::Scanning { .. }) {
            return None;
        }
        let scan_id = self.next_scan_id.fetch_add(1, Ordering::Relaxed);
        *session = ScanSession::Scanning {
            scan_id,
            started_at: Utc::now(),
        };
        Some(scan_id)
    }

    async fn run_detector(&self, stream: &StreamView) -> Result<Verdict, ScanFailure> {
        if !stream.is_live() {
            return Err(ScanFailure::StreamLost);
        }

        let timeout = self.detector_timeout;
        let deadline = async move {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => futures::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = stream.ended() => Err(ScanFailure::StreamLost),
            result = self.detector.detect(stream) => result.map_err(|e| match e {
                DetectorError::Stream(_) => ScanFailure::StreamLost,
                other => ScanFailure::Detector(other.to_string()),
            }),
            _ = deadline => Err(ScanFailure::Timeout {
                after_ms: timeout.map(|t| t.as_millis() as u64).unwrap_or(0),
            }),
        }
    }

    fn complete(&self, scan_id: u64, verdict: Verdict) -> ScanOutcome {
        let completed = ScanCompleted {
            scan_id,
            verdict,
            timestamp: Utc::now(),
        };

        *self.session.lock() = ScanSession::Complete {
            scan_id,
            verdict,
            completed_at: completed.timestamp,
        };

        info!("Scan #{} complete: {}", scan_id, verdict);
        self.event_bus.publish_completion(completed.clone());
        ScanOutcome::Completed(completed)
    }

    fn fail(&self, scan_id: u64, reason: ScanFailure) -> ScanOutcome {
        {
            let mut session = self.session.lock();
            let current = matches!(
                *session,
                ScanSession::Scanning { scan_id: id, .. } if id == scan_id
            );
            if current {
                *session = ScanSession::Idle;
            }
        }

        warn!("Scan #{} failed: {}", scan_id, reason);
        self.event_bus.publish(SessionEvent::ScanFailed {
            scan_id,
            reason: reason.clone(),
        });
        ScanOutcome::Failed { scan_id, reason }
    }
}

/// Puts the engine back to `Idle` if a scan future is dropped mid-flight
struct InFlight<'a> {
    engine: &'a ScanEngine,
    scan_id: u64,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.engine.fail(self.scan_id, ScanFailure::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::capture::{CaptureDevice, MediaConstraints, SimulatedDevice};
    use crate::detection::ScriptedDetector;

    struct HangingDetector;

    #[async_trait]
    impl Detector for HangingDetector {
        fn name(&self) -> &str { "hanging" }

        async fn detect(&self, _stream: &StreamView) -> Result<Verdict, DetectorError> {
            futures::future::pending().await
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl Detector for FailingDetector {
        fn name(&self) -> &str { "failing" }

        async fn detect(&self, _stream: &StreamView) -> Result<Verdict, DetectorError> {
            Err(DetectorError::Internal("model crashed".to_string()))
        }
    }

    async fn granted() -> (SimulatedDevice, StreamView) {
        let device = SimulatedDevice::new("test");
        let stream = device.acquire(&MediaConstraints::default()).await.unwrap();
        (device, StreamView::new(stream))
    }

    fn engine(detector: Arc<dyn Detector>, timeout: Option<Duration>) -> (ScanEngine, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(64));
        (ScanEngine::new(detector, bus.clone(), timeout), bus)
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<crate::core::Event>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event.payload);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight() {
        let (_device, view) = granted().await;
        let detector = Arc::new(
            ScriptedDetector::always(Verdict::Authentic).with_latency(Duration::from_millis(100)),
        );
        let (engine, _bus) = engine(detector.clone(), None);

        let (a, b, c) = tokio::join!(engine.start(&view), engine.start(&view), engine.start(&view));

        assert_eq!(a.verdict(), Some(Verdict::Authentic));
        assert_eq!(b, ScanOutcome::Rejected);
        assert_eq!(c, ScanOutcome::Rejected);
        assert_eq!(detector.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_only_when_complete() {
        let (_device, view) = granted().await;
        let detector = Arc::new(
            ScriptedDetector::new(vec![Verdict::Fake, Verdict::Authentic])
                .unwrap()
                .with_latency(Duration::from_millis(50)),
        );
        let (engine, _bus) = engine(detector, None);

        assert_eq!(engine.status(), ScanStatus::Idle);
        assert_eq!(engine.result(), None);

        let probe = async {
            tokio::task::yield_now().await;
            assert_eq!(engine.status(), ScanStatus::Scanning);
            assert_eq!(engine.result(), None);
        };
        tokio::join!(engine.start(&view), probe);

        assert_eq!(engine.status(), ScanStatus::Complete);
        assert_eq!(engine.result(), Some(Verdict::Fake));

        // Starting again from Complete clears the previous verdict
        let probe = async {
            tokio::task::yield_now().await;
            assert_eq!(engine.status(), ScanStatus::Scanning);
            assert_eq!(engine.result(), None);
        };
        tokio::join!(engine.start(&view), probe);
        assert_eq!(engine.result(), Some(Verdict::Authentic));

        assert!(engine.reset());
        assert_eq!(engine.status(), ScanStatus::Idle);
        assert_eq!(engine.result(), None);
    }

    #[tokio::test]
    async fn test_completion_emitted_once_with_resolution_time() {
        let (_device, view) = granted().await;
        let (engine, bus) = engine(Arc::new(ScriptedDetector::always(Verdict::Fake)), None);
        let mut events = bus.subscribe_events();
        let mut completions = bus.subscribe_completions();

        let before = Utc::now();
        let outcome = engine.start(&view).await;
        let after = Utc::now();

        let completed = match outcome {
            ScanOutcome::Completed(c) => c,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(completed.verdict, Verdict::Fake);
        assert!(completed.timestamp >= before && completed.timestamp <= after);

        assert_eq!(completions.try_recv().unwrap(), completed);
        assert!(completions.try_recv().is_err());

        let seen = drain(&mut events);
        assert_eq!(
            seen,
            vec![
                SessionEvent::ScanStarted { scan_id: completed.scan_id },
                SessionEvent::ScanCompleted(completed),
            ]
        );
    }

    #[tokio::test]
    async fn test_reset_is_noop_outside_complete() {
        let (engine, _bus) = engine(Arc::new(ScriptedDetector::always(Verdict::Fake)), None);
        assert!(!engine.reset());
        assert_eq!(engine.status(), ScanStatus::Idle);
    }

    #[tokio::test]
    async fn test_detector_error_returns_to_idle() {
        let (_device, view) = granted().await;
        let (engine, bus) = engine(Arc::new(FailingDetector), None);
        let mut completions = bus.subscribe_completions();

        let outcome = engine.start(&view).await;
        assert!(matches!(
            outcome,
            ScanOutcome::Failed { reason: ScanFailure::Detector(_), .. }
        ));
        assert_eq!(engine.status(), ScanStatus::Idle);
        assert!(completions.try_recv().is_err());

        // Restartable after failure
        assert!(matches!(engine.start(&view).await, ScanOutcome::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_loss_aborts_scan() {
        let (device, view) = granted().await;
        let (engine, bus) = engine(Arc::new(HangingDetector), None);
        let mut events = bus.subscribe_events();

        let unplug = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            device.revoke();
        };
        let (outcome, _) = tokio::join!(engine.start(&view), unplug);

        assert_eq!(outcome, ScanOutcome::Failed { scan_id: 1, reason: ScanFailure::StreamLost });
        assert_eq!(engine.status(), ScanStatus::Idle);
        assert!(drain(&mut events).contains(&SessionEvent::ScanFailed {
            scan_id: 1,
            reason: ScanFailure::StreamLost,
        }));
    }

    #[tokio::test]
    async fn test_dead_stream_fails_immediately() {
        let (device, view) = granted().await;
        device.revoke();
        let detector = Arc::new(ScriptedDetector::always(Verdict::Authentic));
        let (engine, _bus) = engine(detector.clone(), None);

        let outcome = engine.start(&view).await;
        assert!(matches!(outcome, ScanOutcome::Failed { reason: ScanFailure::StreamLost, .. }));
        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_detector_times_out() {
        let (_device, view) = granted().await;
        let (engine, _bus) = engine(Arc::new(HangingDetector), Some(Duration::from_millis(50)));

        let outcome = engine.start(&view).await;
        assert_eq!(
            outcome,
            ScanOutcome::Failed { scan_id: 1, reason: ScanFailure::Timeout { after_ms: 50 } }
        );
        assert_eq!(engine.status(), ScanStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_scan_is_cancelled() {
        let (_device, view) = granted().await;
        let (engine, bus) = engine(Arc::new(HangingDetector), None);
        let mut events = bus.subscribe_events();

        let dropped = tokio::time::timeout(Duration::from_millis(10), engine.start(&view)).await;
        assert!(dropped.is_err());

        assert_eq!(engine.status(), ScanStatus::Idle);
        assert!(drain(&mut events).contains(&SessionEvent::ScanFailed {
            scan_id: 1,
            reason: ScanFailure::Cancelled,
        }));
    }
}
