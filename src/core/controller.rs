// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Session controller - owns capture, scanning and history for one app session

use std::sync::Arc;
use anyhow::Result;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use super::{EventBus, SessionSnapshot};
use crate::capture::{CaptureDevice, CaptureSession, PermissionError, PermissionState};
use crate::config::Config;
use crate::detection::{Detector, Verdict};
use crate::history::{HistoryError, HistoryLog};
use crate::scan::{ScanCompleted, ScanEngine, ScanFailure, ScanOutcome, ScanStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("camera and microphone access has not been granted")]
    NotGranted,

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// What the single scanner button did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryAction {
    AccessRequested,
    Scanned(ScanOutcome),
    Reset,
}

/// Top-level owner of the capture session, scan engine and history log.
///
/// History is only ever fed from the scan engine's completion channel.
pub struct SessionController {
    config: Arc<Config>,
    event_bus: Arc<EventBus>,
    device: Arc<dyn CaptureDevice>,
    capture: Option<CaptureSession>,
    scanner: ScanEngine,
    history: HistoryLog,
    completions: broadcast::Receiver<ScanCompleted>,
}

impl SessionController {
    pub fn new(
        config: Config,
        device: Arc<dyn CaptureDevice>,
        detector: Arc<dyn Detector>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let event_bus = Arc::new(EventBus::new(config.events.channel_capacity));
        let completions = event_bus.subscribe_completions();
        let scanner = ScanEngine::new(detector, event_bus.clone(), config.scan.detector_timeout());
        let history = match config.history.max_records {
            Some(max) => HistoryLog::with_limit(max),
            None => HistoryLog::new(),
        };

        info!(
            "Session ready: device {}, detector {}, timeout {:?}",
            device.name(),
            scanner.detector_name(),
            config.scan.detector_timeout()
        );

        Ok(Self {
            config,
            event_bus,
            device,
            capture: None,
            scanner,
            history,
            completions,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    /// Create the capture session on first interaction with the scanner
    pub fn open_scanner(&mut self) -> &mut CaptureSession {
        if self.capture.is_none() {
            debug!("Opening scanner view");
        }
        let device = self.device.clone();
        let constraints = self.config.capture.clone();
        let bus = self.event_bus.clone();
        self.capture
            .get_or_insert_with(|| CaptureSession::new(device, constraints, bus))
    }

    /// Tear down the scanner view, releasing the stream.
    /// Returns true if a live stream was released.
    pub fn close_scanner(&mut self) -> bool {
        match self.capture.take() {
            Some(mut capture) => {
                debug!("Closing scanner view");
                capture.release()
            }
            None => false,
        }
    }

    pub async fn request_access(&mut self) -> Result<(), ControllerError> {
        self.open_scanner().request_access().await?;
        Ok(())
    }

    /// Run one scan over the granted stream and record its verdict
    pub async fn start_scan(&mut self) -> Result<ScanOutcome, ControllerError> {
        let capture = self.open_scanner();
        if !capture.check_stream() {
            return Err(ControllerError::NotGranted);
        }
        let stream = capture.stream().ok_or(ControllerError::NotGranted)?;

        let outcome = self.scanner.start(&stream).await;

        if let ScanOutcome::Failed { reason: ScanFailure::StreamLost, .. } = outcome {
            if let Some(capture) = self.capture.as_mut() {
                capture.check_stream();
            }
        }

        self.record_completions()?;
        Ok(outcome)
    }

    /// Dismiss a finished scan
    pub fn reset_scan(&mut self) -> bool {
        self.scanner.reset()
    }

    /// The scanner's single button: ask for access, scan, or scan again
    pub async fn primary_action(&mut self) -> Result<PrimaryAction, ControllerError> {
        if self.scanner.status() == ScanStatus::Complete {
            self.reset_scan();
            return Ok(PrimaryAction::Reset);
        }

        if self.permission_state() != PermissionState::Granted {
            self.request_access().await?;
            return Ok(PrimaryAction::AccessRequested);
        }

        Ok(PrimaryAction::Scanned(self.start_scan().await?))
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn permission_state(&self) -> PermissionState {
        self.capture
            .as_ref()
            .map(|c| c.permission_state())
            .unwrap_or(PermissionState::Unrequested)
    }

    pub fn scan_status(&self) -> ScanStatus {
        self.scanner.status()
    }

    pub fn scan_result(&self) -> Option<Verdict> {
        self.scanner.result()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            scanner_open: self.capture.is_some(),
            permission: self.permission_state(),
            stream_id: self
                .capture
                .as_ref()
                .and_then(|c| c.stream())
                .map(|s| s.id().to_string()),
            scan_status: self.scanner.status(),
            result: self.scanner.result(),
            history_len: self.history.len(),
            history_exhausted: self.history.is_exhausted(),
        }
    }

    fn record_completions(&mut self) -> Result<usize, HistoryError> {
        let mut recorded = 0;
        loop {
            match self.completions.try_recv() {
                Ok(completed) => {
                    if let Err(e) = self.history.append(completed.verdict, completed.timestamp) {
                        error!("Dropping verdict of scan #{}: {}", completed.scan_id, e);
                        return Err(e);
                    }
                    recorded += 1;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("History fell behind, {} completions missed", missed);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        Ok(recorded)
    }
}
