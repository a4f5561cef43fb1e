// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Event bus for inter-component communication

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use tracing::trace;

use crate::capture::PermissionError;
use crate::scan::{ScanCompleted, ScanFailure};

/// Everything the core reports to the outside world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PermissionGranted { stream_id: String },
    PermissionDenied { error: PermissionError },
    CaptureReleased { stream_id: String },
    CaptureLost { stream_id: String },
    ScanStarted { scan_id: u64 },
    ScanCompleted(ScanCompleted),
    ScanFailed { scan_id: u64, reason: ScanFailure },
}

impl SessionEvent {
    /// Short stable name, used by log lines and sinks
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::PermissionGranted { .. } => "permission_granted",
            SessionEvent::PermissionDenied { .. } => "permission_denied",
            SessionEvent::CaptureReleased { .. } => "capture_released",
            SessionEvent::CaptureLost { .. } => "capture_lost",
            SessionEvent::ScanStarted { .. } => "scan_started",
            SessionEvent::ScanCompleted(_) => "scan_completed",
            SessionEvent::ScanFailed { .. } => "scan_failed",
        }
    }
}

/// Generic event wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: SessionEvent,
}

/// Central event bus for pub/sub communication.
///
/// Scan completions travel on their own channel so the history owner never
/// has to filter the general event stream.
pub struct EventBus {
    completion_tx: broadcast::Sender<ScanCompleted>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (completion_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            completion_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_completion(&self, completed: ScanCompleted) -> u64 {
        let _ = self.completion_tx.send(completed.clone());
        self.publish(SessionEvent::ScanCompleted(completed))
    }

    /// Publish an event to every subscriber. Returns the event id.
    pub fn publish(&self, payload: SessionEvent) -> u64 {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        trace!("event #{} {}", id, payload.name());
        let event = Event {
            id,
            timestamp: Utc::now(),
            payload,
        };
        // No subscribers is fine; events are fire-and-forget.
        let _ = self.event_tx.send(event);
        id
    }

    pub fn subscribe_completions(&self) -> broadcast::Receiver<ScanCompleted> {
        self.completion_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Number of events published so far
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}
