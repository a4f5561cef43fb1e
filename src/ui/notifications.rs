// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! User-facing notifications rendered from session events

use std::io::Write;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::{Event, EventBus, SessionEvent};
use crate::detection::Verdict;
use crate::scan::ScanFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Default,
    Destructive,
}

/// A toast: short title, one-line description, tone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub tone: Tone,
}

impl Notification {
    fn new(title: &str, description: &str, tone: Tone) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            tone,
        }
    }

    /// Toast for an event, or `None` for events the user never sees
    pub fn for_event(event: &SessionEvent) -> Option<Self> {
        let notification = match event {
            SessionEvent::PermissionGranted { .. } => Self::new(
                "Access granted",
                "Camera and microphone are ready",
                Tone::Default,
            ),
            SessionEvent::PermissionDenied { .. } => Self::new(
                "Permission denied",
                "Please allow camera and microphone access",
                Tone::Destructive,
            ),
            SessionEvent::CaptureLost { .. } => Self::new(
                "Camera disconnected",
                "The capture device stopped responding, enable it again to keep scanning",
                Tone::Destructive,
            ),
            SessionEvent::ScanStarted { .. } => {
                Self::new("Scanning", "Analyzing content...", Tone::Default)
            }
            SessionEvent::ScanCompleted(completed) => match completed.verdict {
                Verdict::Authentic => Self::new(
                    "Verified Authentic",
                    "This content appears to be genuine",
                    Tone::Default,
                ),
                Verdict::Fake => Self::new(
                    "Deepfake Detected",
                    "Warning: This content may be manipulated",
                    Tone::Destructive,
                ),
            },
            SessionEvent::ScanFailed { reason, .. } => {
                let description = match reason {
                    ScanFailure::StreamLost => "The capture stream was lost, please try again",
                    ScanFailure::Timeout { .. } => "Analysis took too long, please try again",
                    ScanFailure::Detector(_) => "Analysis failed, please try again",
                    ScanFailure::Cancelled => "Scan cancelled",
                };
                Self::new("Scan failed", description, Tone::Destructive)
            }
            SessionEvent::CaptureReleased { .. } => return None,
        };
        Some(notification)
    }
}

/// Anything that shows notifications to the user
pub trait NotificationSink: Send {
    fn notify(&mut self, event: &Event);
}

/// How [`ConsoleSink`] writes events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writes toasts as text lines, or every event as a JSON line
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    format: OutputFormat,
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> NotificationSink for ConsoleSink<W> {
    fn notify(&mut self, event: &Event) {
        let written = match self.format {
            OutputFormat::Json => match serde_json::to_string(event) {
                Ok(line) => writeln!(self.out, "{}", line),
                Err(e) => {
                    warn!("Could not encode event #{}: {}", event.id, e);
                    return;
                }
            },
            OutputFormat::Text => match Notification::for_event(&event.payload) {
                Some(n) => {
                    let marker = match n.tone {
                        Tone::Default => "*",
                        Tone::Destructive => "!",
                    };
                    writeln!(self.out, "[{}] {}: {}", marker, n.title, n.description)
                }
                None => return,
            },
        };

        if let Err(e) = written.and_then(|_| self.out.flush()) {
            warn!("Notification output failed: {}", e);
        }
    }
}

/// Forward every bus event to `sink` until `shutdown` fires or the bus goes away
pub fn spawn_notifier<S>(
    bus: &EventBus,
    mut sink: S,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<S>
where
    S: NotificationSink + 'static,
{
    let mut events = bus.subscribe_events();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => sink.notify(&event),
                    Err(RecvError::Lagged(missed)) => warn!("Notifier missed {} events", missed),
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.recv() => {
                    // Flush what was already published
                    loop {
                        match events.try_recv() {
                            Ok(event) => sink.notify(&event),
                            Err(TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
        debug!("Notifier stopped");
        sink
    })
}
