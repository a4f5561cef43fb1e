// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Capture session - owns the live device stream for the scanner view

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CaptureDevice, MediaConstraints, MediaStream, PermissionError, StreamView};
use crate::core::{EventBus, SessionEvent};

/// Permission state exposed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Unrequested,
    Granted,
    Denied,
}

// The stream lives inside `Granted`, so "stream present iff granted" holds by construction.
enum Access {
    Unrequested,
    Granted(Arc<dyn MediaStream>),
    Denied(PermissionError),
}

/// Acquires, holds and releases the capture stream.
///
/// Dropping the session releases the stream, so tracks are stopped however
/// the owning view goes away.
pub struct CaptureSession {
    device: Arc<dyn CaptureDevice>,
    constraints: MediaConstraints,
    event_bus: Arc<EventBus>,
    access: Access,
}

impl CaptureSession {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        constraints: MediaConstraints,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            device,
            constraints,
            event_bus,
            access: Access::Unrequested,
        }
    }

    /// A held stream that has died reads as `Unrequested`, even before
    /// [`check_stream`](Self::check_stream) drops it.
    pub fn permission_state(&self) -> PermissionState {
        match &self.access {
            Access::Granted(stream) if stream.is_live() => PermissionState::Granted,
            Access::Granted(_) | Access::Unrequested => PermissionState::Unrequested,
            Access::Denied(_) => PermissionState::Denied,
        }
    }

    /// Why the last request was refused, while in `Denied`
    pub fn last_error(&self) -> Option<&PermissionError> {
        match &self.access {
            Access::Denied(e) => Some(e),
            _ => None,
        }
    }

    /// Read-only view of the held stream, if granted and still live
    pub fn stream(&self) -> Option<StreamView> {
        match &self.access {
            Access::Granted(stream) if stream.is_live() => Some(StreamView::new(stream.clone())),
            _ => None,
        }
    }

    pub fn constraints(&self) -> &MediaConstraints {
        &self.constraints
    }

    /// Ask the device for a stream.
    ///
    /// Failure leaves the session in `Denied` and can always be retried.
    /// Already granted with a live stream is a no-op; a dead stream is
    /// dropped and a new one acquired.
    pub async fn request_access(&mut self) -> Result<(), PermissionError> {
        self.check_stream();
        if let Access::Granted(_) = self.access {
            return Ok(());
        }

        info!("Requesting camera and microphone from {}", self.device.name());
        match self.device.acquire(&self.constraints).await {
            Ok(stream) => {
                let stream_id = stream.id().to_string();
                self.access = Access::Granted(stream);
                info!("Access granted, stream {}", stream_id);
                self.event_bus.publish(SessionEvent::PermissionGranted { stream_id });
                Ok(())
            }
            Err(e) => {
                warn!("Access denied: {}", e);
                self.access = Access::Denied(e.clone());
                self.event_bus.publish(SessionEvent::PermissionDenied { error: e.clone() });
                Err(e)
            }
        }
    }

    /// Stop every track and forget the stream. Safe to call any number of
    /// times; returns true only when a stream was actually released.
    pub fn release(&mut self) -> bool {
        match std::mem::replace(&mut self.access, Access::Unrequested) {
            Access::Granted(stream) => {
                stream.stop_all_tracks();
                let stream_id = stream.id().to_string();
                info!("Released capture stream {}", stream_id);
                self.event_bus.publish(SessionEvent::CaptureReleased { stream_id });
                true
            }
            _ => false,
        }
    }

    /// Drop a stream that died underneath us. Returns true while the held
    /// stream (if any) is still usable.
    pub fn check_stream(&mut self) -> bool {
        let lost = match &self.access {
            Access::Granted(stream) => !stream.is_live(),
            _ => return true,
        };
        if !lost {
            return true;
        }

        if let Access::Granted(stream) = std::mem::replace(&mut self.access, Access::Unrequested) {
            // Whatever tracks survived the loss still belong to us
            stream.stop_all_tracks();
            let stream_id = stream.id().to_string();
            warn!("Capture stream {} lost", stream_id);
            self.event_bus.publish(SessionEvent::CaptureLost { stream_id });
        }
        false
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device.name())
            .field("permission", &self.permission_state())
            .field("stream", &self.stream().map(|s| s.id().to_string()))
            .finish()
    }
}
