// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Simulated capture device for demo/testing

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::{
    CaptureDevice, FacingMode, MediaConstraints, MediaStream, PermissionError, TrackInfo,
    TrackKind,
};

/// How the simulated permission prompt answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    Grant,
    Deny,
    NoDevice,
    Blocked(String),
}

/// A stream produced by [`SimulatedDevice`]
pub struct SimulatedStream {
    id: String,
    tracks: Mutex<Vec<TrackInfo>>,
    live: watch::Sender<bool>,
}

impl SimulatedStream {
    fn new(id: String, constraints: &MediaConstraints) -> Self {
        let mut tracks = Vec::new();
        if constraints.video {
            let label = match constraints.facing_mode {
                FacingMode::User => "Simulated Camera (front)",
                FacingMode::Environment => "Simulated Camera (rear)",
            };
            tracks.push(TrackInfo {
                id: format!("{}-video", id),
                kind: TrackKind::Video,
                label: label.to_string(),
                live: true,
            });
        }
        if constraints.audio {
            tracks.push(TrackInfo {
                id: format!("{}-audio", id),
                kind: TrackKind::Audio,
                label: "Simulated Microphone".to_string(),
                live: true,
            });
        }

        let (live, _) = watch::channel(true);
        Self {
            id,
            tracks: Mutex::new(tracks),
            live,
        }
    }

    /// Simulate the device going away (unplugged, permission revoked)
    pub fn end(&self) {
        self.shut_down();
    }

    /// Number of tracks still producing media
    pub fn live_tracks(&self) -> usize {
        self.tracks.lock().iter().filter(|t| t.live).count()
    }

    fn shut_down(&self) {
        for track in self.tracks.lock().iter_mut() {
            track.live = false;
        }
        self.live.send_replace(false);
    }
}

#[async_trait]
impl MediaStream for SimulatedStream {
    fn id(&self) -> &str { &self.id }

    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.lock().clone()
    }

    fn is_live(&self) -> bool {
        *self.live.borrow()
    }

    async fn ended(&self) {
        let mut rx = self.live.subscribe();
        // The sender lives as long as `self`, so this only returns once the stream ends.
        let _ = rx.wait_for(|live| !*live).await;
    }

    fn stop_all_tracks(&self) {
        debug!("Stopping all tracks of {}", self.id);
        self.shut_down();
    }
}

/// Capture device that answers the permission prompt according to a policy
pub struct SimulatedDevice {
    name: String,
    policy: Mutex<AccessPolicy>,
    acquire_delay: Duration,
    issued: Mutex<Vec<Arc<SimulatedStream>>>,
    sequence: AtomicU64,
}

impl SimulatedDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            policy: Mutex::new(AccessPolicy::Grant),
            acquire_delay: Duration::ZERO,
            issued: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_policy(self, policy: AccessPolicy) -> Self {
        *self.policy.lock() = policy;
        self
    }

    /// Time the simulated permission prompt takes to answer
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    pub fn set_policy(&self, policy: AccessPolicy) {
        *self.policy.lock() = policy;
    }

    /// Every stream handed out so far, oldest first
    pub fn streams(&self) -> Vec<Arc<SimulatedStream>> {
        self.issued.lock().clone()
    }

    pub fn acquire_count(&self) -> usize {
        self.issued.lock().len()
    }

    /// Tracks still live across every stream this device issued
    pub fn live_track_count(&self) -> usize {
        self.issued.lock().iter().map(|s| s.live_tracks()).sum()
    }

    /// End every live stream, as if the hardware was unplugged.
    /// Returns how many streams were ended.
    pub fn revoke(&self) -> usize {
        let issued = self.issued.lock();
        let mut ended = 0;
        for stream in issued.iter().filter(|s| s.is_live()) {
            stream.end();
            ended += 1;
        }
        ended
    }
}

#[async_trait]
impl CaptureDevice for SimulatedDevice {
    fn name(&self) -> &str { &self.name }

    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, PermissionError> {
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }

        let policy = self.policy.lock().clone();
        match policy {
            AccessPolicy::Grant => {}
            AccessPolicy::Deny => return Err(PermissionError::Denied),
            AccessPolicy::NoDevice => return Err(PermissionError::NoDevice),
            AccessPolicy::Blocked(reason) => return Err(PermissionError::Blocked(reason)),
        }

        if !constraints.video && !constraints.audio {
            return Err(PermissionError::Device(
                "at least one of video or audio must be requested".to_string(),
            ));
        }

        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        let stream = Arc::new(SimulatedStream::new(format!("sim-stream-{}", n), constraints));
        self.issued.lock().push(stream.clone());

        debug!("{} issued stream {}", self.name, stream.id());
        Ok(stream)
    }
}
