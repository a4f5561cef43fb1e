// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Capture device traits and common types

use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which camera to open when a device has more than one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,           // Front camera
    Environment,    // Rear camera
}

/// Constraints passed to the device when acquiring a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
    pub facing_mode: FacingMode,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            facing_mode: FacingMode::User,
        }
    }
}

/// Kind of a single media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Snapshot of one track of a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
    pub live: bool,
}

/// Reasons a device refuses to hand out a stream
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PermissionError {
    #[error("camera and microphone access denied by the user")]
    Denied,

    #[error("no capture device available")]
    NoDevice,

    #[error("capture blocked by the operating system: {0}")]
    Blocked(String),

    #[error("capture device error: {0}")]
    Device(String),
}

/// A live audio/video stream handed out by a [`CaptureDevice`]
#[async_trait]
pub trait MediaStream: Send + Sync {
    /// Stream identifier
    fn id(&self) -> &str;

    /// Current state of every track
    fn tracks(&self) -> Vec<TrackInfo>;

    /// True while at least one track is still producing media
    fn is_live(&self) -> bool;

    /// Resolves once the stream stops being live, for any reason
    async fn ended(&self);

    /// Stop every track. Only the owning capture session calls this.
    fn stop_all_tracks(&self);
}

/// Device capture API
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Human readable device name
    fn name(&self) -> &str;

    /// Prompt for permission and negotiate a stream
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, PermissionError>;
}

/// Read-only view of the capture stream.
///
/// Scans and detectors receive this instead of the stream itself, so nothing
/// outside the capture session can stop tracks.
#[derive(Clone)]
pub struct StreamView {
    inner: Arc<dyn MediaStream>,
}

impl StreamView {
    pub(crate) fn new(inner: Arc<dyn MediaStream>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.inner.tracks()
    }

    pub fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    /// Resolves when the underlying stream is lost or stopped
    pub async fn ended(&self) {
        self.inner.ended().await
    }

    pub fn has_track(&self, kind: TrackKind) -> bool {
        self.inner.tracks().iter().any(|t| t.kind == kind && t.live)
    }
}

impl fmt::Debug for StreamView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamView")
            .field("id", &self.inner.id())
            .field("live", &self.inner.is_live())
            .finish()
    }
}
