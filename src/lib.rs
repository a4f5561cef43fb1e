// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! DeepGuard - live capture authenticity scanning
//!
//! The core of an interactive verification client:
//! - capture session that acquires, holds and releases the device stream
//! - single-flight scan state machine around a pluggable detector
//! - append-only verdict history for the current session
//! - event bus that feeds history and user notifications
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Session Controller                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────────┐   StreamView   ┌──────────────┐          │
//! │  │ CaptureSession │ ─────────────→ │  ScanEngine  │          │
//! │  │  (device API)  │                │  (Detector)  │          │
//! │  └────────────────┘                └──────────────┘          │
//! │          ↓                                ↓                  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                       Event Bus                        │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │          ↓ completions                    ↓ events           │
//! │  ┌────────────────┐                ┌──────────────┐          │
//! │  │   HistoryLog   │                │ Notifications│          │
//! │  └────────────────┘                └──────────────┘          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod core;
pub mod capture;
pub mod detection;
pub mod scan;
pub mod history;
pub mod config;

#[cfg(feature = "console")]
pub mod ui;

// Re-exports for convenience
pub use config::Config;
pub use core::{EventBus, SessionController, SessionEvent};
pub use capture::{CaptureSession, PermissionState, StreamView};
pub use detection::{Detector, Verdict};
pub use scan::{ScanEngine, ScanOutcome, ScanStatus};
pub use history::{HistoryLog, VerdictRecord};

/// DeepGuard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// DeepGuard name
pub const NAME: &str = "DeepGuard";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    let mut features = vec![];

    #[cfg(feature = "console")]
    features.push("console".to_string());

    features
}
