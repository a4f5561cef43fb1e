// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Deterministic detector that replays a fixed verdict script

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;

use super::{Detector, DetectorError, Verdict};
use crate::capture::StreamView;

/// Replays verdicts in order, wrapping around at the end
pub struct ScriptedDetector {
    verdicts: Vec<Verdict>,
    calls: AtomicUsize,
    latency: Duration,
}

impl ScriptedDetector {
    pub fn new(verdicts: Vec<Verdict>) -> Result<Self, DetectorError> {
        if verdicts.is_empty() {
            return Err(DetectorError::Misconfigured("empty verdict script".to_string()));
        }
        Ok(Self {
            verdicts,
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        })
    }

    pub fn always(verdict: Verdict) -> Self {
        Self {
            verdicts: vec![verdict],
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// How many times `detect` has been invoked
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    fn name(&self) -> &str { "scripted" }

    async fn detect(&self, _stream: &StreamView) -> Result<Verdict, DetectorError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.verdicts[n % self.verdicts.len()])
    }
}
