// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Placeholder detector: weighted coin flip after a simulated analysis delay

use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::distributions::Bernoulli;
use rand::prelude::*;
use rand_distr::Normal;
use tracing::debug;

use super::{Detector, DetectorError, Verdict};
use crate::capture::StreamView;
use crate::config::ScanConfig;

/// Stand-in for a real model. Says "authentic" with a fixed probability.
pub struct RandomDetector {
    authentic: Bernoulli,
    latency: Duration,
    jitter: Option<Normal<f64>>,  // ms
    rng: Mutex<StdRng>,
}

impl RandomDetector {
    pub fn new(authentic_probability: f64, latency: Duration) -> Result<Self, DetectorError> {
        let authentic = Bernoulli::new(authentic_probability).map_err(|_| {
            DetectorError::Misconfigured(format!(
                "authentic probability {} outside [0, 1]",
                authentic_probability
            ))
        })?;

        Ok(Self {
            authentic,
            latency,
            jitter: None,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn from_config(config: &ScanConfig) -> Result<Self, DetectorError> {
        let detector = Self::new(
            config.authentic_probability,
            Duration::from_millis(config.simulated_latency_ms),
        )?;
        Ok(detector.with_jitter(Duration::from_millis(config.latency_jitter_ms)))
    }

    /// Spread the simulated latency with a normal distribution
    pub fn with_jitter(mut self, std_dev: Duration) -> Self {
        self.jitter = if std_dev.is_zero() {
            None
        } else {
            Normal::new(0.0, std_dev.as_secs_f64() * 1000.0).ok()
        };
        self
    }

    /// Deterministic sequence, for tests
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    fn roll(&self) -> (Verdict, Duration) {
        let mut rng = self.rng.lock();

        let verdict = if rng.sample(self.authentic) {
            Verdict::Authentic
        } else {
            Verdict::Fake
        };

        let offset_ms = self.jitter.map(|n| rng.sample(n)).unwrap_or(0.0);
        let latency_ms = (self.latency.as_secs_f64() * 1000.0 + offset_ms).max(0.0);

        (verdict, Duration::from_secs_f64(latency_ms / 1000.0))
    }
}

#[async_trait]
impl Detector for RandomDetector {
    fn name(&self) -> &str { "random" }

    async fn detect(&self, stream: &StreamView) -> Result<Verdict, DetectorError> {
        let (verdict, latency) = self.roll();
        debug!("Analyzing {} for {:?}", stream.id(), latency);

        tokio::time::sleep(latency).await;

        if !stream.is_live() {
            return Err(DetectorError::Stream(format!("{} ended during analysis", stream.id())));
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::capture::{CaptureDevice, MediaConstraints, SimulatedDevice};

    async fn view() -> StreamView {
        let device = SimulatedDevice::new("test");
        let stream = device.acquire(&MediaConstraints::default()).await.unwrap();
        StreamView::new(stream)
    }

    #[test]
    fn test_rejects_bad_probability() {
        assert!(RandomDetector::new(1.5, Duration::ZERO).is_err());
        assert!(RandomDetector::new(-0.1, Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn test_certain_probabilities() {
        let stream = view().await;

        let always = RandomDetector::new(1.0, Duration::ZERO).unwrap();
        let never = RandomDetector::new(0.0, Duration::ZERO).unwrap();
        for _ in 0..20 {
            assert_eq!(always.detect(&stream).await.unwrap(), Verdict::Authentic);
            assert_eq!(never.detect(&stream).await.unwrap(), Verdict::Fake);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_simulated_latency() {
        let stream = view().await;
        let detector = RandomDetector::new(0.7, Duration::from_millis(2500)).unwrap().seeded(3);

        let started = tokio::time::Instant::now();
        detector.detect(&stream).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mostly_authentic() {
        let stream = view().await;
        let detector = Arc::new(RandomDetector::new(0.7, Duration::ZERO).unwrap().seeded(42));

        let mut authentic = 0;
        for _ in 0..1000 {
            if detector.detect(&stream).await.unwrap().is_authentic() {
                authentic += 1;
            }
        }
        assert!((600..800).contains(&authentic), "authentic = {}", authentic);
    }
}
