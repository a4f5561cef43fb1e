//! Detection module - pluggable authenticity detectors

mod random;
mod scripted;

pub use random::RandomDetector;
pub use scripted::ScriptedDetector;

use std::fmt;
use std::str::FromStr;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::StreamView;

/// Outcome of content-authenticity analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Authentic,
    Fake,
}

impl Verdict {
    pub fn is_authentic(&self) -> bool {
        matches!(self, Verdict::Authentic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Authentic => "authentic",
            Verdict::Fake => "fake",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authentic" | "real" | "a" => Ok(Verdict::Authentic),
            "fake" | "deepfake" | "f" => Ok(Verdict::Fake),
            other => Err(DetectorError::Misconfigured(format!("unknown verdict '{}'", other))),
        }
    }
}

/// Errors a detector can report instead of a verdict
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    #[error("capture stream unusable: {0}")]
    Stream(String),

    #[error("detector internal error: {0}")]
    Internal(String),

    #[error("detector misconfigured: {0}")]
    Misconfigured(String),
}

/// Produces a verdict from a live capture stream.
///
/// Called at most once per scan. Implementations may take arbitrarily long;
/// the scan engine handles timeouts and stream loss around the call.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detector name for logs
    fn name(&self) -> &str;

    /// Analyse the stream and decide
    async fn detect(&self, stream: &StreamView) -> Result<Verdict, DetectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_parse() {
        assert_eq!("Authentic".parse::<Verdict>().unwrap(), Verdict::Authentic);
        assert_eq!(" fake ".parse::<Verdict>().unwrap(), Verdict::Fake);
        assert!("maybe".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_verdict_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Verdict::Fake).unwrap(), "\"fake\"");
    }
}
