//! Capture module - device access and the live stream lifecycle

mod traits;
mod session;
mod simulator;

pub use traits::{
    CaptureDevice, FacingMode, MediaConstraints, MediaStream, PermissionError, StreamView,
    TrackInfo, TrackKind,
};
pub use session::{CaptureSession, PermissionState};
pub use simulator::{AccessPolicy, SimulatedDevice, SimulatedStream};
