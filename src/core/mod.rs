//! Core module - session controller and event bus

mod controller;
mod event_bus;

pub use controller::{ControllerError, PrimaryAction, SessionController};
pub use event_bus::{Event, EventBus, SessionEvent};

use serde::{Deserialize, Serialize};

use crate::capture::PermissionState;
use crate::detection::Verdict;
use crate::scan::ScanStatus;

/// Point-in-time view of the whole session, for status displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub scanner_open: bool,
    pub permission: PermissionState,
    pub stream_id: Option<String>,
    pub scan_status: ScanStatus,
    pub result: Option<Verdict>,
    pub history_len: usize,
    pub history_exhausted: bool,
}
