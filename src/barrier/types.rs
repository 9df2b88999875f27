//! Barrier type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Barrier position (assumed; there is no feedback from the hardware)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BarrierState {
    Open,
    Closed,
}

impl fmt::Display for BarrierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarrierState::Open => f.write_str("OPEN"),
            BarrierState::Closed => f.write_str("CLOSED"),
        }
    }
}

/// Command sent to the actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierCommand {
    Open,
    Close,
}

/// Barrier status snapshot
#[derive(Debug, Clone, Serialize)]
pub struct BarrierStatus {
    pub state: BarrierState,
    /// An automatic close is scheduled
    pub close_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    pub close_delay_sec: u64,
}
