//! Car Wash Gate Library
//!
//! Vision-model screening of vehicles at the entrance of an automatic
//! car wash, with an audit trail and barrier control.
//!
//! ## Architecture (6 Components)
//!
//! 1. ImageSource - Still capture from device, sample rotation fallback
//! 2. VehicleAnalyzer - Vision model adapter + decision classifier
//! 3. EntryLog - Append-only JSON Lines audit trail
//! 4. EntryDecisionSystem - Analysis, logging, operator overrides
//! 5. BarrierControl - OPEN/CLOSED flag with cancellable auto-close
//! 6. WebAPI - HTTP endpoints
//!
//! ## Flow
//!
//! capture -> analyze -> log -> open barrier (ALLOW only)

pub mod barrier;
pub mod entry_decision;
pub mod entry_log;
pub mod error;
pub mod image_source;
pub mod models;
pub mod state;
pub mod vehicle_analyzer;
pub mod web_api;

pub use error::{Error, Result};
pub use state::{AppConfig, AppState};
