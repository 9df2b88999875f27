//! BarrierControl - Entry Barrier State and Auto-close
//!
//! ## Responsibilities
//!
//! - Two-state flag (OPEN / CLOSED), CLOSED initially
//! - Actuate the physical barrier on every transition
//! - One cancellable delayed close after each open
//!
//! All transitions go through one mutex. Re-opening replaces the pending
//! close instead of racing it, and a superseded timer never changes state.

mod actuator;
mod types;

pub use actuator::{BarrierActuator, LoggingActuator};
pub use types::*;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Default delay before the barrier closes itself
pub const DEFAULT_CLOSE_DELAY: Duration = Duration::from_secs(10);

struct BarrierInner {
    state: BarrierState,
    /// Bumped on every transition; a timer only closes its own generation
    generation: u64,
    pending_close: Option<JoinHandle<()>>,
    opened_at: Option<DateTime<Utc>>,
}

impl BarrierInner {
    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending_close.take() {
            handle.abort();
        }
    }
}

/// BarrierControl instance
pub struct BarrierControl {
    inner: Arc<Mutex<BarrierInner>>,
    actuator: Arc<dyn BarrierActuator>,
    close_delay: Duration,
}

impl BarrierControl {
    /// Create a closed barrier
    pub fn new(actuator: Arc<dyn BarrierActuator>, close_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BarrierInner {
                state: BarrierState::Closed,
                generation: 0,
                pending_close: None,
                opened_at: None,
            })),
            actuator,
            close_delay,
        }
    }

    /// Open the barrier and (re)schedule the automatic close
    pub async fn open(&self) {
        let mut inner = self.inner.lock().await;
        inner.cancel_pending();
        inner.generation += 1;
        inner.state = BarrierState::Open;
        inner.opened_at = Some(Utc::now());
        actuate(self.actuator.as_ref(), BarrierCommand::Open);

        let generation = inner.generation;
        inner.pending_close = Some(tokio::spawn(close_after(
            self.inner.clone(),
            self.actuator.clone(),
            self.close_delay,
            generation,
        )));

        tracing::debug!(
            generation = generation,
            close_delay_sec = self.close_delay.as_secs(),
            "Barrier auto-close scheduled"
        );
    }

    /// Close the barrier now, cancelling any scheduled close
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.cancel_pending();
        inner.generation += 1;
        inner.state = BarrierState::Closed;
        inner.opened_at = None;
        actuate(self.actuator.as_ref(), BarrierCommand::Close);
    }

    /// Current state
    pub async fn state(&self) -> BarrierState {
        self.inner.lock().await.state
    }

    /// Status snapshot
    pub async fn status(&self) -> BarrierStatus {
        let inner = self.inner.lock().await;
        BarrierStatus {
            state: inner.state,
            close_pending: inner
                .pending_close
                .as_ref()
                .map(|h| !h.is_finished())
                .unwrap_or(false),
            opened_at: inner.opened_at,
            close_delay_sec: self.close_delay.as_secs(),
        }
    }

    /// Cancel the pending close (process shutdown)
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if inner.pending_close.is_some() {
            tracing::info!(state = %inner.state, "Cancelling pending barrier close");
        }
        inner.cancel_pending();
    }

    pub fn close_delay(&self) -> Duration {
        self.close_delay
    }
}

impl Drop for BarrierControl {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_lock() {
            inner.cancel_pending();
        }
    }
}

async fn close_after(
    inner: Arc<Mutex<BarrierInner>>,
    actuator: Arc<dyn BarrierActuator>,
    delay: Duration,
    generation: u64,
) {
    tokio::time::sleep(delay).await;

    let mut inner = inner.lock().await;
    if inner.generation != generation {
        return;
    }
    // This task is the pending close; drop the handle without aborting ourselves
    inner.pending_close = None;
    inner.generation += 1;
    inner.state = BarrierState::Closed;
    inner.opened_at = None;
    actuate(actuator.as_ref(), BarrierCommand::Close);
}

/// State is optimistic: a failed actuation is logged, not rolled back
fn actuate(actuator: &dyn BarrierActuator, command: BarrierCommand) {
    if let Err(e) = actuator.actuate(command) {
        tracing::warn!(command = ?command, error = %e, "Barrier actuation failed");
    }
}
