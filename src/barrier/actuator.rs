//! Barrier actuators

use super::types::BarrierCommand;
use crate::error::Result;

/// Physical barrier driver
pub trait BarrierActuator: Send + Sync {
    fn actuate(&self, command: BarrierCommand) -> Result<()>;
}

/// Actuator that only records the command in the log.
///
/// Stands in for the serial-port driver on the configured port.
pub struct LoggingActuator {
    port: String,
}

impl LoggingActuator {
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl BarrierActuator for LoggingActuator {
    fn actuate(&self, command: BarrierCommand) -> Result<()> {
        match command {
            BarrierCommand::Open => tracing::info!(port = %self.port, "Opening barrier"),
            BarrierCommand::Close => tracing::info!(port = %self.port, "Closing barrier"),
        }
        Ok(())
    }
}
