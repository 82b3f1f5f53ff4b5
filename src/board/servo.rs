//! Servo driver on a Firmata pin

use anyhow::{Context, Result};
use async_trait::async_trait;
use servo_bridge_firmata::PinMode;
use tracing::info;

use super::connection::FirmataBoard;
use crate::actuator::Actuator;

/// Servo pulse widths in microseconds for the 0 and 180 degree positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseRange {
    pub min_us: u16,
    pub max_us: u16,
}

/// Drives one servo attached to a board pin
pub struct ServoDriver {
    name: String,
    board: FirmataBoard,
    pin: u8,
    pulse_range: Option<PulseRange>,
    /// Set once the pin has been switched to servo mode
    attached: bool,
}

impl ServoDriver {
    /// Create a driver; nothing is sent until the first move
    pub fn new(name: impl Into<String>, board: FirmataBoard, pin: u8) -> Self {
        Self {
            name: name.into(),
            board,
            pin,
            pulse_range: None,
            attached: false,
        }
    }

    /// Configure the pulse range sent when the servo is attached
    pub fn with_pulse_range(mut self, pulse_range: Option<PulseRange>) -> Self {
        self.pulse_range = pulse_range;
        self
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    async fn attach(&mut self) -> Result<()> {
        if let Some(range) = self.pulse_range {
            self.board
                .servo_config(self.pin, range.min_us, range.max_us)
                .await?;
        }
        self.board.set_pin_mode(self.pin, PinMode::Servo).await?;
        self.attached = true;

        info!("[SERVO] {} attached on pin {}", self.name, self.pin);
        Ok(())
    }
}

#[async_trait]
impl Actuator for ServoDriver {
    async fn move_to(&mut self, position: u8) -> Result<()> {
        if !self.attached {
            self.attach()
                .await
                .with_context(|| format!("failed to attach {} on pin {}", self.name, self.pin))?;
        }

        self.board
            .analog_write(self.pin, position.into())
            .await
            .with_context(|| format!("failed to move {} to {}", self.name, position))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
