//! Firmata Board Module
//!
//! Provides the serial link to a microcontroller running StandardFirmata
//! and the servo driver built on top of it.

mod connection;
mod servo;

pub use connection::{BoardConfig, FirmataBoard, DEFAULT_BAUD};
pub use servo::{PulseRange, ServoDriver};
