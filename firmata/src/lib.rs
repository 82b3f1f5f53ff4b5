//! Firmata Protocol Types
//!
//! This crate provides the subset of the Firmata protocol the servo bridge
//! speaks to its microcontroller: command bytes, pin modes and the codec.

pub mod codec;

pub use codec::{CodecError, FirmataMessage, MessageDecoder};

/// Command and sysex bytes
pub mod command {
    /// Analog I/O message (low nibble is the pin)
    pub const ANALOG_MESSAGE: u8 = 0xE0;
    /// Digital I/O message (low nibble is the port)
    pub const DIGITAL_MESSAGE: u8 = 0x90;
    /// Enable/disable analog reporting (low nibble is the pin)
    pub const REPORT_ANALOG: u8 = 0xC0;
    /// Enable/disable digital reporting (low nibble is the port)
    pub const REPORT_DIGITAL: u8 = 0xD0;
    /// Set a pin's mode
    pub const SET_PIN_MODE: u8 = 0xF4;
    /// Protocol version query and reply
    pub const REPORT_VERSION: u8 = 0xF9;
    /// Start of a sysex message
    pub const START_SYSEX: u8 = 0xF0;
    /// End of a sysex message
    pub const END_SYSEX: u8 = 0xF7;

    /// Analog write for pins above 15
    pub const EXTENDED_ANALOG: u8 = 0x6F;
    /// Servo pulse range configuration
    pub const SERVO_CONFIG: u8 = 0x70;
    /// Text sent by the firmware
    pub const STRING_DATA: u8 = 0x71;
    /// Firmware name and version query and reply
    pub const REPORT_FIRMWARE: u8 = 0x79;
}

/// Highest pin number addressable with a single data byte
pub const MAX_PIN: u8 = 0x7F;

/// Largest value carried by two 7-bit data bytes
pub const MAX_VALUE_14BIT: u16 = 0x3FFF;

/// Pin modes understood by StandardFirmata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PinMode {
    Input = 0x00,
    Output = 0x01,
    Analog = 0x02,
    Pwm = 0x03,
    Servo = 0x04,
}

impl From<PinMode> for u8 {
    fn from(mode: PinMode) -> Self {
        mode as u8
    }
}

/// Protocol version reported by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
