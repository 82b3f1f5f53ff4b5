//! Firmata wire codec
//!
//! Firmata frames are MIDI-like: a status byte with the high bit set,
//! followed by 7-bit data bytes. Variable length messages are wrapped as:
//! ```text
//! [ 0xF0 ][ command ][ 7-bit data ... ][ 0xF7 ]
//! ```
//!
//! Values wider than 7 bits are split LSB first across two data bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::command::*;
use crate::{PinMode, ProtocolVersion, MAX_PIN, MAX_VALUE_14BIT};

/// Maximum buffered sysex size before the decoder gives up on finding the end byte
pub const MAX_SYSEX_SIZE: usize = 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Pin {0} out of range (max: {MAX_PIN})")]
    InvalidPin(u8),

    #[error("Value {0} does not fit in 14 bits (max: {MAX_VALUE_14BIT})")]
    ValueOutOfRange(u16),

    #[error("Sysex message too long: {0} bytes without end marker (max: {MAX_SYSEX_SIZE})")]
    SysexTooLong(usize),
}

/// A decoded message from the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmataMessage {
    /// Reply to a version query (also sent by StandardFirmata on boot)
    ProtocolVersion(ProtocolVersion),
    /// Reply to a firmware query
    Firmware { version: ProtocolVersion, name: String },
    /// Text from the firmware, usually an error report
    StringData(String),
    /// Analog pin reading
    AnalogValue { pin: u8, value: u16 },
    /// Digital port state, one bit per pin
    DigitalPort { port: u8, mask: u16 },
    /// Sysex the bridge has no use for
    Sysex { command: u8, data: Bytes },
    /// Status byte without a known layout
    Unknown(u8),
}

fn check_pin(pin: u8) -> Result<(), CodecError> {
    if pin > MAX_PIN {
        return Err(CodecError::InvalidPin(pin));
    }
    Ok(())
}

fn check_value(value: u16) -> Result<(), CodecError> {
    if value > MAX_VALUE_14BIT {
        return Err(CodecError::ValueOutOfRange(value));
    }
    Ok(())
}

fn put_14bit(buf: &mut BytesMut, value: u16) {
    buf.put_u8((value & 0x7F) as u8);
    buf.put_u8(((value >> 7) & 0x7F) as u8);
}

fn join_14bit(lsb: u8, msb: u8) -> u16 {
    (lsb as u16 & 0x7F) | ((msb as u16 & 0x7F) << 7)
}

/// Decode a string sent as LSB/MSB 7-bit pairs
fn decode_7bit_string(data: &[u8]) -> String {
    let bytes: Vec<u8> = data
        .chunks_exact(2)
        .map(|pair| join_14bit(pair[0], pair[1]) as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Encode a protocol version query
pub fn report_version_query() -> Bytes {
    Bytes::from_static(&[REPORT_VERSION])
}

/// Encode a firmware name/version query
pub fn firmware_query() -> Bytes {
    Bytes::from_static(&[START_SYSEX, REPORT_FIRMWARE, END_SYSEX])
}

/// Encode a pin mode change
pub fn set_pin_mode(pin: u8, mode: PinMode) -> Result<Bytes, CodecError> {
    check_pin(pin)?;
    Ok(Bytes::copy_from_slice(&[SET_PIN_MODE, pin, mode.into()]))
}

/// Encode an analog (PWM/servo) write
///
/// Pins 0-15 use the compact analog message, higher pins need the
/// extended analog sysex.
pub fn analog_write(pin: u8, value: u16) -> Result<Bytes, CodecError> {
    check_pin(pin)?;
    check_value(value)?;

    let mut buf = BytesMut::with_capacity(6);
    if pin <= 0x0F {
        buf.put_u8(ANALOG_MESSAGE | pin);
        put_14bit(&mut buf, value);
    } else {
        buf.put_u8(START_SYSEX);
        buf.put_u8(EXTENDED_ANALOG);
        buf.put_u8(pin);
        put_14bit(&mut buf, value);
        buf.put_u8(END_SYSEX);
    }

    Ok(buf.freeze())
}

/// Encode a servo pulse range configuration (microseconds)
pub fn servo_config(pin: u8, min_pulse: u16, max_pulse: u16) -> Result<Bytes, CodecError> {
    check_pin(pin)?;
    check_value(min_pulse)?;
    check_value(max_pulse)?;

    let mut buf = BytesMut::with_capacity(8);
    buf.put_u8(START_SYSEX);
    buf.put_u8(SERVO_CONFIG);
    buf.put_u8(pin);
    put_14bit(&mut buf, min_pulse);
    put_14bit(&mut buf, max_pulse);
    buf.put_u8(END_SYSEX);

    Ok(buf.freeze())
}

fn decode_sysex(frame: &[u8]) -> FirmataMessage {
    // frame is [START_SYSEX, command, data.., END_SYSEX]
    if frame.len() < 3 {
        return FirmataMessage::Unknown(START_SYSEX);
    }
    let command = frame[1];
    let data = &frame[2..frame.len() - 1];

    match command {
        REPORT_FIRMWARE if data.len() >= 2 => FirmataMessage::Firmware {
            version: ProtocolVersion {
                major: data[0],
                minor: data[1],
            },
            name: decode_7bit_string(&data[2..]),
        },
        STRING_DATA => FirmataMessage::StringData(decode_7bit_string(data)),
        _ => FirmataMessage::Sysex {
            command,
            data: Bytes::copy_from_slice(data),
        },
    }
}

/// Try to decode the next Firmata message from a buffer
///
/// Returns:
/// - `Ok(Some(message))` if a complete message was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if a sysex overran `MAX_SYSEX_SIZE` (the buffer is cleared)
pub fn decode(buf: &mut BytesMut) -> Result<Option<FirmataMessage>, CodecError> {
    loop {
        let Some(&status) = buf.first() else {
            return Ok(None);
        };

        // Data byte outside a message, skip until the next status byte
        if status & 0x80 == 0 {
            buf.advance(1);
            continue;
        }

        if status == START_SYSEX {
            let Some(next) = buf[1..].iter().position(|b| b & 0x80 != 0).map(|i| i + 1) else {
                if buf.len() > MAX_SYSEX_SIZE {
                    let len = buf.len();
                    buf.clear();
                    return Err(CodecError::SysexTooLong(len));
                }
                return Ok(None);
            };

            // Any status byte other than the end marker means the end was lost
            if buf[next] != END_SYSEX {
                buf.advance(next);
                continue;
            }

            let frame = buf.split_to(next + 1);
            return Ok(Some(decode_sysex(&frame)));
        }

        let len = match status {
            REPORT_VERSION | SET_PIN_MODE => 3,
            0x90..=0x9F | 0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => {
                buf.advance(1);
                return Ok(Some(FirmataMessage::Unknown(status)));
            }
        };

        if buf.len() < len {
            // A status byte arriving early means the pending message was cut short
            if buf[1..].iter().any(|b| b & 0x80 != 0) {
                buf.advance(1);
                continue;
            }
            return Ok(None);
        }

        if buf[1..len].iter().any(|b| b & 0x80 != 0) {
            buf.advance(1);
            continue;
        }

        let frame = buf.split_to(len);
        let message = match status {
            REPORT_VERSION => FirmataMessage::ProtocolVersion(ProtocolVersion {
                major: frame[1],
                minor: frame[2],
            }),
            0x90..=0x9F => FirmataMessage::DigitalPort {
                port: status & 0x0F,
                mask: join_14bit(frame[1], frame[2]),
            },
            0xE0..=0xEF => FirmataMessage::AnalogValue {
                pin: status & 0x0F,
                value: join_14bit(frame[1], frame[2]),
            },
            _ => FirmataMessage::Unknown(status),
        };
        return Ok(Some(message));
    }
}

/// Reassembles Firmata messages from serial reads of arbitrary size
#[derive(Debug, Default)]
pub struct MessageDecoder {
    /// Bytes received but not yet part of a complete message
    buffer: BytesMut,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
        }
    }

    /// Append bytes read from the serial port
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Next complete message, or `Ok(None)` once only a partial one is left
    pub fn decode_next(&mut self) -> Result<Option<FirmataMessage>, CodecError> {
        decode(&mut self.buffer)
    }

    /// Number of bytes waiting for the rest of their message
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_7bit_string(s: &str) -> Vec<u8> {
        s.bytes().flat_map(|b| [b & 0x7F, b >> 7]).collect()
    }

    #[test]
    fn test_set_pin_mode_layout() {
        let frame = set_pin_mode(10, PinMode::Servo).expect("encode failed");
        assert_eq!(&frame[..], &[0xF4, 10, 0x04]);
    }

    #[test]
    fn test_analog_write_splits_value() {
        let frame = analog_write(11, 231).expect("encode failed");
        // 231 = 0b1_1100111
        assert_eq!(&frame[..], &[0xEB, 0x67, 0x01]);
    }

    #[test]
    fn test_analog_write_extended_for_high_pins() {
        let frame = analog_write(20, 128).expect("encode failed");
        assert_eq!(&frame[..], &[0xF0, 0x6F, 20, 0x00, 0x01, 0xF7]);
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert_eq!(
            set_pin_mode(128, PinMode::Servo),
            Err(CodecError::InvalidPin(128))
        );
        assert_eq!(
            analog_write(3, 0x4000),
            Err(CodecError::ValueOutOfRange(0x4000))
        );
    }

    #[test]
    fn test_servo_config_layout() {
        let frame = servo_config(9, 544, 2400).expect("encode failed");
        // 544 = 0x220 -> 0x20, 0x04; 2400 = 0x960 -> 0x60, 0x12
        assert_eq!(
            &frame[..],
            &[0xF0, 0x70, 9, 0x20, 0x04, 0x60, 0x12, 0xF7]
        );
    }

    #[test]
    fn test_queries() {
        assert_eq!(&report_version_query()[..], &[0xF9]);
        assert_eq!(&firmware_query()[..], &[0xF0, 0x79, 0xF7]);
    }

    #[test]
    fn test_decode_protocol_version() {
        let mut buf = BytesMut::from(&[0xF9, 2, 5][..]);
        let msg = decode(&mut buf).expect("decode failed");
        assert_eq!(
            msg,
            Some(FirmataMessage::ProtocolVersion(ProtocolVersion { major: 2, minor: 5 }))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_firmware_report() {
        let mut bytes = vec![0xF0, 0x79, 2, 5];
        bytes.extend(encode_7bit_string("StandardFirmata.ino"));
        bytes.push(0xF7);

        let mut buf = BytesMut::from(&bytes[..]);
        let msg = decode(&mut buf).expect("decode failed").expect("no message");
        assert_eq!(
            msg,
            FirmataMessage::Firmware {
                version: ProtocolVersion { major: 2, minor: 5 },
                name: "StandardFirmata.ino".into(),
            }
        );
    }

    #[test]
    fn test_decoder_chunked_input() {
        let mut bytes = vec![0xF0, 0x71];
        bytes.extend(encode_7bit_string("pin busy"));
        bytes.push(0xF7);

        let mut decoder = MessageDecoder::new();
        decoder.extend(&bytes[..4]);
        assert!(decoder.decode_next().expect("decode error").is_none());
        assert_eq!(decoder.buffer_len(), 4);

        decoder.extend(&bytes[4..]);
        let msg = decoder.decode_next().expect("decode error");
        assert_eq!(msg, Some(FirmataMessage::StringData("pin busy".into())));
        assert!(decoder.decode_next().expect("decode error").is_none());
    }

    #[test]
    fn test_decoder_resyncs_after_garbage() {
        let mut decoder = MessageDecoder::new();
        // stray data, a version reply cut short, then an analog reading on pin 2
        decoder.extend(&[0x12, 0x34, 0xF9, 0x02, 0xE2, 0x7F, 0x03]);

        let msg = decoder.decode_next().expect("decode error");
        assert_eq!(msg, Some(FirmataMessage::AnalogValue { pin: 2, value: 0x1FF }));
        assert!(decoder.decode_next().expect("decode error").is_none());
    }

    #[test]
    fn test_sysex_missing_end_does_not_swallow_next_messages() {
        let mut decoder = MessageDecoder::new();
        // firmware reply cut off, version reply, then a complete firmware reply
        decoder.extend(&[0xF0, 0x79, 0x02]);
        decoder.extend(&[0xF9, 0x02, 0x05]);
        decoder.extend(&[0xF0, 0x79, 0x02, 0x05, b'S', 0x00, 0xF7]);

        let version = ProtocolVersion { major: 2, minor: 5 };
        assert_eq!(
            decoder.decode_next().expect("decode error"),
            Some(FirmataMessage::ProtocolVersion(version))
        );
        assert_eq!(
            decoder.decode_next().expect("decode error"),
            Some(FirmataMessage::Firmware {
                version,
                name: "S".into(),
            })
        );
        assert!(decoder.decode_next().expect("decode error").is_none());
        assert_eq!(decoder.buffer_len(), 0);
    }

    #[test]
    fn test_multiple_messages() {
        let mut decoder = MessageDecoder::new();
        decoder.extend(&[0xF9, 2, 5, 0x91, 0x05, 0x00, 0xF0, 0x6A, 0x01, 0xF7]);

        assert!(matches!(
            decoder.decode_next().expect("decode error"),
            Some(FirmataMessage::ProtocolVersion(_))
        ));
        assert_eq!(
            decoder.decode_next().expect("decode error"),
            Some(FirmataMessage::DigitalPort { port: 1, mask: 5 })
        );
        assert!(matches!(
            decoder.decode_next().expect("decode error"),
            Some(FirmataMessage::Sysex { command: 0x6A, .. })
        ));
        assert!(decoder.decode_next().expect("decode error").is_none());
    }

    #[test]
    fn test_sysex_too_long() {
        let mut buf = BytesMut::new();
        buf.put_u8(START_SYSEX);
        buf.put_bytes(0x01, MAX_SYSEX_SIZE + 1);

        let result = decode(&mut buf);
        assert!(matches!(result, Err(CodecError::SysexTooLong(_))));
        assert!(buf.is_empty(), "buffer should be discarded");
    }
}
