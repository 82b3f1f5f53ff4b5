//! Path value parsing

use crate::config::ValuePolicy;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValueError {
    #[error("value must be one or more decimal digits")]
    NotDigits,

    #[error("value {0} is outside 0-255")]
    OutOfRange(String),
}

/// Turn a path segment into a servo position
///
/// Only ASCII digit strings are accepted. Under `Wrap`, the value is taken
/// modulo 256 whatever its length. Under `Strict`, anything above 255 is an
/// error.
pub fn parse_command_value(raw: &str, policy: ValuePolicy) -> Result<u8, ValueError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValueError::NotDigits);
    }

    match policy {
        // Horner's rule in u8 arithmetic is exact modulo 256
        ValuePolicy::Wrap => Ok(raw
            .bytes()
            .fold(0u8, |acc, d| acc.wrapping_mul(10).wrapping_add(d - b'0'))),
        ValuePolicy::Strict => raw
            .parse::<u64>()
            .ok()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| ValueError::OutOfRange(raw.to_string())),
    }
}
