//! Command line arguments and bridge configuration

use crate::board::{BoardConfig, PulseRange, DEFAULT_BAUD};
use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// How path values that do not fit in a byte are treated
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValuePolicy {
    /// Wrap modulo 256, including digit strings longer than any integer type
    #[default]
    Wrap,

    /// Reject anything outside 0-255 with 400 Bad Request
    Strict,
}

/// Whether hardware failures reach the HTTP caller
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HardwareErrorPolicy {
    /// Reply as soon as the worker takes the value; failures are only logged
    #[default]
    Ignore,

    /// Wait for the move to finish and reply 502 Bad Gateway on failure
    Report,
}

#[derive(Parser, Debug)]
#[command(name = "servo-bridge", version, about = "Forward HTTP servo commands to a Firmata board")]
pub struct Cli {
    /// Serial device the board is connected to (e.g. /dev/ttyACM0)
    #[arg(long)]
    pub port: String,

    /// Pin the steering servo is connected to
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(0..=127))]
    pub steering_pin: u8,

    /// Pin the speed servo is connected to
    #[arg(long, default_value_t = 11, value_parser = clap::value_parser!(u8).range(0..=127))]
    pub speed_pin: u8,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Seconds to wait for the board to report its protocol version
    #[arg(long, default_value_t = 5)]
    pub handshake_timeout: u64,

    /// Servo pulse width for position 0, in microseconds
    #[arg(long, requires = "max_pulse")]
    pub min_pulse: Option<u16>,

    /// Servo pulse width for position 180, in microseconds
    #[arg(long, requires = "min_pulse")]
    pub max_pulse: Option<u16>,

    /// Treatment of path values outside 0-255
    #[arg(long, value_enum, default_value_t = ValuePolicy::Wrap)]
    pub value_policy: ValuePolicy,

    /// Whether servo failures are reported to HTTP callers
    #[arg(long, value_enum, default_value_t = HardwareErrorPolicy::Ignore)]
    pub hardware_errors: HardwareErrorPolicy,
}

/// Configuration for the whole bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Serial link parameters
    pub board: BoardConfig,
    /// Steering servo pin
    pub steering_pin: u8,
    /// Speed servo pin
    pub speed_pin: u8,
    /// Optional pulse range applied to both servos
    pub pulse_range: Option<PulseRange>,
    /// HTTP listen address
    pub listen: SocketAddr,
    pub value_policy: ValuePolicy,
    pub hardware_errors: HardwareErrorPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            steering_pin: 10,
            speed_pin: 11,
            pulse_range: None,
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            value_policy: ValuePolicy::Wrap,
            hardware_errors: HardwareErrorPolicy::Ignore,
        }
    }
}

impl TryFrom<Cli> for BridgeConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let pulse_range = match (cli.min_pulse, cli.max_pulse) {
            (Some(min_us), Some(max_us)) => {
                if min_us >= max_us {
                    bail!("--min-pulse ({min_us}) must be below --max-pulse ({max_us})");
                }
                Some(PulseRange { min_us, max_us })
            }
            _ => None,
        };

        Ok(Self {
            board: BoardConfig {
                port: cli.port,
                baud: cli.baud,
                handshake_timeout: Duration::from_secs(cli.handshake_timeout),
            },
            steering_pin: cli.steering_pin,
            speed_pin: cli.speed_pin,
            pulse_range,
            listen: cli.listen,
            value_policy: cli.value_policy,
            hardware_errors: cli.hardware_errors,
        })
    }
}
