//! Actuator delivery infrastructure
//!
//! This module handles:
//! - The `Actuator` seam hardware drivers implement
//! - One single-writer delivery channel per actuator
//! - Serializing concurrent requests into ordered hardware calls

mod channel;
mod traits;

pub use channel::{DeliveryChannel, DeliveryError};
pub use traits::Actuator;

#[cfg(test)]
pub(crate) mod mock;
