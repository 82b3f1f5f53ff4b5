//! Shared handler state

use crate::actuator::DeliveryChannel;
use crate::config::{HardwareErrorPolicy, ValuePolicy};

/// Everything a handler needs, built once at startup
#[derive(Clone)]
pub struct ServerContext {
    pub steering: DeliveryChannel,
    pub speed: DeliveryChannel,
    pub value_policy: ValuePolicy,
    pub hardware_errors: HardwareErrorPolicy,
}

impl ServerContext {
    /// Create a context with the default policies
    pub fn new(steering: DeliveryChannel, speed: DeliveryChannel) -> Self {
        Self {
            steering,
            speed,
            value_policy: ValuePolicy::default(),
            hardware_errors: HardwareErrorPolicy::default(),
        }
    }

    pub fn with_value_policy(mut self, policy: ValuePolicy) -> Self {
        self.value_policy = policy;
        self
    }

    pub fn with_hardware_errors(mut self, policy: HardwareErrorPolicy) -> Self {
        self.hardware_errors = policy;
        self
    }
}
