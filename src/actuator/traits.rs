//! Actuator trait abstraction for pluggable hardware drivers

use anyhow::Result;
use async_trait::async_trait;

/// A device that can be moved to an 8-bit position
#[async_trait]
pub trait Actuator: Send + 'static {
    /// Move to the given position, returning once the command is on the wire
    async fn move_to(&mut self, position: u8) -> Result<()>;

    /// Human-readable name for this actuator
    fn name(&self) -> &str;
}
