//! Recording actuator for tests

use super::Actuator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Positions received by a mock, in call order
pub type MoveLog = Arc<Mutex<Vec<u8>>>;

pub struct MockActuator {
    name: String,
    log: MoveLog,
    fail: bool,
    gate: Option<Arc<Semaphore>>,
}

impl MockActuator {
    /// Actuator that records every move and succeeds
    pub fn new(name: &str) -> (Self, MoveLog) {
        let log = MoveLog::default();
        let actuator = Self {
            name: name.into(),
            log: log.clone(),
            fail: false,
            gate: None,
        };
        (actuator, log)
    }

    /// Actuator that records every move and then fails it
    pub fn failing(name: &str) -> (Self, MoveLog) {
        let (mut actuator, log) = Self::new(name);
        actuator.fail = true;
        (actuator, log)
    }

    /// Actuator whose moves block until a permit is added to the gate
    pub fn gated(name: &str) -> (Self, MoveLog, Arc<Semaphore>) {
        let (mut actuator, log) = Self::new(name);
        let gate = Arc::new(Semaphore::new(0));
        actuator.gate = Some(gate.clone());
        (actuator, log, gate)
    }
}

#[async_trait]
impl Actuator for MockActuator {
    async fn move_to(&mut self, position: u8) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }

        self.log.lock().unwrap().push(position);

        if self.fail {
            return Err(anyhow!("servo disconnected"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wait until the log holds `count` moves and return them
pub async fn wait_for_moves(log: &MoveLog, count: usize) -> Vec<u8> {
    let wait = async {
        loop {
            {
                let moves = log.lock().unwrap();
                if moves.len() >= count {
                    return moves.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .expect("timed out waiting for moves")
}
