//! Single-writer delivery channel
//!
//! Each actuator is owned by exactly one worker task. Producers hand values
//! to the worker through a bounded channel and wait until the worker has
//! taken them, so hardware calls for one actuator never overlap and run in
//! the order they were handed off.

use super::Actuator;
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors returned to producers
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("{0} worker is not running")]
    Closed(String),

    #[error("{name} move failed: {message}")]
    Actuator { name: String, message: String },
}

/// A value on its way to the worker
struct Delivery {
    position: u8,
    /// Fired as soon as the worker takes the value
    handoff: oneshot::Sender<()>,
    /// Fired when the move call returns, if the producer wants the outcome
    outcome: Option<oneshot::Sender<Result<()>>>,
}

/// Producer handle for one actuator's worker
#[derive(Clone)]
pub struct DeliveryChannel {
    name: Arc<str>,
    tx: mpsc::Sender<Delivery>,
}

impl DeliveryChannel {
    /// Take ownership of an actuator and spawn its worker loop
    ///
    /// The worker runs until every clone of the returned channel is dropped.
    pub fn spawn<A: Actuator>(actuator: A) -> (Self, JoinHandle<()>) {
        // Capacity 1 is the smallest tokio allows; the hand-off signal below
        // keeps producers parked until the worker actually takes the value.
        let (tx, rx) = mpsc::channel(1);
        let name: Arc<str> = actuator.name().into();

        let handle = tokio::spawn(delivery_loop(actuator, rx));

        (Self { name, tx }, handle)
    }

    /// Name of the actuator behind this channel
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hand a value to the worker, returning once the worker has taken it
    pub async fn deliver(&self, position: u8) -> Result<(), DeliveryError> {
        let (handoff, taken) = oneshot::channel();
        self.send(Delivery {
            position,
            handoff,
            outcome: None,
        })
        .await?;

        taken.await.map_err(|_| self.closed())
    }

    /// Hand a value to the worker and wait for the hardware call to finish
    pub async fn deliver_confirmed(&self, position: u8) -> Result<(), DeliveryError> {
        let (handoff, _) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        self.send(Delivery {
            position,
            handoff,
            outcome: Some(outcome_tx),
        })
        .await?;

        match outcome_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DeliveryError::Actuator {
                name: self.name.to_string(),
                message: format!("{:#}", e),
            }),
            Err(_) => Err(self.closed()),
        }
    }

    async fn send(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        self.tx.send(delivery).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> DeliveryError {
        DeliveryError::Closed(self.name.to_string())
    }
}

/// Worker loop: take one value, move, repeat
async fn delivery_loop<A: Actuator>(mut actuator: A, mut rx: mpsc::Receiver<Delivery>) {
    while let Some(delivery) = rx.recv().await {
        let position = delivery.position;

        // Producer may have gone away; the move still happens
        let _ = delivery.handoff.send(());

        debug!("[{}] Sending servo value: {}", actuator.name(), position);
        let result = actuator.move_to(position).await;

        if let Err(e) = &result {
            warn!("[{}] Move to {} failed: {:#}", actuator.name(), position, e);
        }

        if let Some(outcome) = delivery.outcome {
            let _ = outcome.send(result);
        }
    }

    info!("[{}] Delivery channel closed", actuator.name());
}
