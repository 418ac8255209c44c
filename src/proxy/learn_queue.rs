//! Bounded queue feeding completed exchanges to the learner.
//!
//! Submission never waits: when the queue is full the exchange is dropped with a
//! warning, so a slow learner cannot hold up inference traffic. A single worker
//! drains the queue, which keeps learned writes in arrival order.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::VaultError;
use crate::vault::Vault;

#[derive(Debug)]
pub struct Exchange {
    pub model: String,
    pub prompt: String,
    pub response: String,
}

#[derive(Clone)]
pub struct LearnQueue {
    tx: Option<mpsc::Sender<Exchange>>,
}

impl LearnQueue {
    /// Start the worker. The returned handle finishes once every sender is dropped
    /// and the queue is drained.
    pub fn start(vault: Arc<Vault>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(vault, rx));
        (Self { tx: Some(tx) }, worker)
    }

    /// A queue that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Enqueue an exchange. Returns `false` if it was dropped.
    pub fn submit(&self, exchange: Exchange) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(exchange) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(model = %dropped.model, "learning queue full, exchange dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("learning worker stopped, exchange dropped");
                false
            }
        }
    }
}

async fn run_worker(vault: Arc<Vault>, mut rx: mpsc::Receiver<Exchange>) {
    while let Some(exchange) = rx.recv().await {
        let vault = vault.clone();
        let model = exchange.model.clone();
        let result =
            tokio::task::spawn_blocking(move || vault.observe(&exchange.prompt, &exchange.response))
                .await;

        match result {
            Ok(Ok(learned)) if learned.is_empty() => debug!(model = %model, "nothing learned"),
            Ok(Ok(learned)) => debug!(model = %model, learned = learned.len(), "exchange learned"),
            Ok(Err(e)) => {
                let err = VaultError::ExtractionFailure(anyhow!(e));
                warn!(model = %model, error = %err, "learning skipped");
            }
            Err(e) => warn!(model = %model, error = %e, "learning task panicked"),
        }
    }
    info!("learning worker stopped");
}
