use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};

pub const DEFAULT_QUEUE_CAPACITY: usize = 25;

/// Announces that a provisioning request has been committed and is ready to
/// be dispatched.
///
/// Callers publish only after the store has committed the request, so a
/// consumer reading the id back is guaranteed to find it.
#[async_trait]
pub trait RequestSignal: Send + Sync {
    async fn publish(&self, request_id: Uuid) -> Result<()>;
}

/// Bounded in-process channel between the use case and the dispatcher.
pub fn channel(capacity: usize) -> (SignalSender, SignalReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (SignalSender { tx }, SignalReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<Uuid>,
}

#[async_trait]
impl RequestSignal for SignalSender {
    /// Waits for backlog space when the queue is full; signals are never dropped.
    async fn publish(&self, request_id: Uuid) -> Result<()> {
        self.tx
            .send(request_id)
            .await
            .map_err(|_| OrchestratorError::SignalClosed)
    }
}

#[derive(Debug)]
pub struct SignalReceiver {
    rx: mpsc::Receiver<Uuid>,
}

impl SignalReceiver {
    /// Next request id, or `None` once every sender is gone and the backlog is drained.
    pub async fn recv(&mut self) -> Option<Uuid> {
        self.rx.recv().await
    }
}
