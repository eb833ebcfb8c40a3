//! Asynchronous dispatch of committed provisioning requests.
//!
//! Each signal triggers exactly one attempt: load the request, call the
//! provider boundary, then persist `Active` or `Failed`. Attempts run on a
//! small fixed pool of workers fed by the bounded signal queue.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use vm_core::ProvisioningStatus;
use vm_provider::{ProvisionOutcome, ResilientProvider};

use crate::error::{OrchestratorError, Result};
use crate::signal::{self, SignalReceiver, SignalSender, DEFAULT_QUEUE_CAPACITY};
use crate::store::ProvisioningStore;

pub const DEFAULT_WORKERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn ProvisioningStore>,
    provider: Arc<ResilientProvider>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ProvisioningStore>, provider: Arc<ResilientProvider>) -> Self {
        Self { store, provider }
    }

    /// Run one dispatch attempt for `id` and return the status it ended in.
    ///
    /// A missing record is reported as [`OrchestratorError::NotFound`] and is
    /// not retried: the signal is only sent after the record was committed.
    #[instrument(skip(self))]
    pub async fn dispatch(&self, id: Uuid) -> Result<ProvisioningStatus> {
        let mut request = match self.store.find_by_id(id).await? {
            Some(request) => request,
            None => {
                error!("Request missing from store during dispatch");
                return Err(OrchestratorError::NotFound(id.to_string()));
            }
        };

        match request.status() {
            ProvisioningStatus::Rejected | ProvisioningStatus::Active | ProvisioningStatus::Failed => {
                warn!(status = %request.status(), "Request already settled, skipping dispatch");
                return Ok(request.status());
            }
            ProvisioningStatus::Approved => {
                request.mark_provisioning()?;
                request = self.store.save(&request).await?;
            }
            ProvisioningStatus::PendingApproval | ProvisioningStatus::Provisioning => {}
        }

        match self.provider.provision(&request).await {
            ProvisionOutcome::Provisioned(instance) => {
                info!(%instance, "Provisioning succeeded");
                request.complete();
            }
            ProvisionOutcome::Fallback { sentinel, cause } => {
                warn!(sentinel, %cause, "Provisioning failed");
                request.fail();
            }
        }

        let saved = self.store.save(&request).await?;
        Ok(saved.status())
    }

    /// Start the worker pool and return the sender the use case publishes to.
    pub fn spawn(self, config: &DispatcherConfig) -> (SignalSender, DispatcherHandle) {
        let (sender, receiver) = signal::channel(config.queue_capacity);
        let handle = self.spawn_with_receiver(receiver, config.workers);
        (sender, handle)
    }

    fn spawn_with_receiver(self, receiver: SignalReceiver, workers: usize) -> DispatcherHandle {
        let join = tokio::spawn(self.run(receiver, workers.max(1)));
        DispatcherHandle { join }
    }

    async fn run(self, mut receiver: SignalReceiver, workers: usize) {
        let permits = Arc::new(Semaphore::new(workers));
        let mut in_flight = JoinSet::new();

        info!(workers, "Dispatcher running");

        loop {
            // Take a worker slot before pulling the next signal, so anything
            // beyond the pool stays in the bounded queue and pushes back on publishers.
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let Some(id) = receiver.recv().await else {
                break;
            };

            let dispatcher = self.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                if let Err(e) = dispatcher.dispatch(id).await {
                    error!(request_id = %id, "Dispatch failed: {}", e);
                }
            });

            while let Some(finished) = in_flight.try_join_next() {
                log_join_error(finished);
            }
        }

        while let Some(finished) = in_flight.join_next().await {
            log_join_error(finished);
        }

        info!("Dispatcher stopped");
    }
}

fn log_join_error(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("Dispatch task aborted: {}", e);
    }
}

/// Handle to a running dispatcher.
pub struct DispatcherHandle {
    join: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Wait for the dispatcher to finish.
    ///
    /// It finishes once every [`SignalSender`] has been dropped, the queue is
    /// drained and all in-flight attempts have settled.
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            error!("Dispatcher task ended abnormally: {}", e);
        }
    }
}
