use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::coordinator::ScanCoordinator;
use super::state::{ScanEvent, ScanOutcome};
use crate::errors::ReconError;
use crate::queue::{Delivery, WorkQueue};
use crate::utils::truncation::truncate_error;

const PANIC_ERROR: &str = "worker task panicked";

/// Pulls scan jobs off a [`WorkQueue`] and runs them with bounded concurrency.
pub struct JobWorker {
    queue: Arc<dyn WorkQueue>,
    coordinator: Arc<ScanCoordinator>,
    concurrency: usize,
    poll_interval: Duration,
    cancel_token: CancellationToken,
}

impl JobWorker {
    pub fn new(queue: Arc<dyn WorkQueue>, coordinator: Arc<ScanCoordinator>) -> Self {
        Self {
            queue,
            coordinator,
            concurrency: 3,
            poll_interval: Duration::from_millis(1000),
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Cancelling the token stops new pulls; in-flight jobs are awaited.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Poll until cancelled. Returns the number of deliveries handled.
    pub async fn run(&self) -> Result<usize, ReconError> {
        self.work(false).await
    }

    /// Work until the queue is empty and nothing is in flight.
    pub async fn run_until_idle(&self) -> Result<usize, ReconError> {
        self.work(true).await
    }

    async fn work(&self, drain: bool) -> Result<usize, ReconError> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut in_flight = JoinSet::new();
        let mut handled = 0usize;

        info!(concurrency = self.concurrency, drain, "Worker started");

        loop {
            // Reap finished tasks so the set does not grow without bound
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    error!(error = %e, "Job task panicked");
                }
            }

            let permit = tokio::select! {
                _ = self.cancel_token.cancelled() => break,
                permit = permits.clone().acquire_owned() => permit
                    .map_err(|e| ReconError::Internal(format!("Worker semaphore closed: {}", e)))?,
            };

            let delivery = match self.queue.dequeue().await {
                Ok(delivery) => delivery,
                Err(e) => {
                    warn!(error = %e, "Dequeue failed");
                    None
                }
            };

            let Some(delivery) = delivery else {
                drop(permit);
                if drain {
                    if in_flight.is_empty() {
                        break;
                    }
                    // Nacked jobs may come back once the running ones settle
                    in_flight.join_next().await;
                    continue;
                }
                tokio::select! {
                    _ = self.cancel_token.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
                continue;
            };

            handled += 1;
            info!(
                job_id = %delivery.job.job_id,
                domain = %delivery.job.domain,
                attempt = delivery.attempt,
                max_attempts = delivery.max_attempts,
                "Job claimed"
            );
            let queue = self.queue.clone();
            let coordinator = self.coordinator.clone();
            in_flight.spawn(async move {
                guarded(queue, coordinator, delivery).await;
                drop(permit);
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Job task panicked");
            }
        }
        info!(handled, "Worker stopped");
        Ok(handled)
    }
}

/// A panicking job is still settled: nacked while attempts remain, otherwise
/// its scan is failed and the job rejected.
async fn guarded(queue: Arc<dyn WorkQueue>, coordinator: Arc<ScanCoordinator>, delivery: Delivery) {
    let job_id = delivery.job.job_id.clone();
    let scan_id = delivery.job.scan_id.clone();
    let last_attempt = delivery.attempt >= delivery.max_attempts;

    let run = AssertUnwindSafe(process(queue.clone(), coordinator.clone(), delivery)).catch_unwind();
    if run.await.is_ok() {
        return;
    }

    error!(job_id = %job_id, scan_id = %scan_id, last_attempt, "Job task panicked");
    let settled = if last_attempt {
        if let Err(e) = coordinator.database().fail_scan(&scan_id, PANIC_ERROR) {
            warn!(scan_id = %scan_id, error = %e, "Could not record scan failure");
        }
        queue.reject(&job_id, PANIC_ERROR).await
    } else {
        queue.nack(&job_id, PANIC_ERROR).await
    };
    if let Err(e) = settled {
        error!(job_id = %job_id, error = %e, "Failed to settle job");
    }
}

/// Run one delivery and settle it on the queue.
async fn process(queue: Arc<dyn WorkQueue>, coordinator: Arc<ScanCoordinator>, delivery: Delivery) {
    let job_id = delivery.job.job_id.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let progress_queue = queue.clone();
    let progress_job = job_id.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let ScanEvent::Progress { percent } = event {
                if let Err(e) = progress_queue.report_progress(&progress_job, percent).await {
                    debug!(job_id = %progress_job, error = %e, "Progress update dropped");
                }
            }
        }
    });

    let result = coordinator.run(&delivery.job, Some(&tx)).await;
    drop(tx);
    let _ = forwarder.await;

    let settled = match result {
        Ok(ScanOutcome::Completed(_)) | Ok(ScanOutcome::Skipped(_)) => queue.ack(&job_id).await,
        Ok(ScanOutcome::Failed(message)) => queue.reject(&job_id, &message).await,
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Job could not run, returning to queue");
            queue.nack(&job_id, &truncate_error(&e.to_string())).await
        }
    };
    if let Err(e) = settled {
        error!(job_id = %job_id, error = %e, "Failed to settle job");
    }
}
