use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::commands::WorkerArgs;
use crate::errors::ReconError;
use crate::pipeline::{JobWorker, ScanCoordinator};
use crate::queue::SqliteQueue;

pub async fn handle_worker(args: WorkerArgs) -> Result<(), ReconError> {
    let config = super::load_config(&args.store).await?;
    let db = super::open_database(&args.store, &config)?;

    let queue = SqliteQueue::new(db.clone(), config.worker.max_attempts);
    queue.recover_abandoned()?;

    let coordinator = Arc::new(ScanCoordinator::from_config(&config, db)?);
    let worker = JobWorker::new(Arc::new(queue), coordinator)
        .with_concurrency(args.workers.unwrap_or(config.worker.concurrency))
        .with_poll_interval(Duration::from_millis(config.worker.poll_interval_ms));

    let handled = if args.drain {
        worker.run_until_idle().await?
    } else {
        let token = worker.cancel_token();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, finishing in-flight scans");
                    token.cancel();
                }
                Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
            }
        });
        worker.run().await?
    };

    info!(handled, "Worker exited");
    Ok(())
}
