pub mod sqlite;

use async_trait::async_trait;

use crate::errors::ReconError;
use crate::models::{NewScanJob, ScanJob};

pub use sqlite::SqliteQueue;

/// A claimed job. `attempt` starts at 1.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub job: ScanJob,
    pub attempt: u32,
    pub max_attempts: u32,
}

impl Delivery {
    pub fn is_redelivery(&self) -> bool {
        self.attempt > 1
    }
}

/// Durable work queue feeding the job worker. Redelivery policy belongs to
/// the queue implementation.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Returns the created job, whose `scan_id` names the pending ScanResult.
    async fn enqueue(&self, job: NewScanJob) -> Result<ScanJob, ReconError>;

    async fn dequeue(&self) -> Result<Option<Delivery>, ReconError>;

    /// Percentage in 0..=100. Lower values than already reported are ignored.
    async fn report_progress(&self, job_id: &str, progress: u8) -> Result<(), ReconError>;

    async fn ack(&self, job_id: &str) -> Result<(), ReconError>;

    /// Attempt failed; the queue decides whether to redeliver.
    async fn nack(&self, job_id: &str, error: &str) -> Result<(), ReconError>;

    /// Job failed for good; never redelivered.
    async fn reject(&self, job_id: &str, error: &str) -> Result<(), ReconError>;
}
