use async_trait::async_trait;
use tracing::{info, warn};

use super::{Delivery, WorkQueue};
use crate::db::Database;
use crate::errors::ReconError;
use crate::models::{JobStatus, NewScanJob, ScanJob};

/// [`WorkQueue`] on the `scan_jobs` table of the shared database.
pub struct SqliteQueue {
    db: Database,
    max_attempts: u32,
}

impl SqliteQueue {
    pub fn new(db: Database, max_attempts: u32) -> Self {
        Self { db, max_attempts: max_attempts.max(1) }
    }

    /// Re-queue jobs a crashed worker left active. Call once before workers start.
    pub fn recover_abandoned(&self) -> Result<usize, ReconError> {
        let recovered = self.db.requeue_active_jobs()?;
        if recovered > 0 {
            warn!(recovered, "Re-queued jobs abandoned by a previous worker");
        }
        Ok(recovered)
    }
}

#[async_trait]
impl WorkQueue for SqliteQueue {
    async fn enqueue(&self, job: NewScanJob) -> Result<ScanJob, ReconError> {
        let job = self.db.enqueue_job(&job, self.max_attempts)?;
        info!(job_id = %job.job_id, scan_id = %job.scan_id, domain = %job.domain, priority = job.priority, "Job enqueued");
        Ok(job)
    }

    async fn dequeue(&self) -> Result<Option<Delivery>, ReconError> {
        Ok(self
            .db
            .claim_next_job()?
            .map(|(job, attempt, max_attempts)| Delivery { job, attempt, max_attempts }))
    }

    async fn report_progress(&self, job_id: &str, progress: u8) -> Result<(), ReconError> {
        self.db.update_job_progress(job_id, progress)
    }

    async fn ack(&self, job_id: &str) -> Result<(), ReconError> {
        self.db.complete_job(job_id)
    }

    async fn nack(&self, job_id: &str, error: &str) -> Result<(), ReconError> {
        match self.db.retry_or_fail_job(job_id, error)? {
            JobStatus::Queued => info!(job_id, error, "Job re-queued for another attempt"),
            status => warn!(job_id, error, status = %status, "Job attempts exhausted"),
        }
        Ok(())
    }

    async fn reject(&self, job_id: &str, error: &str) -> Result<(), ReconError> {
        self.db.fail_job(job_id, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanType;

    fn request(domain: &str) -> NewScanJob {
        NewScanJob {
            tenant_id: "tenant-1".into(),
            domain: domain.into(),
            types: [ScanType::SslCheck].into_iter().collect(),
            priority: 0,
        }
    }

    #[tokio::test]
    async fn test_delivery_lifecycle() {
        let db = Database::in_memory().unwrap();
        let queue = SqliteQueue::new(db.clone(), 2);

        let job = queue.enqueue(request("example.com")).await.unwrap();
        let delivery = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(delivery.job.job_id, job.job_id);
        assert!(!delivery.is_redelivery());
        assert!(queue.dequeue().await.unwrap().is_none());

        queue.nack(&job.job_id, "worker crashed").await.unwrap();
        let again = queue.dequeue().await.unwrap().unwrap();
        assert!(again.is_redelivery());

        queue.report_progress(&job.job_id, 50).await.unwrap();
        queue.ack(&job.job_id).await.unwrap();

        let record = db.get_job(&job.job_id).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100);
    }

    #[tokio::test]
    async fn test_reject_is_final() {
        let db = Database::in_memory().unwrap();
        let queue = SqliteQueue::new(db.clone(), 5);
        let job = queue.enqueue(request("example.com")).await.unwrap();

        queue.dequeue().await.unwrap().unwrap();
        queue.reject(&job.job_id, "scan failed").await.unwrap();

        assert!(queue.dequeue().await.unwrap().is_none());
        assert_eq!(db.get_job(&job.job_id).unwrap().unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_recover_abandoned() {
        let db = Database::in_memory().unwrap();
        let queue = SqliteQueue::new(db, 3);
        queue.enqueue(request("example.com")).await.unwrap();
        queue.dequeue().await.unwrap().unwrap();

        assert_eq!(queue.recover_abandoned().unwrap(), 1);
        assert!(queue.dequeue().await.unwrap().is_some());
    }
}
