use chrono::Utc;
use rusqlite::OptionalExtension;

use super::scans::insert_scan;
use super::Database;
use crate::errors::ReconError;
use crate::models::{JobStatus, NewScanJob, ScanJob, ScanResult};

/// Queue bookkeeping for one job, as shown by `reconlens query --jobs`.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job: ScanJob,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub progress: u8,
    pub last_error: Option<String>,
}

fn queue_err(context: &str, e: rusqlite::Error) -> ReconError {
    ReconError::Queue(format!("{}: {}", context, e))
}

impl Database {
    /// Create the pending ScanResult and its queue entry atomically.
    pub fn enqueue_job(&self, new: &NewScanJob, max_attempts: u32) -> Result<ScanJob, ReconError> {
        let job = ScanJob {
            job_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: new.tenant_id.clone(),
            domain: new.domain.clone(),
            types: new.types.clone(),
            priority: new.priority,
            scan_id: uuid::Uuid::new_v4().to_string(),
        };
        let types = serde_json::to_string(&job.types)?;
        let now = Utc::now().to_rfc3339();

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| queue_err("Failed to begin enqueue", e))?;
        insert_scan(&tx, &ScanResult::pending(&job.scan_id, &job.tenant_id, &job.domain))?;
        tx.execute(
            "INSERT INTO scan_jobs (id, scan_id, tenant_id, domain, types_json, priority, status, max_attempts, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'queued', ?7, ?8, ?8)",
            rusqlite::params![
                job.job_id,
                job.scan_id,
                job.tenant_id,
                job.domain,
                types,
                job.priority,
                max_attempts,
                now,
            ],
        )
        .map_err(|e| queue_err("Failed to insert job", e))?;
        tx.commit().map_err(|e| queue_err("Failed to commit enqueue", e))?;
        Ok(job)
    }

    /// Claim the highest-priority, oldest queued job. Returns the job and its attempt number.
    pub fn claim_next_job(&self) -> Result<Option<(ScanJob, u32, u32)>, ReconError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| queue_err("Failed to begin claim", e))?;

        let row = tx
            .query_row(
                "SELECT id, scan_id, tenant_id, domain, types_json, priority, attempts, max_attempts
                 FROM scan_jobs WHERE status = 'queued'
                 ORDER BY priority DESC, created_at ASC, rowid ASC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i32>(5)?,
                        row.get::<_, u32>(6)?,
                        row.get::<_, u32>(7)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| queue_err("Failed to select job", e))?;

        let Some((job_id, scan_id, tenant_id, domain, types, priority, attempts, max_attempts)) = row else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE scan_jobs SET status = 'active', attempts = attempts + 1, updated_at = ?2 WHERE id = ?1",
            rusqlite::params![job_id, Utc::now().to_rfc3339()],
        )
        .map_err(|e| queue_err("Failed to claim job", e))?;
        tx.commit().map_err(|e| queue_err("Failed to commit claim", e))?;

        let job = ScanJob {
            job_id,
            tenant_id,
            domain,
            types: serde_json::from_str(&types)?,
            priority,
            scan_id,
        };
        Ok(Some((job, attempts + 1, max_attempts)))
    }

    pub fn update_job_progress(&self, job_id: &str, progress: u8) -> Result<(), ReconError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE scan_jobs SET progress = MAX(progress, ?2), updated_at = ?3 WHERE id = ?1",
            rusqlite::params![job_id, progress.min(100), Utc::now().to_rfc3339()],
        )
        .map_err(|e| queue_err("Failed to update progress", e))?;
        Ok(())
    }

    pub fn complete_job(&self, job_id: &str) -> Result<(), ReconError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE scan_jobs SET status = 'completed', progress = 100, updated_at = ?2 WHERE id = ?1 AND status = 'active'",
            rusqlite::params![job_id, Utc::now().to_rfc3339()],
        )
        .map_err(|e| queue_err("Failed to complete job", e))?;
        Ok(())
    }

    /// Re-queue a failed attempt, or fail the job once its attempts are used up.
    pub fn retry_or_fail_job(&self, job_id: &str, error: &str) -> Result<JobStatus, ReconError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE scan_jobs SET
                status = CASE WHEN attempts < max_attempts THEN 'queued' ELSE 'failed' END,
                last_error = ?2,
                updated_at = ?3
             WHERE id = ?1 AND status = 'active'",
            rusqlite::params![job_id, error, Utc::now().to_rfc3339()],
        )
        .map_err(|e| queue_err("Failed to nack job", e))?;

        let status: String = conn
            .query_row("SELECT status FROM scan_jobs WHERE id = ?1", rusqlite::params![job_id], |row| row.get(0))
            .map_err(|e| queue_err("Failed to read job status", e))?;
        JobStatus::parse(&status).ok_or_else(|| ReconError::Queue(format!("Unknown job status '{}'", status)))
    }

    pub fn fail_job(&self, job_id: &str, error: &str) -> Result<(), ReconError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE scan_jobs SET status = 'failed', last_error = ?2, updated_at = ?3 WHERE id = ?1 AND status = 'active'",
            rusqlite::params![job_id, error, Utc::now().to_rfc3339()],
        )
        .map_err(|e| queue_err("Failed to reject job", e))?;
        Ok(())
    }

    /// Put jobs a dead worker left active back on the queue.
    pub fn requeue_active_jobs(&self) -> Result<usize, ReconError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE scan_jobs SET status = 'queued', updated_at = ?1 WHERE status = 'active'",
            rusqlite::params![Utc::now().to_rfc3339()],
        )
        .map_err(|e| queue_err("Failed to recover jobs", e))
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, ReconError> {
        Ok(self.query_jobs("WHERE id = ?1", rusqlite::params![job_id])?.pop())
    }

    pub fn list_jobs(&self, limit: u32) -> Result<Vec<JobRecord>, ReconError> {
        self.query_jobs("ORDER BY created_at DESC LIMIT ?1", rusqlite::params![limit])
    }

    fn query_jobs(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<JobRecord>, ReconError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT id, scan_id, tenant_id, domain, types_json, priority, status, attempts, max_attempts, progress, last_error FROM scan_jobs {}",
            clause
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| queue_err("Query failed", e))?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i32>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, u32>(7)?,
                    row.get::<_, u32>(8)?,
                    row.get::<_, u8>(9)?,
                    row.get::<_, Option<String>>(10)?,
                ))
            })
            .map_err(|e| queue_err("Query error", e))?;

        let mut records = Vec::new();
        for row in rows {
            let (job_id, scan_id, tenant_id, domain, types, priority, status, attempts, max_attempts, progress, last_error) =
                row.map_err(|e| queue_err("Row error", e))?;
            records.push(JobRecord {
                job: ScanJob { job_id, tenant_id, domain, types: serde_json::from_str(&types)?, priority, scan_id },
                status: JobStatus::parse(&status)
                    .ok_or_else(|| ReconError::Queue(format!("Unknown job status '{}'", status)))?,
                attempts,
                max_attempts,
                progress,
                last_error,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScanStatus, ScanType};

    fn new_job(domain: &str, priority: i32) -> NewScanJob {
        NewScanJob {
            tenant_id: "tenant-1".to_string(),
            domain: domain.to_string(),
            types: ScanType::ALL.into_iter().collect(),
            priority,
        }
    }

    #[test]
    fn test_enqueue_creates_pending_scan() {
        let db = Database::in_memory().unwrap();
        let job = db.enqueue_job(&new_job("example.com", 0), 3).unwrap();

        let scan = db.get_scan_result(&job.scan_id).unwrap().unwrap();
        assert_eq!(scan.status, ScanStatus::Pending);
        assert_eq!(scan.domain, "example.com");

        let record = db.get_job(&job.job_id).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.job.types.len(), 6);
    }

    #[test]
    fn test_claim_order_priority_then_age() {
        let db = Database::in_memory().unwrap();
        let low = db.enqueue_job(&new_job("a.com", 0), 3).unwrap();
        let high = db.enqueue_job(&new_job("b.com", 5), 3).unwrap();
        let low2 = db.enqueue_job(&new_job("c.com", 0), 3).unwrap();

        let order: Vec<String> = std::iter::from_fn(|| db.claim_next_job().unwrap())
            .map(|(job, attempt, _)| {
                assert_eq!(attempt, 1);
                job.job_id
            })
            .collect();
        assert_eq!(order, vec![high.job_id, low.job_id, low2.job_id]);
    }

    #[test]
    fn test_nack_requeues_until_max_attempts() {
        let db = Database::in_memory().unwrap();
        let job = db.enqueue_job(&new_job("example.com", 0), 2).unwrap();

        db.claim_next_job().unwrap().unwrap();
        assert_eq!(db.retry_or_fail_job(&job.job_id, "boom").unwrap(), JobStatus::Queued);

        let (_, attempt, max) = db.claim_next_job().unwrap().unwrap();
        assert_eq!((attempt, max), (2, 2));
        assert_eq!(db.retry_or_fail_job(&job.job_id, "boom again").unwrap(), JobStatus::Failed);
        assert!(db.claim_next_job().unwrap().is_none());

        let record = db.get_job(&job.job_id).unwrap().unwrap();
        assert_eq!(record.last_error.as_deref(), Some("boom again"));
    }

    #[test]
    fn test_progress_never_decreases() {
        let db = Database::in_memory().unwrap();
        let job = db.enqueue_job(&new_job("example.com", 0), 3).unwrap();
        db.update_job_progress(&job.job_id, 50).unwrap();
        db.update_job_progress(&job.job_id, 30).unwrap();
        assert_eq!(db.get_job(&job.job_id).unwrap().unwrap().progress, 50);
    }

    #[test]
    fn test_requeue_active_jobs() {
        let db = Database::in_memory().unwrap();
        db.enqueue_job(&new_job("example.com", 0), 3).unwrap();
        db.claim_next_job().unwrap().unwrap();
        assert!(db.claim_next_job().unwrap().is_none());

        assert_eq!(db.requeue_active_jobs().unwrap(), 1);
        let (_, attempt, _) = db.claim_next_job().unwrap().unwrap();
        assert_eq!(attempt, 2);
    }
}
