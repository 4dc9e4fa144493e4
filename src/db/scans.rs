use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use super::Database;
use crate::errors::ReconError;
use crate::models::{ScanResult, ScanStatus};

const SCAN_COLUMNS: &str = "id, tenant_id, domain, status, ports_json, tls_json, subdomains_json, paths_json, outdated_json, vulnerabilities_json, error_message, started_at, completed_at";

/// Raw column values; JSON decoding happens outside the rusqlite row callback.
struct ScanRow {
    id: String,
    tenant_id: String,
    domain: String,
    status: String,
    ports: String,
    tls: Option<String>,
    subdomains: String,
    paths: String,
    outdated: String,
    vulnerabilities: String,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl ScanRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            domain: row.get(2)?,
            status: row.get(3)?,
            ports: row.get(4)?,
            tls: row.get(5)?,
            subdomains: row.get(6)?,
            paths: row.get(7)?,
            outdated: row.get(8)?,
            vulnerabilities: row.get(9)?,
            error: row.get(10)?,
            started_at: row.get(11)?,
            completed_at: row.get(12)?,
        })
    }

    fn into_scan(self) -> Result<ScanResult, ReconError> {
        let status = ScanStatus::parse(&self.status)
            .ok_or_else(|| ReconError::Database(format!("Unknown scan status '{}'", self.status)))?;
        Ok(ScanResult {
            id: self.id,
            tenant_id: self.tenant_id,
            domain: self.domain,
            status,
            ports: serde_json::from_str(&self.ports)?,
            tls_finding: self.tls.as_deref().map(serde_json::from_str).transpose()?,
            subdomains: serde_json::from_str(&self.subdomains)?,
            discovered_paths: serde_json::from_str(&self.paths)?,
            outdated_software: serde_json::from_str(&self.outdated)?,
            vulnerabilities: serde_json::from_str(&self.vulnerabilities)?,
            started_at: parse_timestamp(&self.started_at)?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            error: self.error,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ReconError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ReconError::Database(format!("Bad timestamp '{}': {}", s, e)))
}

impl Database {
    pub fn create_scan(&self, scan: &ScanResult) -> Result<(), ReconError> {
        let conn = self.lock()?;
        insert_scan(&conn, scan)
    }

    pub fn get_scan_result(&self, id: &str) -> Result<Option<ScanResult>, ReconError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM scans WHERE id = ?1", SCAN_COLUMNS),
                rusqlite::params![id],
                ScanRow::from_row,
            )
            .optional()
            .map_err(|e| ReconError::Database(format!("Query error: {}", e)))?;
        row.map(ScanRow::into_scan).transpose()
    }

    /// Move a scan from `pending` to `running`. Returns the status it had before the call;
    /// only `Pending` means a transition happened.
    pub fn start_scan(&self, id: &str) -> Result<ScanStatus, ReconError> {
        let conn = self.lock()?;
        let current: Option<String> = conn
            .query_row("SELECT status FROM scans WHERE id = ?1", rusqlite::params![id], |r| r.get(0))
            .optional()
            .map_err(|e| ReconError::Database(format!("Query error: {}", e)))?;
        let current = current.ok_or_else(|| ReconError::Database(format!("Scan {} not found", id)))?;
        let status = ScanStatus::parse(&current)
            .ok_or_else(|| ReconError::Database(format!("Unknown scan status '{}'", current)))?;

        if status == ScanStatus::Pending {
            conn.execute(
                "UPDATE scans SET status = 'running', started_at = ?2 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id, Utc::now().to_rfc3339()],
            )
            .map_err(|e| ReconError::Database(format!("Update failed: {}", e)))?;
        }
        Ok(status)
    }

    /// Persist partial stage output. Only applies while the scan is `running`.
    pub fn save_scan_progress(&self, scan: &ScanResult) -> Result<bool, ReconError> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "UPDATE scans SET ports_json = ?2, tls_json = ?3, subdomains_json = ?4, paths_json = ?5, outdated_json = ?6, vulnerabilities_json = ?7 WHERE id = ?1 AND status = 'running'",
                rusqlite::params![
                    scan.id,
                    serde_json::to_string(&scan.ports)?,
                    scan.tls_finding.as_ref().map(serde_json::to_string).transpose()?,
                    serde_json::to_string(&scan.subdomains)?,
                    serde_json::to_string(&scan.discovered_paths)?,
                    serde_json::to_string(&scan.outdated_software)?,
                    serde_json::to_string(&scan.vulnerabilities)?,
                ],
            )
            .map_err(|e| ReconError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    /// Final `running → completed` write. Returns false if the scan was not running.
    pub fn complete_scan(&self, scan: &ScanResult) -> Result<bool, ReconError> {
        if !self.save_scan_progress(scan)? {
            return Ok(false);
        }
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "UPDATE scans SET status = 'completed', completed_at = ?2 WHERE id = ?1 AND status = 'running'",
                rusqlite::params![scan.id, Utc::now().to_rfc3339()],
            )
            .map_err(|e| ReconError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    /// Final `running → failed` write with the captured error text.
    pub fn fail_scan(&self, id: &str, error: &str) -> Result<bool, ReconError> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "UPDATE scans SET status = 'failed', error_message = ?2, completed_at = ?3 WHERE id = ?1 AND status = 'running'",
                rusqlite::params![id, error, Utc::now().to_rfc3339()],
            )
            .map_err(|e| ReconError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    pub fn list_scans(&self, tenant_id: Option<&str>, limit: usize, offset: usize) -> Result<Vec<ScanResult>, ReconError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM scans WHERE (?1 IS NULL OR tenant_id = ?1) ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
                SCAN_COLUMNS
            ))
            .map_err(|e| ReconError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params![tenant_id, limit as i64, offset as i64], ScanRow::from_row)
            .map_err(|e| ReconError::Database(format!("Query error: {}", e)))?;

        let mut scans = Vec::new();
        for row in rows {
            let row = row.map_err(|e| ReconError::Database(format!("Row error: {}", e)))?;
            scans.push(row.into_scan()?);
        }
        Ok(scans)
    }
}

pub(crate) fn insert_scan(conn: &rusqlite::Connection, scan: &ScanResult) -> Result<(), ReconError> {
    conn.execute(
        "INSERT INTO scans (id, tenant_id, domain, status, created_at, started_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            scan.id,
            scan.tenant_id,
            scan.domain,
            scan.status.as_str(),
            Utc::now().to_rfc3339(),
            scan.started_at.to_rfc3339(),
        ],
    )
    .map_err(|e| ReconError::Database(format!("Failed to create scan: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PortFinding, TlsFinding};

    fn pending(id: &str) -> ScanResult {
        ScanResult::pending(id, "tenant-1", "example.com")
    }

    #[test]
    fn test_db_create_and_get_scan() {
        let db = Database::in_memory().unwrap();
        db.create_scan(&pending("scan-1")).unwrap();

        let scan = db.get_scan_result("scan-1").unwrap().unwrap();
        assert_eq!(scan.domain, "example.com");
        assert_eq!(scan.status, ScanStatus::Pending);
        assert!(scan.ports.is_empty());
        assert!(scan.tls_finding.is_none());
    }

    #[test]
    fn test_db_get_nonexistent_scan() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_scan_result("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_progress_requires_running() {
        let db = Database::in_memory().unwrap();
        let mut scan = pending("scan-2");
        db.create_scan(&scan).unwrap();

        scan.ports.push(PortFinding::open(443, "https"));
        assert!(!db.save_scan_progress(&scan).unwrap());

        assert_eq!(db.start_scan("scan-2").unwrap(), ScanStatus::Pending);
        assert!(db.save_scan_progress(&scan).unwrap());

        let stored = db.get_scan_result("scan-2").unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Running);
        assert_eq!(stored.ports.len(), 1);
    }

    #[test]
    fn test_terminal_write_is_final() {
        let db = Database::in_memory().unwrap();
        let mut scan = pending("scan-3");
        db.create_scan(&scan).unwrap();
        db.start_scan("scan-3").unwrap();

        scan.tls_finding = Some(TlsFinding::unreachable("example.com"));
        assert!(db.complete_scan(&scan).unwrap());
        assert!(!db.fail_scan("scan-3", "late failure").unwrap());
        assert!(!db.save_scan_progress(&scan).unwrap());

        let stored = db.get_scan_result("scan-3").unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Completed);
        assert!(stored.completed_at.is_some());
        assert!(stored.error.is_none());
        assert_eq!(stored.tls_finding.unwrap().issuer, "Unknown");
    }

    #[test]
    fn test_fail_records_error() {
        let db = Database::in_memory().unwrap();
        db.create_scan(&pending("scan-4")).unwrap();
        assert!(!db.fail_scan("scan-4", "not started").unwrap());

        db.start_scan("scan-4").unwrap();
        assert!(db.fail_scan("scan-4", "resolver exploded").unwrap());

        let stored = db.get_scan_result("scan-4").unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("resolver exploded"));
    }

    #[test]
    fn test_start_reports_previous_status() {
        let db = Database::in_memory().unwrap();
        db.create_scan(&pending("scan-5")).unwrap();
        assert_eq!(db.start_scan("scan-5").unwrap(), ScanStatus::Pending);
        assert_eq!(db.start_scan("scan-5").unwrap(), ScanStatus::Running);
        assert!(db.start_scan("missing").is_err());
    }

    #[test]
    fn test_list_scans_by_tenant() {
        let db = Database::in_memory().unwrap();
        db.create_scan(&pending("a")).unwrap();
        db.create_scan(&ScanResult::pending("b", "tenant-2", "other.org")).unwrap();

        assert_eq!(db.list_scans(None, 10, 0).unwrap().len(), 2);
        let only = db.list_scans(Some("tenant-2"), 10, 0).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].domain, "other.org");
    }
}
