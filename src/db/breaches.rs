use chrono::Utc;

use super::Database;
use crate::errors::ReconError;
use crate::models::{BreachRecord, BreachSource, Severity};

fn parse_severity(s: &str) -> Severity {
    match s {
        "critical" => Severity::Critical,
        "high" => Severity::High,
        "medium" => Severity::Medium,
        _ => Severity::Low,
    }
}

impl Database {
    /// Insert or refresh a record keyed by (tenant, email, breach name).
    pub fn upsert_breach_record(&self, tenant_id: &str, record: &BreachRecord) -> Result<(), ReconError> {
        let data_classes = serde_json::to_string(&record.data_classes)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO breach_records (tenant_id, email, breach_name, breach_date, data_classes_json, source, severity, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(tenant_id, email, breach_name) DO UPDATE SET
                breach_date = excluded.breach_date,
                data_classes_json = excluded.data_classes_json,
                source = excluded.source,
                severity = excluded.severity,
                updated_at = excluded.updated_at",
            rusqlite::params![
                tenant_id,
                record.email.to_lowercase(),
                record.breach_name,
                record.breach_date,
                data_classes,
                record.source.as_str(),
                record.severity.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| ReconError::Database(format!("Failed to upsert breach record: {}", e)))?;
        Ok(())
    }

    pub fn breach_records_for_tenant(&self, tenant_id: &str) -> Result<Vec<BreachRecord>, ReconError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT email, breach_name, breach_date, data_classes_json, source, severity FROM breach_records WHERE tenant_id = ?1 ORDER BY email, breach_name",
            )
            .map_err(|e| ReconError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params![tenant_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| ReconError::Database(format!("Query error: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let (email, breach_name, breach_date, classes, source, severity) =
                row.map_err(|e| ReconError::Database(format!("Row error: {}", e)))?;
            records.push(BreachRecord {
                email,
                breach_name,
                breach_date,
                data_classes: serde_json::from_str(&classes)?,
                source: BreachSource::parse(&source).unwrap_or(BreachSource::Hibp),
                severity: parse_severity(&severity),
            });
        }
        Ok(records)
    }

    pub fn add_monitored_email(&self, tenant_id: &str, email: &str) -> Result<bool, ReconError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ReconError::InvalidTarget(format!("Not an email address: {}", email)));
        }
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "INSERT OR IGNORE INTO monitored_emails (tenant_id, email, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![tenant_id, email, Utc::now().to_rfc3339()],
            )
            .map_err(|e| ReconError::Database(format!("Failed to add monitored email: {}", e)))?;
        Ok(affected > 0)
    }

    pub fn monitored_emails(&self, tenant_id: &str) -> Result<Vec<String>, ReconError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT email FROM monitored_emails WHERE tenant_id = ?1 ORDER BY email")
            .map_err(|e| ReconError::Database(format!("Query failed: {}", e)))?;
        let rows = stmt
            .query_map(rusqlite::params![tenant_id], |row| row.get::<_, String>(0))
            .map_err(|e| ReconError::Database(format!("Query error: {}", e)))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| ReconError::Database(format!("Row error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, name: &str, severity: Severity) -> BreachRecord {
        BreachRecord {
            email: email.to_string(),
            breach_name: name.to_string(),
            breach_date: "2019-01-07".to_string(),
            data_classes: vec!["Email addresses".to_string()],
            source: BreachSource::Hibp,
            severity,
        }
    }

    #[test]
    fn test_upsert_never_duplicates() {
        let db = Database::in_memory().unwrap();
        db.upsert_breach_record("t1", &record("a@example.com", "Collection1", Severity::Medium)).unwrap();
        db.upsert_breach_record("t1", &record("A@example.com", "Collection1", Severity::Critical)).unwrap();

        let records = db.breach_records_for_tenant("t1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Critical);
    }

    #[test]
    fn test_records_scoped_by_tenant() {
        let db = Database::in_memory().unwrap();
        db.upsert_breach_record("t1", &record("a@example.com", "X", Severity::Low)).unwrap();
        db.upsert_breach_record("t2", &record("a@example.com", "X", Severity::Low)).unwrap();
        db.upsert_breach_record("t1", &record("a@example.com", "Y", Severity::Low)).unwrap();

        assert_eq!(db.breach_records_for_tenant("t1").unwrap().len(), 2);
        assert_eq!(db.breach_records_for_tenant("t2").unwrap().len(), 1);
    }

    #[test]
    fn test_monitored_emails() {
        let db = Database::in_memory().unwrap();
        assert!(db.add_monitored_email("t1", "Ops@Example.com").unwrap());
        assert!(!db.add_monitored_email("t1", "ops@example.com").unwrap());
        assert!(db.add_monitored_email("t1", "not-an-email").is_err());
        assert_eq!(db.monitored_emails("t1").unwrap(), vec!["ops@example.com".to_string()]);
        assert!(db.monitored_emails("t2").unwrap().is_empty());
    }
}
