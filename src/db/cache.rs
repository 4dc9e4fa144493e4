use chrono::Utc;
use rusqlite::OptionalExtension;

use super::Database;
use crate::errors::ReconError;
use crate::models::IntelligenceData;

impl Database {
    /// Cached intelligence for a domain, if present and not expired.
    pub fn cache_get(&self, domain: &str) -> Result<Option<IntelligenceData>, ReconError> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data_json FROM intel_cache WHERE domain = ?1 AND expires_at > ?2",
                rusqlite::params![domain, Utc::now().timestamp()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ReconError::Database(format!("Cache read failed: {}", e)))?;
        data.map(|d| serde_json::from_str(&d).map_err(ReconError::from)).transpose()
    }

    pub fn cache_put(&self, domain: &str, data: &IntelligenceData, ttl_secs: i64) -> Result<(), ReconError> {
        let json = serde_json::to_string(data)?;
        let conn = self.lock()?;
        // Last write wins between concurrent scans of the same domain
        conn.execute(
            "INSERT OR REPLACE INTO intel_cache (domain, data_json, expires_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![domain, json, Utc::now().timestamp() + ttl_secs],
        )
        .map_err(|e| ReconError::Database(format!("Cache write failed: {}", e)))?;
        Ok(())
    }
}
