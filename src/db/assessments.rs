use chrono::Utc;

use super::Database;
use crate::errors::ReconError;
use crate::models::{RiskAssessment, RiskCategory};

/// A persisted assessment row. Rows are only ever inserted.
#[derive(Debug, Clone)]
pub struct StoredAssessment {
    pub id: String,
    pub scan_id: String,
    pub tenant_id: String,
    pub created_at: String,
    pub assessment: RiskAssessment,
}

fn parse_category(s: &str) -> RiskCategory {
    match s {
        "Low" => RiskCategory::Low,
        "Medium" => RiskCategory::Medium,
        "High" => RiskCategory::High,
        _ => RiskCategory::Critical,
    }
}

impl Database {
    pub fn insert_risk_assessment(
        &self,
        scan_id: &str,
        tenant_id: &str,
        assessment: &RiskAssessment,
    ) -> Result<String, ReconError> {
        let id = uuid::Uuid::new_v4().to_string();
        let findings = serde_json::to_string(&assessment.findings)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO risk_assessments (id, scan_id, tenant_id, score, category, findings_json, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                id,
                scan_id,
                tenant_id,
                assessment.score as i64,
                assessment.category.as_str(),
                findings,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| ReconError::Database(format!("Failed to insert assessment: {}", e)))?;
        Ok(id)
    }

    /// Assessment history for a scan, oldest first.
    pub fn list_risk_assessments(&self, scan_id: &str) -> Result<Vec<StoredAssessment>, ReconError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, scan_id, tenant_id, score, category, findings_json, created_at FROM risk_assessments WHERE scan_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )
            .map_err(|e| ReconError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params![scan_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(|e| ReconError::Database(format!("Query error: {}", e)))?;

        let mut out = Vec::new();
        for row in rows {
            let (id, scan_id, tenant_id, score, category, findings, created_at) =
                row.map_err(|e| ReconError::Database(format!("Row error: {}", e)))?;
            out.push(StoredAssessment {
                id,
                scan_id,
                tenant_id,
                created_at,
                assessment: RiskAssessment {
                    score: score.clamp(0, 100) as u8,
                    category: parse_category(&category),
                    findings: serde_json::from_str(&findings)?,
                },
            });
        }
        Ok(out)
    }

    pub fn latest_risk_assessment(&self, scan_id: &str) -> Result<Option<StoredAssessment>, ReconError> {
        Ok(self.list_risk_assessments(scan_id)?.pop())
    }
}
