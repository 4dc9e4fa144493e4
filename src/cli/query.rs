use super::commands::QueryArgs;
use super::render::{render_assessment, render_jobs, render_scan};
use crate::errors::ReconError;

pub async fn handle_query(args: QueryArgs) -> Result<(), ReconError> {
    let config = super::load_config(&args.store).await?;
    let db = super::open_database(&args.store, &config)?;

    if args.jobs {
        let jobs = db.list_jobs(args.limit)?;
        if args.json {
            let rows: Vec<_> = jobs
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "job": r.job,
                        "status": r.status,
                        "attempts": r.attempts,
                        "maxAttempts": r.max_attempts,
                        "progress": r.progress,
                        "lastError": r.last_error,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            println!("{}", render_jobs(&jobs));
        }
        return Ok(());
    }

    let scan_id = args
        .scan_id
        .as_deref()
        .ok_or_else(|| ReconError::Config("A scan ID is required".into()))?;
    let scan = db
        .get_scan_result(scan_id)?
        .ok_or_else(|| ReconError::InvalidTarget(format!("No scan with id {}", scan_id)))?;
    let assessment = db.latest_risk_assessment(scan_id)?.map(|s| s.assessment);

    if args.json {
        let out = serde_json::json!({ "scan": scan, "assessment": assessment });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", render_scan(&scan));
        if let Some(assessment) = &assessment {
            println!("{}", render_assessment(assessment));
        }
    }
    Ok(())
}
