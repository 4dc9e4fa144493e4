use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;
use tracing::info;

use super::commands::ScanArgs;
use super::render::{render_assessment, render_event, render_scan};
use crate::errors::ReconError;
use crate::models::{normalize_domain, ScanJob, ScanResult, ScanType};
use crate::pipeline::{ScanCoordinator, ScanOutcome};

pub async fn handle_scan(args: ScanArgs) -> Result<(), ReconError> {
    let domain = normalize_domain(&args.domain)?;
    let types = ScanType::parse_list(&args.types)?;
    let config = super::load_config(&args.store).await?;
    let db = super::open_database(&args.store, &config)?;

    let job = ScanJob {
        job_id: uuid::Uuid::new_v4().to_string(),
        tenant_id: args.tenant.clone(),
        domain: domain.clone(),
        types,
        priority: 0,
        scan_id: uuid::Uuid::new_v4().to_string(),
    };
    db.create_scan(&ScanResult::pending(&job.scan_id, &job.tenant_id, &job.domain))?;
    info!(scan_id = %job.scan_id, domain = %domain, "Direct scan");

    let coordinator = Arc::new(ScanCoordinator::from_config(&config, db.clone())?);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let quiet = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if quiet {
                continue;
            }
            if let Some(line) = render_event(&event) {
                eprintln!("{}", line);
            }
        }
    });

    if !args.json {
        eprintln!(
            "\n{} Scanning {} ({})",
            style("▶").green().bold(),
            style(&domain).white().bold(),
            style(&job.scan_id).cyan()
        );
    }
    let outcome = coordinator.run(&job, Some(&tx)).await;
    drop(tx);
    let _ = printer.await;

    match outcome? {
        ScanOutcome::Completed(report) => {
            if args.json {
                let out = serde_json::json!({ "scan": report.scan, "assessment": report.assessment });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", render_scan(&report.scan));
                if let Some(assessment) = &report.assessment {
                    println!("{}", render_assessment(assessment));
                }
            }
            Ok(())
        }
        ScanOutcome::Failed(message) => Err(ReconError::Internal(format!("Scan {} failed: {}", job.scan_id, message))),
        ScanOutcome::Skipped(status) => Err(ReconError::Internal(format!("Scan {} was already {}", job.scan_id, status))),
    }
}
