use console::style;

use super::commands::{EnqueueArgs, WatchEmailArgs};
use crate::errors::ReconError;
use crate::models::{normalize_domain, NewScanJob, ScanType};
use crate::queue::{SqliteQueue, WorkQueue};

pub async fn handle_enqueue(args: EnqueueArgs) -> Result<(), ReconError> {
    let config = super::load_config(&args.store).await?;
    let db = super::open_database(&args.store, &config)?;
    let queue = SqliteQueue::new(db, config.worker.max_attempts);

    let job = queue
        .enqueue(NewScanJob {
            tenant_id: args.tenant,
            domain: normalize_domain(&args.domain)?,
            types: ScanType::parse_list(&args.types)?,
            priority: args.priority,
        })
        .await?;

    println!("{} Queued {}", style("✓").green(), style(&job.domain).white().bold());
    println!("  job:  {}", style(&job.job_id).cyan());
    println!("  scan: {}", style(&job.scan_id).cyan());
    Ok(())
}

pub async fn handle_watch_email(args: WatchEmailArgs) -> Result<(), ReconError> {
    let config = super::load_config(&args.store).await?;
    let db = super::open_database(&args.store, &config)?;

    if db.add_monitored_email(&args.tenant, &args.email)? {
        println!("{} Watching {} for tenant {}", style("✓").green(), args.email.to_lowercase(), args.tenant);
    } else {
        println!("{} already watched for tenant {}", args.email.to_lowercase(), args.tenant);
    }
    Ok(())
}
