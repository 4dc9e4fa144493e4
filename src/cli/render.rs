use console::style;

use crate::db::JobRecord;
use crate::models::{RiskAssessment, RiskCategory, ScanResult, ScanStatus, Severity, SubdomainStatus};
use crate::pipeline::ScanEvent;
use crate::utils::formatting::{format_duration, progress_bar};

/// One line per coordinator event, for the live view of `reconlens scan`.
pub fn render_event(event: &ScanEvent) -> Option<String> {
    match event {
        ScanEvent::StageStarted { stage } => Some(format!("  {} {}", style("⏳").yellow(), style(stage).yellow())),
        ScanEvent::StageCompleted { stage } => Some(format!("  {} {}", style("✓").green(), style(stage).green())),
        ScanEvent::StageFailed { stage, error } => Some(format!(
            "  {} {} ({})",
            style("✗").red(),
            style(stage).red(),
            style(error).red().dim(),
        )),
        ScanEvent::Progress { .. } => None,
    }
}

pub fn render_severity_badge(severity: Severity) -> String {
    let label = format!("{:<8}", severity.as_str().to_uppercase());
    match severity {
        Severity::Critical => style(label).red().bold().to_string(),
        Severity::High => style(label).red().to_string(),
        Severity::Medium => style(label).yellow().to_string(),
        Severity::Low => style(label).blue().to_string(),
    }
}

fn render_status(status: ScanStatus) -> String {
    match status {
        ScanStatus::Completed => style(status).green().to_string(),
        ScanStatus::Failed => style(status).red().to_string(),
        ScanStatus::Running => style(status).cyan().to_string(),
        ScanStatus::Pending => style(status).dim().to_string(),
    }
}

pub fn render_scan(scan: &ScanResult) -> String {
    let mut out = vec![format!(
        "\n{} {} [{}]",
        style("Scan").bold(),
        style(&scan.id).cyan(),
        render_status(scan.status),
    )];
    out.push(format!("  Domain:     {}", style(&scan.domain).white().bold()));
    if let Some(done) = scan.completed_at {
        let ms = (done - scan.started_at).num_milliseconds().max(0) as u64;
        out.push(format!("  Duration:   {}", format_duration(ms)));
    }
    if let Some(error) = &scan.error {
        out.push(format!("  Error:      {}", style(error).red()));
    }

    if !scan.ports.is_empty() {
        out.push(format!("\n{}", style("Open ports").bold()));
        for p in &scan.ports {
            let detail = match (&p.product, &p.version) {
                (Some(product), Some(version)) => format!(" {} {}", product, version),
                (Some(product), None) => format!(" {}", product),
                _ => String::new(),
            };
            out.push(format!("  {:>5}/tcp  {}{}", p.port, p.service, style(detail).dim()));
        }
    }

    if let Some(tls) = &scan.tls_finding {
        out.push(format!("\n{}", style("TLS").bold()));
        if let Some(reason) = &tls.handshake_error {
            out.push(format!("  {} ({})", style("Handshake refused").red(), style(reason).dim()));
        } else if !tls.has_certificate() && tls.weak_ciphers.is_empty() {
            out.push(format!("  {}", style("No TLS handshake possible").dim()));
        } else if tls.has_certificate() {
            let validity = if tls.is_valid { style("valid").green() } else { style("invalid").red() };
            out.push(format!("  {} | issuer {} | expires in {} days", validity, tls.issuer, tls.days_until_expiry));
        }
        for cipher in &tls.weak_ciphers {
            out.push(format!("  weak cipher: {}", style(cipher).yellow()));
        }
    }

    let active: Vec<_> = scan.subdomains.iter().filter(|s| s.status == SubdomainStatus::Active).collect();
    if !scan.subdomains.is_empty() {
        out.push(format!("\n{} ({} of {} resolve)", style("Subdomains").bold(), active.len(), scan.subdomains.len()));
        for s in active {
            out.push(format!("  {} {}", s.subdomain, style(s.ip.as_deref().unwrap_or("")).dim()));
        }
    }

    if !scan.discovered_paths.is_empty() {
        out.push(format!("\n{}", style("Discovered paths").bold()));
        for p in &scan.discovered_paths {
            out.push(format!("  {} {}", p.path, style(&p.kind).dim()));
        }
    }

    if !scan.outdated_software.is_empty() {
        out.push(format!("\n{}", style("Outdated software").bold()));
        for o in &scan.outdated_software {
            out.push(format!(
                "  {} {} {} (minimum {})",
                render_severity_badge(o.severity),
                o.product,
                o.version,
                o.minimum_version
            ));
        }
    }

    out.join("\n")
}

pub fn render_assessment(assessment: &RiskAssessment) -> String {
    let score = match assessment.category {
        RiskCategory::Low => style(assessment.score).green(),
        RiskCategory::Medium => style(assessment.score).yellow(),
        RiskCategory::High | RiskCategory::Critical => style(assessment.score).red().bold(),
    };
    let mut out = vec![format!(
        "\n{} {}/100 ({} risk)",
        style("Risk score").bold(),
        score,
        assessment.category
    )];

    let mut findings: Vec<_> = assessment.findings.iter().collect();
    findings.sort_by_key(|f| f.severity.rank());
    for f in findings {
        out.push(format!("  {} {}", render_severity_badge(f.severity), f.title));
        out.push(format!("           {}", style(&f.recommendation).dim()));
    }
    out.join("\n")
}

pub fn render_jobs(jobs: &[JobRecord]) -> String {
    if jobs.is_empty() {
        return style("No jobs queued").dim().to_string();
    }
    jobs.iter()
        .map(|r| {
            let mut line = format!(
                "{}  {:<9} {} {}  attempt {}/{}",
                style(&r.job.job_id).cyan(),
                r.status,
                progress_bar(r.progress, 20),
                r.job.domain,
                r.attempts,
                r.max_attempts,
            );
            if let Some(err) = &r.last_error {
                line.push_str(&format!("  {}", style(err).red().dim()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
