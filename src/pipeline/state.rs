use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{RiskAssessment, ScanResult, ScanStatus, ScanType};

/// Progress reported once a scan has been picked up.
pub const START_PROGRESS: u8 = 10;
pub const FINISHED_PROGRESS: u8 = 100;

/// Progress reached when `stage` finishes. Risk calculation has no milestone of its own.
pub fn stage_milestone(stage: ScanType) -> Option<u8> {
    match stage {
        ScanType::PortScan => Some(30),
        ScanType::SslCheck => Some(50),
        ScanType::SubdomainEnum => Some(70),
        ScanType::DirectoryScan => Some(85),
        ScanType::BreachCheck => Some(92),
        ScanType::RiskCalc => None,
    }
}

/// Milestones a scan with these stages will report, in order.
pub fn milestones(types: &BTreeSet<ScanType>) -> Vec<u8> {
    let mut out = vec![START_PROGRESS];
    out.extend(
        ScanType::ALL
            .iter()
            .filter(|t| types.contains(t))
            .filter_map(|t| stage_milestone(*t)),
    );
    out.push(FINISHED_PROGRESS);
    out
}

/// Streamed from the coordinator while a scan runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    StageStarted { stage: ScanType },
    StageCompleted { stage: ScanType },
    StageFailed { stage: ScanType, error: String },
    Progress { percent: u8 },
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub scan: ScanResult,
    pub assessment: Option<RiskAssessment>,
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Completed(Box<ScanReport>),
    /// The scan was marked `failed` with this error text.
    Failed(String),
    /// The scan was already terminal when the job arrived.
    Skipped(ScanStatus),
}

impl ScanOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }
}
