pub mod engine;
pub mod outdated;

pub use engine::{assess, findings, score, severity_weight, vulnerability_finding};
pub use outdated::detect_outdated;
