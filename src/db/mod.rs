pub mod assessments;
pub mod breaches;
pub mod cache;
pub mod connection;
pub mod jobs;
pub mod schema;
pub mod scans;

pub use assessments::StoredAssessment;
pub use connection::Database;
pub use jobs::JobRecord;
