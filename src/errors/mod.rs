pub mod types;
pub mod classification;
pub mod retry;

pub use types::{ProviderError, ReconError};
pub use classification::{Classify, ErrorClassification};
pub use retry::{RetryPolicy, with_retry};
