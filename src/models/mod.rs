pub mod breach;
pub mod finding;
pub mod intel;
pub mod job;
pub mod scan_result;

pub use breach::*;
pub use finding::*;
pub use intel::*;
pub use job::*;
pub use scan_result::*;
