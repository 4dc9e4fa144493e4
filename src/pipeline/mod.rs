pub mod coordinator;
pub mod notify;
pub mod state;
pub mod worker;

pub use coordinator::ScanCoordinator;
pub use notify::{CompletionNotice, CompletionNotifier, LogNotifier, WebhookNotifier};
pub use state::{milestones, ScanEvent, ScanOutcome, ScanReport};
pub use worker::JobWorker;
