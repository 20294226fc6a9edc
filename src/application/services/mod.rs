/// Application services coordinating ports on behalf of the run use case
mod dispatcher;
mod scan_job_runner;
mod scanner_registry;
mod topic_directory;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use scan_job_runner::{JobFailure, RetryPolicy, ScanJobRunner};
pub use scanner_registry::ScannerRegistry;
pub use topic_directory::{Delivery, TopicDirectory};
