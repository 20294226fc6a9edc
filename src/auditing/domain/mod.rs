pub mod combined_report;
pub mod project;
pub mod run_outcome;
pub mod scan_result;
pub mod severity;
pub mod vulnerability;

pub use combined_report::{CombinedReport, ScannerBreakdown};
pub use project::{
    ChannelKind, NotificationTargets, Project, ScannerKind, ScannerSelector, ThreadId,
};
pub use run_outcome::{ErrorOrigin, ProjectSummary, RunError, RunOutcome, RunSummary};
pub use scan_result::ScanResult;
pub use severity::{Severity, SeverityCounts};
pub use vulnerability::Vulnerability;
