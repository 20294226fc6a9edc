/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define what the audit core needs from the outside world:
/// scanners, project storage, notification channels, report rendering and
/// console feedback.
pub mod channel;
pub mod progress_reporter;
pub mod project_repository;
pub mod report_formatter;
pub mod report_sink;
pub mod scanner;

pub use channel::{PlainChannel, ThreadedChannel};
pub use progress_reporter::ProgressReporter;
pub use project_repository::ProjectRepository;
pub use report_formatter::ReportFormatter;
pub use report_sink::ReportSink;
pub use scanner::Scanner;
