/// Data Transfer Objects for application layer
///
/// DTOs carry run options from the CLI and config into the use case,
/// keeping the domain layer isolated from both.
mod report_format;
mod run_request;

pub use report_format::ReportFormat;
pub use run_request::RunRequest;
