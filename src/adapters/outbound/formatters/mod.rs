/// Formatter adapters for the on-disk report artifacts
mod json_formatter;
mod markdown_formatter;

pub use json_formatter::JsonReportFormatter;
pub use markdown_formatter::MarkdownReportFormatter;
