use crate::adapters::outbound::formatters::{JsonReportFormatter, MarkdownReportFormatter};
use crate::application::dto::ReportFormat;
use crate::ports::outbound::ReportFormatter;

/// Factory for creating report formatters
///
/// Keeps the mapping from a configured format to its adapter in the
/// application layer, so the use case only sees the `ReportFormatter` port.
pub struct FormatterFactory;

impl FormatterFactory {
    /// Creates a formatter instance for the specified report format
    ///
    /// # Examples
    /// ```
    /// use audit_checks::application::dto::ReportFormat;
    /// use audit_checks::application::factories::FormatterFactory;
    ///
    /// let formatter = FormatterFactory::create(ReportFormat::Json);
    /// assert_eq!(formatter.extension(), "json");
    /// ```
    pub fn create(format: ReportFormat) -> Box<dyn ReportFormatter> {
        match format {
            ReportFormat::Json => Box::new(JsonReportFormatter::new()),
            ReportFormat::Markdown => Box::new(MarkdownReportFormatter::new()),
        }
    }

    /// Creates one formatter per distinct format, keeping first-seen order.
    pub fn create_all(formats: &[ReportFormat]) -> Vec<Box<dyn ReportFormatter>> {
        let mut seen = Vec::new();
        for format in formats {
            if !seen.contains(format) {
                seen.push(*format);
            }
        }
        seen.into_iter().map(Self::create).collect()
    }
}
