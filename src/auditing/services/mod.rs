mod alert_message;
mod report_aggregator;
mod vulnerability_filter;

pub use alert_message::{AlertMessageBuilder, NotificationMessage};
pub use report_aggregator::ReportAggregator;
pub use vulnerability_filter::VulnerabilityFilter;
