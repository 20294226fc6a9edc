/// Mock implementations for testing
mod mock_channel;
mod mock_progress_reporter;
mod mock_project_store;
mod mock_scanner;

pub use mock_channel::{MockEmailChannel, MockForumChannel};
pub use mock_progress_reporter::MockProgressReporter;
pub use mock_project_store::MockProjectStore;
pub use mock_scanner::MockScanner;
