/// Filesystem adapters for report artifacts and persisted run state
mod project_store;
mod report_writer;

pub use project_store::FileProjectStore;
pub use report_writer::ReportDirectoryWriter;
