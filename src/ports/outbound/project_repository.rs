use crate::auditing::domain::{Project, ScanResult, ThreadId};
use crate::shared::Result;

/// ProjectRepository port for project records and audit history
///
/// The core only calls these three operations and never formats storage
/// queries itself. Implementations are shared across concurrent project
/// workers, hence `Send + Sync`.
pub trait ProjectRepository: Send + Sync {
    /// Loads every configured project with its persisted thread id.
    fn load_projects(&self) -> Result<Vec<Project>>;

    /// Appends one successful scan to the history.
    fn save_audit_result(&self, result: &ScanResult) -> Result<()>;

    /// Persists the thread id for a project. `ThreadId::NONE` clears it.
    fn update_thread_id(&self, project_name: &str, thread_id: ThreadId) -> Result<()>;
}
