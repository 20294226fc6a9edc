use crate::auditing::domain::{Project, ScanResult, ScannerKind, SeverityCounts, ThreadId};
use crate::ports::outbound::ProjectRepository;
use crate::shared::security::{prepare_output_dir, validate_regular_file, MAX_CONFIG_FILE_SIZE};
use crate::shared::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use uuid::Uuid;

const STATE_FILE: &str = "state.json";
const HISTORY_FILE: &str = "audit-history.jsonl";

/// Persisted run state; only thread ids survive between runs.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    thread_ids: BTreeMap<String, ThreadId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// One line of the audit history.
#[derive(Debug, Serialize)]
struct HistoryRecord<'a> {
    id: Uuid,
    recorded_at: DateTime<Utc>,
    project: &'a str,
    scanner: ScannerKind,
    total: usize,
    counts: SeverityCounts,
    result: &'a ScanResult,
}

/// FileProjectStore adapter backing the project repository with plain files
///
/// Projects come from the configuration file. Thread ids live in
/// `state_dir/state.json`, rewritten atomically on every change, and each
/// successful scan is appended to `state_dir/audit-history.jsonl`.
pub struct FileProjectStore {
    projects: Vec<Project>,
    state_dir: PathBuf,
    thread_ids: DashMap<String, ThreadId>,
    /// Serializes file writes so snapshots and history lines never interleave
    write_lock: Mutex<()>,
}

impl FileProjectStore {
    /// Opens the store, creating `state_dir` and loading any saved state.
    pub fn open(state_dir: impl Into<PathBuf>, projects: Vec<Project>) -> Result<Self> {
        let state_dir = state_dir.into();
        prepare_output_dir(&state_dir)?;

        let thread_ids = DashMap::new();
        for (name, id) in Self::read_state(&state_dir.join(STATE_FILE))?.thread_ids {
            if !id.is_none() {
                thread_ids.insert(name, id);
            }
        }
        tracing::debug!(
            state_dir = %state_dir.display(),
            threads = thread_ids.len(),
            "project store opened"
        );

        Ok(Self {
            projects,
            state_dir,
            thread_ids,
            write_lock: Mutex::new(()),
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.state_dir.join(HISTORY_FILE)
    }

    pub fn thread_id(&self, project_name: &str) -> Option<ThreadId> {
        self.thread_ids.get(project_name).map(|entry| *entry.value())
    }

    fn read_state(path: &Path) -> Result<StateFile> {
        if fs::symlink_metadata(path).is_err() {
            return Ok(StateFile::default());
        }
        validate_regular_file(path, "state file", MAX_CONFIG_FILE_SIZE)?;

        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read state file {}: {}", path.display(), e))?;
        serde_json::from_str(&content).map_err(|e| {
            anyhow::anyhow!(
                "Failed to parse state file {}: {}\n\n💡 Hint: Delete the file to reset saved thread ids",
                path.display(),
                e
            )
        })
    }

    fn write_state(&self) -> Result<()> {
        let state = StateFile {
            thread_ids: self
                .thread_ids
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            updated_at: Some(Utc::now()),
        };
        let json = serde_json::to_string_pretty(&state)?;

        let mut temp = NamedTempFile::new_in(&self.state_dir)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(self.state_path())
            .map_err(|e| anyhow::anyhow!("Failed to replace state file: {}", e.error))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("project store lock poisoned"))
    }
}

impl ProjectRepository for FileProjectStore {
    fn load_projects(&self) -> Result<Vec<Project>> {
        Ok(self
            .projects
            .iter()
            .map(|project| {
                let mut project = project.clone();
                project.thread_id = self.thread_id(&project.name);
                project
            })
            .collect())
    }

    fn save_audit_result(&self, result: &ScanResult) -> Result<()> {
        let record = HistoryRecord {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            project: result.project_name(),
            scanner: result.scanner(),
            total: result.counts().total(),
            counts: result.counts(),
            result,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.lock()?;
        let path = self.history_path();
        if let Ok(metadata) = fs::symlink_metadata(&path) {
            if metadata.is_symlink() {
                anyhow::bail!(
                    "Security: {} is a symbolic link. For security reasons, writing to symbolic links is not allowed.",
                    path.display()
                );
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn update_thread_id(&self, project_name: &str, thread_id: ThreadId) -> Result<()> {
        let _guard = self.lock()?;
        if thread_id.is_none() {
            self.thread_ids.remove(project_name);
        } else {
            self.thread_ids.insert(project_name.to_string(), thread_id);
        }
        self.write_state()?;
        tracing::info!(project = project_name, thread = %thread_id, "thread id saved");
        Ok(())
    }
}
