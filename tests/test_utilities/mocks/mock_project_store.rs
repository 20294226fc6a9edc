use audit_checks::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory ProjectRepository whose state outlives the use case that owns it
#[derive(Default, Clone)]
pub struct MockProjectStore {
    projects: Vec<Project>,
    pub saved: Arc<Mutex<Vec<ScanResult>>>,
    pub thread_ids: Arc<Mutex<HashMap<String, ThreadId>>>,
}

impl MockProjectStore {
    pub fn new(projects: Vec<Project>) -> Self {
        let thread_ids = projects
            .iter()
            .filter_map(|p| p.thread_id.map(|id| (p.name.clone(), id)))
            .collect();
        Self {
            projects,
            saved: Arc::default(),
            thread_ids: Arc::new(Mutex::new(thread_ids)),
        }
    }

    pub fn thread_id(&self, project: &str) -> Option<ThreadId> {
        self.thread_ids.lock().unwrap().get(project).copied()
    }

    pub fn saved_for(&self, project: &str) -> Vec<ScanResult> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.project_name() == project)
            .cloned()
            .collect()
    }
}

impl ProjectRepository for MockProjectStore {
    fn load_projects(&self) -> Result<Vec<Project>> {
        let ids = self.thread_ids.lock().unwrap();
        Ok(self
            .projects
            .iter()
            .map(|p| {
                let mut p = p.clone();
                p.thread_id = ids.get(&p.name).copied();
                p
            })
            .collect())
    }

    fn save_audit_result(&self, result: &ScanResult) -> Result<()> {
        self.saved.lock().unwrap().push(result.clone());
        Ok(())
    }

    fn update_thread_id(&self, project_name: &str, thread_id: ThreadId) -> Result<()> {
        let mut ids = self.thread_ids.lock().unwrap();
        if thread_id.is_none() {
            ids.remove(project_name);
        } else {
            ids.insert(project_name.to_string(), thread_id);
        }
        Ok(())
    }
}
