/// RunRequest - Options for one audit run
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Audit only this project (the run fails if it does not exist)
    pub target: Option<String>,
    /// Maximum number of projects scanned at the same time
    pub max_concurrency: usize,
    /// Log intended notifications instead of sending them
    pub dry_run: bool,
    /// Produce reports but send no notifications at all
    pub report_only: bool,
}

impl RunRequest {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            target: None,
            max_concurrency: max_concurrency.max(1),
            dry_run: false,
            report_only: false,
        }
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_report_only(mut self, report_only: bool) -> Self {
        self.report_only = report_only;
        self
    }
}
