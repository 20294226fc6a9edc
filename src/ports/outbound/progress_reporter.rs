/// ProgressReporter port for user feedback during a run
///
/// This port abstracts progress reporting (e.g., a progress bar on stderr).
/// It is called from concurrent project workers, so implementations must be
/// `Send + Sync`.
pub trait ProgressReporter: Send + Sync {
    /// Announces how many projects are about to be audited
    fn begin(&self, total_projects: usize);

    /// Marks one project as finished
    ///
    /// # Arguments
    /// * `project` - Project name
    /// * `vulnerabilities` - Vulnerabilities retained after filtering
    fn project_finished(&self, project: &str, vulnerabilities: usize);

    /// Reports a progress message
    fn report(&self, message: &str);

    /// Reports an error or warning message
    fn report_error(&self, message: &str);

    /// Reports completion of the run
    fn report_completion(&self, message: &str);
}
