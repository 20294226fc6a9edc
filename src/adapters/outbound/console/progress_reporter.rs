use crate::ports::outbound::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// StderrProgressReporter adapter for reporting progress to stderr
///
/// This adapter implements the ProgressReporter port with an indicatif bar
/// that counts finished projects. Everything goes to stderr so stdout stays
/// clean for `--json-output`. The bar is shared between concurrent project
/// workers, hence the mutex.
pub struct StderrProgressReporter {
    progress_bar: Mutex<Option<ProgressBar>>,
}

impl StderrProgressReporter {
    pub fn new() -> Self {
        Self {
            progress_bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn print_above_bar(&self, message: &str) {
        let mut printed = false;
        self.with_bar(|pb| {
            if !pb.is_finished() && !pb.is_hidden() {
                pb.println(message);
                printed = true;
            }
        });
        if !printed {
            eprintln!("{}", message);
        }
    }
}

impl Default for StderrProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for StderrProgressReporter {
    fn begin(&self, total_projects: usize) {
        let pb = ProgressBar::new(total_projects as u64);
        let style = ProgressStyle::default_bar()
            .template("   {spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} projects - {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        pb.set_style(style);
        pb.set_message("auditing");
        if let Ok(mut guard) = self.progress_bar.lock() {
            *guard = Some(pb);
        }
    }

    fn project_finished(&self, project: &str, vulnerabilities: usize) {
        self.with_bar(|pb| {
            pb.set_message(format!("{} ({} vulnerabilities)", project, vulnerabilities));
            pb.inc(1);
        });
    }

    fn report(&self, message: &str) {
        self.print_above_bar(message);
    }

    fn report_error(&self, message: &str) {
        self.print_above_bar(message);
    }

    fn report_completion(&self, message: &str) {
        self.with_bar(|pb| pb.finish_and_clear());
        eprintln!();
        eprintln!("{}", message);
    }
}
