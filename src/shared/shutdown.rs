use tracing::debug;

type ReleaseAction = Box<dyn FnOnce() + Send>;

/// Ordered list of release actions for process-scoped resources.
///
/// Actions run in reverse registration order, exactly once. `release()` is
/// called by the run loop on every exit path; `Drop` covers early returns and
/// unwinding.
#[derive(Default)]
pub struct ShutdownStack {
    actions: Vec<(&'static str, ReleaseAction)>,
}

impl ShutdownStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a release action under a label used for logging.
    pub fn push<F>(&mut self, label: &'static str, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.actions.push((label, Box::new(action)));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs all pending actions, last registered first.
    pub fn release(&mut self) {
        while let Some((label, action)) = self.actions.pop() {
            debug!(resource = label, "releasing");
            action();
        }
    }
}

impl Drop for ShutdownStack {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ShutdownStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<&str> = self.actions.iter().map(|(label, _)| *label).collect();
        f.debug_struct("ShutdownStack").field("pending", &labels).finish()
    }
}
