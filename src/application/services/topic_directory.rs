use crate::auditing::domain::ThreadId;
use crate::auditing::services::NotificationMessage;
use crate::ports::outbound::ThreadedChannel;
use crate::shared::error::AuditError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// What happened when a message was delivered through the directory.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// The receipt matched the thread we sent to
    Delivered(ThreadId),
    /// The thread had vanished; a replacement was created and used
    Recreated { previous: ThreadId, thread: ThreadId },
    /// Recovery did not produce a usable thread; the stored id must be cleared
    RecoveryFailed { previous: ThreadId, error: AuditError },
}

impl Delivery {
    /// The id that should be on file after this delivery.
    pub fn thread_id(&self) -> ThreadId {
        match self {
            Delivery::Delivered(thread) => *thread,
            Delivery::Recreated { thread, .. } => *thread,
            Delivery::RecoveryFailed { .. } => ThreadId::NONE,
        }
    }
}

/// TopicDirectory - Maps project names to discussion threads on one channel
///
/// Process-lifetime cache in front of the persisted thread id. Cache hits
/// take the shared lock; population takes the exclusive lock and re-checks
/// before creating, so concurrent first-time resolutions for one project
/// create a single thread.
///
/// Deletion detection compares the delivery receipt's thread with the one we
/// sent to. The channel offers no authoritative existence check, so this is
/// a heuristic and only one recovery attempt is made per delivery.
pub struct TopicDirectory {
    channel: Arc<dyn ThreadedChannel>,
    cache: RwLock<HashMap<String, ThreadId>>,
}

impl TopicDirectory {
    pub fn new(channel: Arc<dyn ThreadedChannel>) -> Self {
        Self {
            channel,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn channel(&self) -> &Arc<dyn ThreadedChannel> {
        &self.channel
    }

    /// Returns the thread for `project`, creating one if needed.
    ///
    /// A non-zero `persisted` id is trusted as-is and cached.
    ///
    /// # Errors
    /// `ThreadCreationFailed` from the channel; creation is not retried here.
    pub async fn resolve(
        &self,
        project: &str,
        persisted: Option<ThreadId>,
    ) -> Result<ThreadId, AuditError> {
        if let Some(thread) = persisted.filter(|id| !id.is_none()) {
            self.cache.write().await.insert(project.to_string(), thread);
            return Ok(thread);
        }

        if let Some(thread) = self.cache.read().await.get(project).copied() {
            return Ok(thread);
        }

        let mut cache = self.cache.write().await;
        if let Some(thread) = cache.get(project).copied() {
            return Ok(thread);
        }

        let thread = self.channel.create_thread(&thread_title(project)).await?;
        info!(project, thread = %thread, "created thread");
        cache.insert(project.to_string(), thread);
        Ok(thread)
    }

    /// Forgets the cached thread for `project`.
    pub async fn invalidate(&self, project: &str) {
        if let Some(previous) = self.cache.write().await.remove(project) {
            debug!(project, thread = %previous, "invalidated thread");
        }
    }

    pub async fn cached(&self, project: &str) -> Option<ThreadId> {
        self.cache.read().await.get(project).copied()
    }

    /// Sends `message` to the project's thread and recovers once if the
    /// receipt shows the thread no longer exists.
    ///
    /// # Errors
    /// Resolution or first-send failures. Recovery failures are reported as
    /// `Delivery::RecoveryFailed` instead, since the message did reach the
    /// channel.
    pub async fn deliver(
        &self,
        project: &str,
        persisted: Option<ThreadId>,
        message: &NotificationMessage,
    ) -> Result<Delivery, AuditError> {
        let thread = self.resolve(project, persisted).await?;
        let receipt = self.channel.send_to_thread(thread, message).await?;
        if receipt == thread {
            return Ok(Delivery::Delivered(thread));
        }

        warn!(
            project,
            expected = %thread,
            receipt = %receipt,
            "message landed outside the project thread, recreating it"
        );
        self.invalidate(project).await;

        let replacement = match self.resolve(project, None).await {
            Ok(replacement) => replacement,
            Err(e) => {
                return Ok(self.recovery_failed(project, thread, e.to_string()).await);
            }
        };

        match self.channel.send_to_thread(replacement, message).await {
            Ok(receipt) if receipt == replacement => Ok(Delivery::Recreated {
                previous: thread,
                thread: replacement,
            }),
            Ok(receipt) => Ok(self
                .recovery_failed(
                    project,
                    thread,
                    format!(
                        "replacement thread {} was not used (receipt {})",
                        replacement, receipt
                    ),
                )
                .await),
            Err(e) => Ok(self.recovery_failed(project, thread, e.to_string()).await),
        }
    }

    async fn recovery_failed(&self, project: &str, previous: ThreadId, details: String) -> Delivery {
        self.invalidate(project).await;
        warn!(project, previous = %previous, %details, "thread recovery failed");
        Delivery::RecoveryFailed {
            previous,
            error: AuditError::ThreadRecoveryFailed {
                project: project.to_string(),
                details,
            },
        }
    }
}

fn thread_title(project: &str) -> String {
    format!("Security: {}", project)
}
