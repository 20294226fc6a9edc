use super::{Delivery, TopicDirectory};
use crate::auditing::domain::{ChannelKind, CombinedReport, Project, ThreadId};
use crate::auditing::services::{AlertMessageBuilder, NotificationMessage};
use crate::ports::outbound::PlainChannel;
use crate::shared::error::AuditError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of dispatching one combined report.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// New thread id to persist; only set when it differs from the one on file
    pub thread_update: Option<ThreadId>,
    pub failures: Vec<(ChannelKind, AuditError)>,
    pub delivered: Vec<ChannelKind>,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dispatcher - Sends combined reports through the configured channels
///
/// Each channel is tried independently; one channel failing never stops
/// another. The threaded channel goes through the `TopicDirectory`.
///
/// A project persists a single thread id, so at most one threaded channel
/// is configured.
#[derive(Default)]
pub struct Dispatcher {
    plain: Vec<Arc<dyn PlainChannel>>,
    threaded: Option<TopicDirectory>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plain_channel(mut self, channel: Arc<dyn PlainChannel>) -> Self {
        self.plain.push(channel);
        self
    }

    /// Sets the threaded channel, replacing any previous one.
    pub fn with_threaded_channel(mut self, directory: TopicDirectory) -> Self {
        if let Some(previous) = self.threaded.replace(directory) {
            warn!(channel = %previous.channel().kind(), "threaded channel replaced");
        }
        self
    }

    pub fn channel_count(&self) -> usize {
        self.plain.len() + usize::from(self.threaded.is_some())
    }

    pub async fn dispatch_combined(
        &self,
        report: &CombinedReport,
        project: &Project,
        dry_run: bool,
    ) -> DispatchOutcome {
        let message = AlertMessageBuilder::build(report);
        let mut outcome = DispatchOutcome::default();

        for channel in &self.plain {
            let kind = channel.kind();
            let addresses = &project.notifications.email;
            if kind == ChannelKind::Email && addresses.is_empty() {
                debug!(project = %project.name, channel = %kind, "no recipients, skipping");
                continue;
            }
            if dry_run {
                info!(
                    project = %project.name,
                    channel = %kind,
                    recipients = addresses.len(),
                    subject = %message.subject,
                    "dry run: notification not sent"
                );
                outcome.delivered.push(kind);
                continue;
            }
            match channel.send_plain(addresses, &message).await {
                Ok(()) => {
                    info!(project = %project.name, channel = %kind, "notification sent");
                    outcome.delivered.push(kind);
                }
                Err(e) => {
                    warn!(project = %project.name, channel = %kind, error = %e, "notification failed");
                    outcome.failures.push((kind, e));
                }
            }
        }

        if let Some(directory) = &self.threaded {
            let kind = directory.channel().kind();
            if kind == ChannelKind::Telegram && !project.notifications.telegram {
                debug!(project = %project.name, channel = %kind, "channel disabled for project");
            } else if dry_run {
                info!(
                    project = %project.name,
                    channel = %kind,
                    thread = ?project.thread_id,
                    subject = %message.subject,
                    "dry run: notification not sent"
                );
                outcome.delivered.push(kind);
            } else {
                self.dispatch_threaded(directory, project, &message, &mut outcome)
                    .await;
            }
        }

        outcome
    }

    async fn dispatch_threaded(
        &self,
        directory: &TopicDirectory,
        project: &Project,
        message: &NotificationMessage,
        outcome: &mut DispatchOutcome,
    ) {
        let kind = directory.channel().kind();
        let on_file = project.thread_id.unwrap_or(ThreadId::NONE);

        let delivery = match directory.deliver(&project.name, project.thread_id, message).await {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(project = %project.name, channel = %kind, error = %e, "notification failed");
                outcome.failures.push((kind, e));
                return;
            }
        };

        let thread = delivery.thread_id();
        if thread != on_file {
            outcome.thread_update = Some(thread);
        }

        match delivery {
            Delivery::Delivered(thread) => {
                info!(project = %project.name, channel = %kind, thread = %thread, "notification sent");
                outcome.delivered.push(kind);
            }
            Delivery::Recreated { previous, thread } => {
                info!(
                    project = %project.name,
                    channel = %kind,
                    previous = %previous,
                    thread = %thread,
                    "notification sent to recreated thread"
                );
                outcome.delivered.push(kind);
            }
            Delivery::RecoveryFailed { error, .. } => {
                outcome.failures.push((kind, error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auditing::domain::{
        NotificationTargets, ScanResult, ScannerKind, Severity, Vulnerability,
    };
    use crate::ports::outbound::ThreadedChannel;
    use crate::shared::error::ThreadCreationFailure;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingMail {
        sent: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl PlainChannel for RecordingMail {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Email
        }

        async fn send_plain(
            &self,
            addresses: &[String],
            _message: &NotificationMessage,
        ) -> Result<(), AuditError> {
            if self.fail {
                return Err(AuditError::ChannelSendFailed {
                    channel: ChannelKind::Email,
                    details: "503".to_string(),
                });
            }
            self.sent.lock().unwrap().push(addresses.to_vec());
            Ok(())
        }
    }

    /// Every thread exists; new threads start at 500.
    struct OpenForum {
        creates: AtomicUsize,
        sends: AtomicUsize,
    }

    #[async_trait]
    impl ThreadedChannel for OpenForum {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Telegram
        }

        async fn create_thread(&self, _name: &str) -> Result<ThreadId, AuditError> {
            let n = self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(ThreadId::new(500 + n as i64))
        }

        async fn send_to_thread(
            &self,
            thread: ThreadId,
            _message: &NotificationMessage,
        ) -> Result<ThreadId, AuditError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(thread)
        }
    }

    /// Every thread has been deleted and the bot may no longer create topics.
    struct LockedForum;

    #[async_trait]
    impl ThreadedChannel for LockedForum {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Telegram
        }

        async fn create_thread(&self, _name: &str) -> Result<ThreadId, AuditError> {
            Err(AuditError::ThreadCreationFailed {
                failure: ThreadCreationFailure::PermissionDenied,
                details: "not enough rights to create a topic".to_string(),
            })
        }

        async fn send_to_thread(
            &self,
            _thread: ThreadId,
            _message: &NotificationMessage,
        ) -> Result<ThreadId, AuditError> {
            Ok(ThreadId::NONE)
        }
    }

    fn mail(fail: bool) -> Arc<RecordingMail> {
        Arc::new(RecordingMail {
            sent: Mutex::new(Vec::new()),
            fail,
        })
    }

    fn forum() -> Arc<OpenForum> {
        Arc::new(OpenForum {
            creates: AtomicUsize::new(0),
            sends: AtomicUsize::new(0),
        })
    }

    fn project() -> Project {
        Project::new("web", "/srv/web").with_notifications(NotificationTargets {
            email: vec!["ops@example.com".to_string()],
            telegram: true,
        })
    }

    fn report() -> CombinedReport {
        CombinedReport::new(
            "web",
            "/srv/web",
            vec![ScanResult::new(
                ScannerKind::Npm,
                "web",
                vec![Vulnerability::new("lodash", Severity::High, "pp")],
            )],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_dry_run_touches_no_channel() {
        let mail = mail(false);
        let forum = forum();
        let dispatcher = Dispatcher::new()
            .with_plain_channel(mail.clone())
            .with_threaded_channel(TopicDirectory::new(forum.clone()));

        let outcome = dispatcher.dispatch_combined(&report(), &project(), true).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.delivered.len(), 2);
        assert!(mail.sent.lock().unwrap().is_empty());
        assert_eq!(forum.creates.load(Ordering::SeqCst), 0);
        assert_eq!(forum.sends.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.thread_update, None);
    }

    #[tokio::test]
    async fn test_new_thread_is_reported_as_update() {
        let forum = forum();
        let dispatcher = Dispatcher::new().with_threaded_channel(TopicDirectory::new(forum.clone()));

        let outcome = dispatcher.dispatch_combined(&report(), &project(), false).await;

        assert_eq!(outcome.thread_update, Some(ThreadId::new(500)));
        assert_eq!(outcome.delivered, vec![ChannelKind::Telegram]);
    }

    #[tokio::test]
    async fn test_unchanged_thread_is_not_reported() {
        let forum = forum();
        let dispatcher = Dispatcher::new().with_threaded_channel(TopicDirectory::new(forum.clone()));
        let project = project().with_thread_id(ThreadId::new(42));

        let outcome = dispatcher.dispatch_combined(&report(), &project, false).await;

        assert_eq!(outcome.thread_update, None);
        assert_eq!(forum.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let mail = mail(true);
        let forum = forum();
        let dispatcher = Dispatcher::new()
            .with_plain_channel(mail)
            .with_threaded_channel(TopicDirectory::new(forum.clone()));

        let outcome = dispatcher.dispatch_combined(&report(), &project(), false).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, ChannelKind::Email);
        assert_eq!(outcome.delivered, vec![ChannelKind::Telegram]);
        assert_eq!(forum.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_project_targets_are_respected() {
        let mail = mail(false);
        let forum = forum();
        let dispatcher = Dispatcher::new()
            .with_plain_channel(mail.clone())
            .with_threaded_channel(TopicDirectory::new(forum.clone()));
        let quiet = Project::new("web", "/srv/web");

        let outcome = dispatcher.dispatch_combined(&report(), &quiet, false).await;

        assert!(outcome.is_success());
        assert!(outcome.delivered.is_empty());
        assert!(mail.sent.lock().unwrap().is_empty());
        assert_eq!(forum.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_recovery_clears_persisted_thread() {
        let mail = mail(false);
        let dispatcher = Dispatcher::new()
            .with_plain_channel(mail.clone())
            .with_threaded_channel(TopicDirectory::new(Arc::new(LockedForum)));
        let project = project().with_thread_id(ThreadId::new(42));

        let outcome = dispatcher.dispatch_combined(&report(), &project, false).await;

        assert_eq!(outcome.thread_update, Some(ThreadId::NONE));
        assert_eq!(outcome.failures.len(), 1);
        let (channel, error) = &outcome.failures[0];
        assert_eq!(*channel, ChannelKind::Telegram);
        assert!(matches!(error, AuditError::ThreadRecoveryFailed { project, .. } if project == "web"));
        assert_eq!(outcome.delivered, vec![ChannelKind::Email]);
        assert_eq!(mail.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_threaded_channel_replaces_first() {
        let first = forum();
        let second = forum();
        let dispatcher = Dispatcher::new()
            .with_threaded_channel(TopicDirectory::new(first.clone()))
            .with_threaded_channel(TopicDirectory::new(second.clone()));

        let outcome = dispatcher.dispatch_combined(&report(), &project(), false).await;

        assert_eq!(dispatcher.channel_count(), 1);
        assert_eq!(first.sends.load(Ordering::SeqCst), 0);
        assert_eq!(second.sends.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.thread_update, Some(ThreadId::new(500)));
    }
}
