use crate::auditing::domain::{ChannelKind, ThreadId};
use crate::auditing::services::NotificationMessage;
use crate::shared::error::AuditError;
use async_trait::async_trait;

/// A channel that delivers messages to a list of addresses (e.g. e-mail).
#[async_trait]
pub trait PlainChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send_plain(
        &self,
        addresses: &[String],
        message: &NotificationMessage,
    ) -> Result<(), AuditError>;
}

/// A channel that groups messages into per-project discussion threads
/// (e.g. Telegram forum topics).
#[async_trait]
pub trait ThreadedChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Creates a new thread and returns its id.
    ///
    /// # Errors
    /// `ThreadCreationFailed` with the failure class set.
    async fn create_thread(&self, name: &str) -> Result<ThreadId, AuditError>;

    /// Sends `message` to `thread` and returns the thread id reported by the
    /// delivery receipt. A receipt naming a different thread (or
    /// `ThreadId::NONE`) means the message landed in the channel's default
    /// location, usually because the thread was deleted.
    async fn send_to_thread(
        &self,
        thread: ThreadId,
        message: &NotificationMessage,
    ) -> Result<ThreadId, AuditError>;
}
