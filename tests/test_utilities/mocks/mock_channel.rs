use async_trait::async_trait;
use audit_checks::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Records every e-mail instead of sending it
#[derive(Default, Clone)]
pub struct MockEmailChannel {
    pub sent: Arc<Mutex<Vec<(Vec<String>, NotificationMessage)>>>,
}

impl MockEmailChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.subject.clone())
            .collect()
    }
}

#[async_trait]
impl PlainChannel for MockEmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send_plain(
        &self,
        addresses: &[String],
        message: &NotificationMessage,
    ) -> std::result::Result<(), AuditError> {
        self.sent
            .lock()
            .unwrap()
            .push((addresses.to_vec(), message.clone()));
        Ok(())
    }
}

/// Forum with topics; deleted topics route messages to the general thread
#[derive(Clone)]
pub struct MockForumChannel {
    next_id: Arc<AtomicI64>,
    refuse_creation: Arc<AtomicBool>,
    pub created: Arc<Mutex<Vec<String>>>,
    pub deleted: Arc<Mutex<HashSet<ThreadId>>>,
    pub delivered: Arc<Mutex<Vec<(ThreadId, String)>>>,
}

impl MockForumChannel {
    pub fn new(first_id: i64) -> Self {
        Self {
            next_id: Arc::new(AtomicI64::new(first_id)),
            refuse_creation: Arc::default(),
            created: Arc::default(),
            deleted: Arc::default(),
            delivered: Arc::default(),
        }
    }

    pub fn delete_thread(&self, thread: ThreadId) {
        self.deleted.lock().unwrap().insert(thread);
    }

    /// Makes every later `create_thread` fail as if the bot lost its admin rights
    pub fn refuse_creation(&self) {
        self.refuse_creation.store(true, Ordering::SeqCst);
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThreadedChannel for MockForumChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn create_thread(&self, name: &str) -> std::result::Result<ThreadId, AuditError> {
        if self.refuse_creation.load(Ordering::SeqCst) {
            return Err(AuditError::ThreadCreationFailed {
                failure: ThreadCreationFailure::PermissionDenied,
                details: "not enough rights to create a topic".to_string(),
            });
        }
        self.created.lock().unwrap().push(name.to_string());
        Ok(ThreadId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn send_to_thread(
        &self,
        thread: ThreadId,
        message: &NotificationMessage,
    ) -> std::result::Result<ThreadId, AuditError> {
        let receipt = if self.deleted.lock().unwrap().contains(&thread) {
            ThreadId::NONE
        } else {
            thread
        };
        self.delivered
            .lock()
            .unwrap()
            .push((receipt, message.subject.clone()));
        Ok(receipt)
    }
}
