use super::http_client;
use crate::auditing::domain::{ChannelKind, ThreadId};
use crate::auditing::services::NotificationMessage;
use crate::ports::outbound::ThreadedChannel;
use crate::shared::error::{AuditError, ThreadCreationFailure};
use crate::shared::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Telegram Bot API client posting into forum topics of one group.
///
/// The bot token is part of every request URL, so transport errors are
/// stripped of their URL before they are surfaced.
pub struct TelegramChannel {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    group_id: i64,
}

impl TelegramChannel {
    const API_BASE: &'static str = "https://api.telegram.org";
    /// Telegram rejects topic names longer than this
    const MAX_TOPIC_NAME_CHARS: usize = 128;

    pub fn new(bot_token: impl Into<String>, group_id: i64) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_base: Self::API_BASE.to_string(),
            bot_token: bot_token.into(),
            group_id,
        })
    }

    /// Points the client at a different Bot API server (self-hosted or test).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn call<P, T>(&self, method: &str, payload: &P) -> std::result::Result<T, ApiFailure>
    where
        P: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{}", self.api_base, self.bot_token, method);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiFailure::Transport(e.without_url().to_string()))?;

        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| ApiFailure::Rejected {
            code: Some(i32::from(status.as_u16())),
            description: format!("unexpected response (HTTP {})", status.as_u16()),
        })?;

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                error_code,
                description,
                ..
            } => Err(ApiFailure::Rejected {
                code: error_code,
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    async fn send_message(
        &self,
        thread: ThreadId,
        text: &str,
        parse_mode: Option<&'static str>,
    ) -> std::result::Result<ThreadId, ApiFailure> {
        let payload = SendMessage {
            chat_id: self.group_id,
            text,
            parse_mode,
            message_thread_id: (!thread.is_none()).then(|| thread.get()),
        };
        let sent: SentMessage = self.call("sendMessage", &payload).await?;
        Ok(ThreadId::new(sent.message_thread_id.unwrap_or(0)))
    }
}

#[async_trait]
impl ThreadedChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn create_thread(&self, name: &str) -> std::result::Result<ThreadId, AuditError> {
        let name: String = name.chars().take(Self::MAX_TOPIC_NAME_CHARS).collect();
        let payload = CreateForumTopic {
            chat_id: self.group_id,
            name: &name,
        };

        let topic: ForumTopic =
            self.call("createForumTopic", &payload)
                .await
                .map_err(|failure| AuditError::ThreadCreationFailed {
                    failure: failure.creation_class(),
                    details: failure.to_string(),
                })?;

        if topic.message_thread_id <= 0 {
            return Err(AuditError::ThreadCreationFailed {
                failure: ThreadCreationFailure::Transient,
                details: format!(
                    "invalid message_thread_id in response: {}",
                    topic.message_thread_id
                ),
            });
        }
        Ok(ThreadId::new(topic.message_thread_id))
    }

    async fn send_to_thread(
        &self,
        thread: ThreadId,
        message: &NotificationMessage,
    ) -> std::result::Result<ThreadId, AuditError> {
        match self.send_message(thread, &message.markdown, Some("Markdown")).await {
            Ok(receipt) => return Ok(receipt),
            Err(failure) if failure.thread_missing() => {
                warn!(thread = %thread, "Telegram reports the topic is gone");
                return Ok(ThreadId::NONE);
            }
            Err(failure @ ApiFailure::Transport(_)) => {
                return Err(AuditError::ChannelSendFailed {
                    channel: ChannelKind::Telegram,
                    details: failure.to_string(),
                });
            }
            Err(failure) => {
                warn!(thread = %thread, error = %failure, "Markdown message rejected, retrying as plain text");
            }
        }

        match self.send_message(thread, &message.plain, None).await {
            Ok(receipt) => Ok(receipt),
            Err(failure) if failure.thread_missing() => Ok(ThreadId::NONE),
            Err(failure) => Err(AuditError::ChannelSendFailed {
                channel: ChannelKind::Telegram,
                details: failure.to_string(),
            }),
        }
    }
}

#[derive(Debug)]
enum ApiFailure {
    /// The request never produced an API answer
    Transport(String),
    /// The API answered with `ok: false`
    Rejected {
        code: Option<i32>,
        description: String,
    },
}

impl ApiFailure {
    fn description(&self) -> String {
        match self {
            ApiFailure::Transport(details) => details.to_lowercase(),
            ApiFailure::Rejected { description, .. } => description.to_lowercase(),
        }
    }

    fn thread_missing(&self) -> bool {
        let text = self.description();
        matches!(self, ApiFailure::Rejected { .. })
            && (text.contains("thread not found") || text.contains("topic_deleted"))
    }

    fn creation_class(&self) -> ThreadCreationFailure {
        match self {
            ApiFailure::Transport(_) => ThreadCreationFailure::Transient,
            ApiFailure::Rejected { description, .. } => classify_creation_error(description),
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFailure::Transport(details) => write!(f, "request failed: {}", details),
            ApiFailure::Rejected {
                code: Some(code),
                description,
            } => write!(f, "Telegram API error {}: {}", code, description),
            ApiFailure::Rejected {
                code: None,
                description,
            } => write!(f, "Telegram API error: {}", description),
        }
    }
}

/// Maps a Bot API error description to the operator-facing failure class.
fn classify_creation_error(description: &str) -> ThreadCreationFailure {
    let text = description.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if has(&["not enough rights", "chat_admin_required", "have no rights"]) {
        ThreadCreationFailure::PermissionDenied
    } else if has(&["chat not found", "peer_id_invalid", "bot is not a member", "bot was kicked"]) {
        ThreadCreationFailure::InvalidChannel
    } else if has(&["chat_not_forum", "not a forum"]) {
        ThreadCreationFailure::ThreadsUnsupported
    } else if has(&["topic_not_modified"]) {
        ThreadCreationFailure::Conflict
    } else {
        ThreadCreationFailure::Transient
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i32>,
}

#[derive(Debug, Serialize)]
struct CreateForumTopic<'a> {
    chat_id: i64,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ForumTopic {
    message_thread_id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(default)]
    message_thread_id: Option<i64>,
}
