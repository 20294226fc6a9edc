use super::http_client;
use crate::auditing::domain::ChannelKind;
use crate::auditing::services::NotificationMessage;
use crate::ports::outbound::PlainChannel;
use crate::shared::error::AuditError;
use crate::shared::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// E-mail delivery through the Resend HTTP API
pub struct ResendEmailChannel {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendEmailChannel {
    const API_URL: &'static str = "https://api.resend.com/emails";

    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_url: Self::API_URL.to_string(),
            api_key: api_key.into(),
            from: from.into(),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn failure(details: impl Into<String>) -> AuditError {
        AuditError::ChannelSendFailed {
            channel: ChannelKind::Email,
            details: details.into(),
        }
    }
}

#[async_trait]
impl PlainChannel for ResendEmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send_plain(
        &self,
        addresses: &[String],
        message: &NotificationMessage,
    ) -> std::result::Result<(), AuditError> {
        if addresses.is_empty() {
            return Ok(());
        }

        let payload = ResendPayload {
            from: &self.from,
            to: addresses,
            subject: &message.subject,
            html: &message.html,
            text: &message.plain,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Self::failure(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ResendError>(&body) {
            Ok(error) if !error.message.is_empty() => {
                Err(Self::failure(format!("Resend API error: {}", error.message)))
            }
            _ => Err(Self::failure(format!(
                "Resend API error: status {}",
                status.as_u16()
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendError {
    #[serde(default)]
    message: String,
}
