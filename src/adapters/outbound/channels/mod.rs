/// Notification channel adapters (Telegram forum topics, Resend e-mail)
mod email_channel;
mod telegram_channel;

pub use email_channel::ResendEmailChannel;
pub use telegram_channel::TelegramChannel;

use std::time::Duration;

/// Request timeout shared by all HTTP-backed channels.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> crate::shared::Result<reqwest::Client> {
    let user_agent = format!("audit-checks/{}", env!("CARGO_PKG_VERSION"));
    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}
