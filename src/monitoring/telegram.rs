use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::Secret;
use crate::error::{check_status, Result};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Chat endpoint that receives plain-text alerts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<()>;
}

pub struct TelegramNotifier {
    bot_token: Option<Secret>,
    chat_id: Option<String>,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(client: Client, bot_token: Option<Secret>, chat_id: Option<String>) -> Self {
        Self {
            bot_token,
            chat_id,
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

#[async_trait]
impl ChatSender for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        // Check if Telegram integration is configured
        let (bot_token, chat_id) = match (&self.bot_token, &self.chat_id) {
            (Some(token), Some(chat)) => (token, chat),
            _ => {
                info!("Telegram notification skipped: Bot token or chat ID not configured");
                return Ok(());
            }
        };

        debug!("Sending Telegram notification");

        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API, bot_token.expose());
        let response = self
            .client
            .post(&url)
            .form(&[("chat_id", chat_id.as_str()), ("text", text)])
            .send()
            .await?;
        check_status(response).await?;

        debug!("Telegram notification sent successfully");
        Ok(())
    }
}
