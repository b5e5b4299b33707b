// src/integrations/telegram.rs — Telegram transport (Bot API)
//
// Uses the Telegram Bot API (https://core.telegram.org/bots/api) via
// long-polled getUpdates. This layer only moves messages: updates are
// normalized into `InboundEvent`s for the orchestrator and replies are sent
// back verbatim.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::core::types::InboundEvent;
use crate::infra::errors::PostwrightError;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramAdapter {
    client: Client,
    bot_token: String,
}

// -- Telegram API response types --

#[derive(Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    pub from: Option<TgUser>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<TgPhotoSize>>,
    pub date: i64,
}

#[derive(Debug, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TgUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TgPhotoSize {
    pub file_id: String,
}

#[derive(Deserialize)]
struct SendMessageResp {
    message_id: i64,
}

impl TelegramAdapter {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: Client::new(),
            bot_token,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.bot_token)
    }

    /// Validate the bot token by calling getMe.
    pub async fn validate(&self) -> anyhow::Result<String> {
        #[derive(Deserialize)]
        struct BotUser {
            username: Option<String>,
            first_name: Option<String>,
        }

        let resp: TelegramResponse<BotUser> = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            anyhow::bail!("Telegram auth failed");
        }

        let bot = resp.result.ok_or_else(|| anyhow::anyhow!("Empty getMe result"))?;
        Ok(format!(
            "Authenticated as @{}",
            bot.username
                .unwrap_or_else(|| bot.first_name.unwrap_or_default())
        ))
    }

    /// Long-poll for new updates past `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<TgUpdate>, PostwrightError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });

        let resp: TelegramResponse<Vec<TgUpdate>> = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PostwrightError::Telegram(e.to_string()))?
            .json()
            .await
            .map_err(|e| PostwrightError::Telegram(e.to_string()))?;

        if !resp.ok {
            return Err(PostwrightError::Telegram(
                resp.description.unwrap_or_else(|| "getUpdates failed".into()),
            ));
        }

        Ok(resp.result.unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, PostwrightError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp: TelegramResponse<SendMessageResp> = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PostwrightError::Telegram(e.to_string()))?
            .json()
            .await
            .map_err(|e| PostwrightError::Telegram(e.to_string()))?;

        if !resp.ok {
            return Err(PostwrightError::Telegram(
                resp.description.unwrap_or_else(|| "sendMessage failed".into()),
            ));
        }

        Ok(resp.result.map(|r| r.message_id).unwrap_or_default())
    }
}

/// Turn a Telegram message into the core's normalized inbound event.
/// Returns None for messages the engine can't act on (no sender, or a
/// photo with no caption — the caller prompts for one).
pub fn normalize(message: &TgMessage) -> Option<InboundEvent> {
    let from = message.from.as_ref()?;
    let timestamp = DateTime::<Utc>::from_timestamp(message.date, 0).unwrap_or_else(Utc::now);

    let has_photo = message.photo.as_ref().is_some_and(|p| !p.is_empty());
    let caption = message.caption.as_deref().map(str::trim).unwrap_or("");

    if has_photo {
        if caption.is_empty() {
            return None;
        }
        return Some(InboundEvent {
            user_id: from.id,
            text: None,
            photo_caption: Some(caption.to_string()),
            first_name: from.first_name.clone(),
            timestamp,
        });
    }

    let text = message.text.as_deref().map(str::trim).unwrap_or("");
    Some(InboundEvent {
        user_id: from.id,
        text: Some(text.to_string()),
        photo_caption: None,
        first_name: from.first_name.clone(),
        timestamp,
    })
}

/// Time-of-day greeting used for the one-time connect welcome.
pub fn time_greeting(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=16 => "Good afternoon",
        17..=21 => "Good evening",
        _ => "Hello",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: Option<&str>, caption: Option<&str>, photo: bool) -> TgMessage {
        TgMessage {
            message_id: 10,
            chat: TgChat { id: 99 },
            from: Some(TgUser {
                id: 99,
                username: Some("ada".into()),
                first_name: Some("Ada".into()),
                last_name: None,
            }),
            text: text.map(String::from),
            caption: caption.map(String::from),
            photo: photo.then(|| {
                vec![TgPhotoSize {
                    file_id: "f1".into(),
                }]
            }),
            date: 1_760_000_000,
        }
    }

    #[test]
    fn test_normalize_text_message() {
        let ev = normalize(&message(Some("write a post"), None, false)).unwrap();
        assert_eq!(ev.user_id, 99);
        assert_eq!(ev.text.as_deref(), Some("write a post"));
        assert!(ev.photo_caption.is_none());
    }

    #[test]
    fn test_normalize_photo_with_caption() {
        let ev = normalize(&message(None, Some("launch party"), true)).unwrap();
        assert_eq!(ev.photo_caption.as_deref(), Some("launch party"));
        assert!(ev.text.is_none());
    }

    #[test]
    fn test_normalize_photo_without_caption_is_none() {
        assert!(normalize(&message(None, None, true)).is_none());
        assert!(normalize(&message(None, Some("   "), true)).is_none());
    }

    #[test]
    fn test_normalize_without_sender_is_none() {
        let mut m = message(Some("hi"), None, false);
        m.from = None;
        assert!(normalize(&m).is_none());
    }

    #[test]
    fn test_time_greeting_buckets() {
        assert_eq!(time_greeting(6), "Good morning");
        assert_eq!(time_greeting(13), "Good afternoon");
        assert_eq!(time_greeting(19), "Good evening");
        assert_eq!(time_greeting(2), "Hello");
        assert_eq!(time_greeting(23), "Hello");
    }
}
