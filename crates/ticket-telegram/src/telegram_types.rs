//! Serde models for the subset of the Bot API the bot consumes.

use serde::Deserialize;

/// Envelope shared by every Bot API method.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub parameters: Option<TelegramResponseParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<TelegramMessageEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl TelegramUser {
    /// `first last`, falling back to `@username`, then the numeric id.
    pub fn display_name(&self) -> String {
        let full_name = [
            self.first_name.trim(),
            self.last_name.as_deref().map(str::trim).unwrap_or_default(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
        if !full_name.is_empty() {
            return full_name;
        }
        match self.username.as_deref().map(str::trim) {
            Some(username) if !username.is_empty() => format!("@{username}"),
            _ => self.id.to_string(),
        }
    }
}

/// Formatting span; `offset` and `length` count UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramMessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub url: Option<String>,
}
