use crate::acl::UserRecord;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT_SECS: u64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("telegram api request failed: {0}")]
    Request(String),
    #[error("telegram api responded with error: {0}")]
    Api(String),
}

/// Reply decoration for an outgoing message: a one-time custom keyboard of
/// button rows, an explicit keyboard removal (used on every error reply), or
/// plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    Keyboard(Vec<Vec<String>>),
    Remove,
    None,
}

/// Narrow seam to the chat transport; the workflow engine and router only
/// ever see this trait.
pub trait ChatTransport {
    fn send(&self, chat_id: i64, text: &str, markup: ReplyMarkup) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub from: Option<Sender>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Sender {
    pub fn to_user_record(&self) -> UserRecord {
        UserRecord {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Long-polling Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        let api_base = std::env::var("ARRBOT_TELEGRAM_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self { api_base, token }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }

    // The derived Deserialize for ApiResponse<T> carries a T: Default bound
    // because of the defaulted result field.
    fn call<T: for<'de> Deserialize<'de> + Default>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, TransportError> {
        let response = ureq::post(&self.endpoint(method))
            .send_json(body.clone())
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let envelope: ApiResponse<T> = response
            .into_json()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        if !envelope.ok {
            return Err(TransportError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            ));
        }
        envelope
            .result
            .ok_or_else(|| TransportError::Api(format!("{method} returned no result")))
    }

    /// Fetches the next batch of updates and returns them with the offset to
    /// pass on the next call (one past the highest seen update id).
    pub fn get_updates(&self, offset: i64) -> Result<(Vec<Update>, i64), TransportError> {
        let body = json!({
            "timeout": LONG_POLL_TIMEOUT_SECS,
            "offset": offset,
            "allowed_updates": ["message"],
        });
        let updates: Vec<Update> = self.call("getUpdates", &body)?;
        let mut next_offset = offset;
        for update in &updates {
            next_offset = next_offset.max(update.update_id.saturating_add(1));
        }
        Ok((updates, next_offset))
    }
}

pub fn reply_markup_json(markup: &ReplyMarkup) -> Option<Value> {
    match markup {
        ReplyMarkup::Keyboard(rows) => Some(json!({
            "keyboard": rows,
            "one_time_keyboard": true,
            "resize_keyboard": true,
        })),
        ReplyMarkup::Remove => Some(json!({ "remove_keyboard": true })),
        ReplyMarkup::None => None,
    }
}

impl ChatTransport for TelegramClient {
    fn send(&self, chat_id: i64, text: &str, markup: ReplyMarkup) -> Result<(), TransportError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(value) = reply_markup_json(&markup) {
            body["reply_markup"] = value;
        }
        let _: Value = self.call("sendMessage", &body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_markup_is_one_time() {
        let markup = ReplyMarkup::Keyboard(vec![
            vec!["Yes".to_string()],
            vec!["No".to_string()],
        ]);
        let value = reply_markup_json(&markup).expect("markup");
        assert_eq!(value["one_time_keyboard"], json!(true));
        assert_eq!(value["keyboard"][1][0], json!("No"));
    }

    #[test]
    fn remove_markup_strips_the_keyboard() {
        let value = reply_markup_json(&ReplyMarkup::Remove).expect("markup");
        assert_eq!(value["remove_keyboard"], json!(true));
    }

    #[test]
    fn plain_messages_carry_no_markup() {
        assert!(reply_markup_json(&ReplyMarkup::None).is_none());
    }

    #[test]
    fn error_envelope_parses_without_a_result() {
        fn decode<T: for<'de> Deserialize<'de> + Default>(raw: &str) -> ApiResponse<T> {
            serde_json::from_str(raw).expect("parse")
        }
        let envelope: ApiResponse<Vec<Update>> =
            decode(r#"{"ok": false, "description": "Unauthorized"}"#);
        assert!(!envelope.ok);
        assert!(envelope.result.is_none());
        assert_eq!(envelope.description.as_deref(), Some("Unauthorized"));

        let envelope: ApiResponse<Value> = decode(r#"{"ok": true, "result": {"id": 1}}"#);
        assert_eq!(envelope.result, Some(serde_json::json!({"id": 1})));
    }

    #[test]
    fn updates_parse_and_advance_offset() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"chat": {"id": 5}, "text": "/help",
                 "from": {"id": 5, "username": "alice"}}},
                {"update_id": 12, "message": {"chat": {"id": 5}, "text": "hi"}}
            ]
        }"#;
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(raw).expect("parse");
        assert!(envelope.ok);
        let updates = envelope.result.expect("result");
        assert_eq!(updates.len(), 2);
        let max = updates.iter().map(|u| u.update_id).max().unwrap_or(0);
        assert_eq!(max + 1, 13);
        let sender = updates[0].message.as_ref().and_then(|m| m.from.as_ref());
        assert_eq!(sender.map(|s| s.id), Some(5));
    }
}
