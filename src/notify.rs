use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::TelegramSettings;
use crate::error::DeliveryError;

const PARSE_MODE: &str = "Markdown";

/// Delivers a finished report somewhere a person will read it.
pub trait Notifier {
    fn send_document(&self, path: &Path, caption: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    fn send_text(&self, text: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

/// Thin Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramApi {
    client: Client,
    base: String,
}

impl TelegramApi {
    pub fn new(client: Client, settings: &TelegramSettings) -> Result<Self, DeliveryError> {
        let token = settings
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(DeliveryError::MissingToken)?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", settings.api_base.trim_end_matches('/'), token),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }

    async fn read<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, DeliveryError> {
        let status = res.status();
        let body = res.text().await?;
        let parsed: Option<ApiResponse<T>> = serde_json::from_str(&body).ok();
        match parsed {
            Some(ApiResponse {
                ok: true,
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            Some(ApiResponse {
                description: Some(description),
                ..
            }) => Err(DeliveryError::Api {
                status: status.as_u16(),
                body: description,
            }),
            _ => Err(DeliveryError::Api {
                status: status.as_u16(),
                body,
            }),
        }
    }

    /// Markdown message; returns its id.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, DeliveryError> {
        let res = self
            .client
            .post(self.url("sendMessage"))
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": PARSE_MODE,
                "disable_web_page_preview": true,
            }))
            .send()
            .await?;
        let message: Message = Self::read(res).await?;
        debug!(chat_id, message_id = message.message_id, "message sent");
        Ok(message.message_id)
    }

    pub async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), DeliveryError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.pdf".to_string());
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", PARSE_MODE)
            .part("document", Part::bytes(bytes).file_name(name));
        let res = self
            .client
            .post(self.url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let _: Message = Self::read(res).await?;
        info!(chat_id, path = %path.display(), "document sent");
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), DeliveryError> {
        let res = self
            .client
            .post(self.url("deleteMessage"))
            .json(&json!({ "chat_id": chat_id, "message_id": message_id }))
            .send()
            .await?;
        let _: bool = Self::read(res).await?;
        Ok(())
    }

    /// Long poll. The request timeout outlasts the server-side wait.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, DeliveryError> {
        let res = self
            .client
            .post(self.url("getUpdates"))
            .timeout(Duration::from_secs(timeout_secs + 10))
            .json(&json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }))
            .send()
            .await?;
        Self::read(res).await
    }
}

/// Sends everything to one chat.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    api: TelegramApi,
    chat_id: i64,
}

impl TelegramNotifier {
    pub fn new(api: TelegramApi, chat_id: i64) -> Self {
        Self { api, chat_id }
    }
}

impl Notifier for TelegramNotifier {
    async fn send_document(&self, path: &Path, caption: &str) -> Result<(), DeliveryError> {
        self.api.send_document(self.chat_id, path, caption).await
    }

    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        self.api.send_message(self.chat_id, text).await.map(|_| ())
    }
}

/// Prints deliveries to stdout. Used by the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    async fn send_document(&self, path: &Path, caption: &str) -> Result<(), DeliveryError> {
        println!("Report: {}\n{}", path.display(), caption);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        println!("{}", text);
        Ok(())
    }
}
