use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::listing_url::{is_listing_url, listing_id, EXAMPLE_URL};
use crate::notify::{Message, TelegramApi, TelegramNotifier, Update};
use crate::pdf::PdfConverter;
use crate::pipeline::{Pipeline, RunReport, Stage, State};
use crate::report::caption::{clip, escape_markdown, short_caption, MAX_CAPTION, MAX_MESSAGE};
use crate::snapshot::{remove_snapshot, write_snapshot};

const RETRY_AFTER: Duration = Duration::from_secs(5);

const NOT_RETRIEVED: &str = "⚠️ Не удалось получить данные по объявлению. Возможно, оно было удалено, \
изменилась структура страницы или возникла проблема с доступом к Циан.";
const INTERNAL_ERROR: &str = "❌ Произошла внутренняя ошибка при обработке вашего запроса. \
Пожалуйста, попробуйте позже или свяжитесь с администратором, если проблема повторяется.";
const ALREADY_RUNNING: &str = "⏳ Это объявление уже обрабатывается, дождитесь отчёта.";

fn welcome() -> String {
    format!(
        "👋 Привет! Я бот для парсинга объявлений с Циан.\n\n\
         Отправь мне ссылку на квартиру в формате:\n\
         🔹 `{}`\n\n\
         Я обработаю её и пришлю данные в виде PDF-отчета.",
        EXAMPLE_URL
    )
}

fn format_error() -> String {
    format!(
        "🚫 *Ошибка: Неверный формат ссылки.*\n\n\
         Пожалуйста, отправьте ссылку на квартиру с `www.cian.ru`.\n\
         Пример: `{}`",
        EXAMPLE_URL
    )
}

/// Listing ids currently being processed.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<String>>>,
}

/// Held while a listing is processed. Releases the id on drop.
#[derive(Debug)]
pub struct Claim {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlight {
    /// `None` when `id` is already claimed.
    pub fn claim(&self, id: &str) -> Option<Claim> {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.insert(id.to_string()).then(|| Claim {
            ids: Arc::clone(&self.ids),
            id: id.to_string(),
        })
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.remove(&self.id);
    }
}

struct Shared<C> {
    api: TelegramApi,
    pipeline: Pipeline<C>,
    admin_chat_id: Option<i64>,
    downloads_dir: PathBuf,
    poll_timeout_secs: u64,
    in_flight: InFlight,
}

/// Long-polling Telegram front-end. One task per listing request.
pub struct Bot<C> {
    shared: Arc<Shared<C>>,
}

impl<C: PdfConverter + Send + Sync + 'static> Bot<C> {
    pub fn new(api: TelegramApi, pipeline: Pipeline<C>, settings: &Settings) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                pipeline,
                admin_chat_id: settings.telegram.admin_chat_id,
                downloads_dir: settings.downloads_dir.clone(),
                poll_timeout_secs: settings.telegram.poll_timeout_secs,
                in_flight: InFlight::default(),
            }),
        }
    }

    /// Poll until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        if self.shared.admin_chat_id.is_none() {
            warn!("admin chat id is not set, reports will not be copied");
        }
        info!("bot started");
        let mut offset = 0;
        loop {
            let updates = tokio::select! {
                res = self.shared.api.get_updates(offset, self.shared.poll_timeout_secs) => res,
                _ = tokio::signal::ctrl_c() => {
                    info!("bot stopped");
                    return Ok(());
                }
            };
            let updates: Vec<Update> = match updates {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, retrying");
                    tokio::time::sleep(RETRY_AFTER).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(message) = update.message {
                    self.handle_message(message).await;
                }
            }
        }
    }

    /// Replies directly to commands and bad input; spawns a task for a listing URL.
    pub async fn handle_message(&self, message: Message) -> Option<JoinHandle<()>> {
        let chat_id = message.chat.id;
        let text = message.text.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return None;
        }

        if text.starts_with("/start") {
            self.reply(chat_id, &welcome()).await;
            return None;
        }
        if !is_listing_url(text) {
            debug!(chat_id, "rejected message that is not a listing url");
            self.reply(chat_id, &format_error()).await;
            return None;
        }
        let id = listing_id(text)?;
        let Some(claim) = self.shared.in_flight.claim(&id) else {
            info!(listing_id = %id, chat_id, "listing already in progress");
            self.reply(chat_id, ALREADY_RUNNING).await;
            return None;
        };

        let shared = Arc::clone(&self.shared);
        let user_id = message.from.map(|u| u.id).unwrap_or(chat_id);
        let url = text.to_string();
        Some(tokio::spawn(async move {
            process(shared.as_ref(), chat_id, user_id, &url).await;
            drop(claim);
        }))
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.shared.api.send_message(chat_id, text).await {
            warn!(chat_id, error = %e, "reply failed");
        }
    }
}

async fn process<C: PdfConverter + Sync>(shared: &Shared<C>, chat_id: i64, user_id: i64, url: &str) {
    let api = &shared.api;
    let notice = format!("⏳ Обрабатываю страницу: {}\nПожалуйста, подождите...", escape_markdown(url));
    let notice_id = match api.send_message(chat_id, &notice).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(chat_id, error = %e, "could not send processing notice");
            None
        }
    };

    let notifier = TelegramNotifier::new(api.clone(), chat_id);
    let run = shared.pipeline.run(url, &notifier).await;

    if let Some(id) = notice_id {
        if let Err(e) = api.delete_message(chat_id, id).await {
            debug!(chat_id, error = %e, "could not delete processing notice");
        }
    }

    let admin = shared.admin_chat_id.filter(|&admin| admin != user_id);
    match &run.state {
        State::Done => {
            if let Some(admin) = admin {
                send_admin_copy(shared, admin, user_id, &run).await;
            }
        }
        State::Failed { stage, reason } => {
            let text = match stage {
                Stage::Fetching | Stage::Parsing => NOT_RETRIEVED,
                _ => INTERNAL_ERROR,
            };
            if let Err(e) = api.send_message(chat_id, text).await {
                warn!(chat_id, error = %e, "could not report failure to user");
            }
            if let Some(admin) = admin {
                let text = format!(
                    "Ошибка при обработке {} (пользователь {}), этап {}:\n{}",
                    escape_markdown(url),
                    user_id,
                    stage,
                    escape_markdown(reason)
                );
                if let Err(e) = api.send_message(admin, &clip(&text, MAX_MESSAGE)).await {
                    warn!(error = %e, "could not report failure to admin");
                }
            }
        }
        State::Running(_) => {}
    }
}

/// Report plus a transient JSON snapshot for the admin chat.
async fn send_admin_copy<C: PdfConverter + Sync>(shared: &Shared<C>, admin: i64, user_id: i64, run: &RunReport) {
    let (Some(record), Some(id)) = (&run.record, &run.listing_id) else {
        return;
    };
    let api = &shared.api;
    let caption = short_caption(record, shared.pipeline.attribution());
    let url = escape_markdown(&run.url);

    let sent = match &run.pdf {
        Some(pdf) => {
            let caption = clip(&format!("Отчет по {} (запрос от {}):\n{}", url, user_id, caption), MAX_CAPTION);
            api.send_document(admin, pdf, &caption).await
        }
        None => {
            let text = clip(
                &format!("Отчет по {} (PDF не создан, запрос от {}):\n{}", url, user_id, caption),
                MAX_MESSAGE,
            );
            api.send_message(admin, &text).await.map(|_| ())
        }
    };
    if let Err(e) = sent {
        warn!(listing_id = %id, error = %e, "admin copy failed");
    }

    let dir = shared.downloads_dir.join(id);
    match write_snapshot(&dir, record, Local::now().naive_local()) {
        Ok(path) => {
            if let Err(e) = api.send_document(admin, &path, &format!("JSON: {}", escape_markdown(id))).await {
                warn!(listing_id = %id, error = %e, "snapshot delivery failed");
            }
            remove_snapshot(&path);
        }
        Err(e) => warn!(listing_id = %id, error = %e, "snapshot not written"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageSettings, TelegramSettings};
    use crate::notify::Chat;
    use crate::pdf::WkHtmlToPdf;
    use mockito::Matcher;
    use reqwest::Client;

    fn settings(server: &mockito::Server, downloads: &std::path::Path, admin: Option<i64>) -> Settings {
        Settings {
            downloads_dir: downloads.to_path_buf(),
            images: ImageSettings {
                delay_ms: 0,
                even_extra_delay_ms: 0,
                ..ImageSettings::default()
            },
            telegram: TelegramSettings {
                token: Some("T".into()),
                admin_chat_id: admin,
                api_base: server.url(),
                ..TelegramSettings::default()
            },
            ..Settings::default()
        }
    }

    fn bot(settings: &Settings) -> Bot<WkHtmlToPdf> {
        let api = TelegramApi::new(Client::new(), &settings.telegram).unwrap();
        let pipeline = Pipeline::new(settings, Client::new(), WkHtmlToPdf::new(settings.pdf.clone()))
            .unwrap()
            .without_pdf();
        Bot::new(api, pipeline, settings)
    }

    fn message(chat: i64, text: &str) -> Message {
        Message {
            message_id: 1,
            chat: Chat { id: chat },
            from: None,
            text: Some(text.to_string()),
        }
    }

    const SENT: &str = r#"{"ok":true,"result":{"message_id":10,"chat":{"id":5}}}"#;

    #[test]
    fn claims_are_exclusive_until_dropped() {
        let in_flight = InFlight::default();
        let claim = in_flight.claim("42").unwrap();
        assert!(in_flight.claim("42").is_none());
        assert!(in_flight.claim("43").is_some());
        drop(claim);
        assert!(in_flight.claim("42").is_some());
    }

    #[tokio::test]
    async fn start_gets_welcome() {
        let mut server = mockito::Server::new_async().await;
        let downloads = tempfile::tempdir().unwrap();
        let mock = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::Regex("Привет".into()))
            .with_body(SENT)
            .expect(1)
            .create_async()
            .await;

        let bot = bot(&settings(&server, downloads.path(), None));
        assert!(bot.handle_message(message(5, "/start")).await.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn foreign_url_gets_format_error() {
        let mut server = mockito::Server::new_async().await;
        let downloads = tempfile::tempdir().unwrap();
        let mock = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::Regex("Неверный формат ссылки".into()))
            .with_body(SENT)
            .expect(1)
            .create_async()
            .await;

        let bot = bot(&settings(&server, downloads.path(), None));
        let handle = bot
            .handle_message(message(5, "https://www.cian.ru/rent/flat/1/"))
            .await;
        assert!(handle.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn second_request_for_same_listing_is_turned_away() {
        let mut server = mockito::Server::new_async().await;
        let downloads = tempfile::tempdir().unwrap();
        let mock = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::Regex("уже обрабатывается".into()))
            .with_body(SENT)
            .expect(1)
            .create_async()
            .await;

        let bot = bot(&settings(&server, downloads.path(), None));
        let _claim = bot.shared.in_flight.claim("312256069").unwrap();
        let handle = bot
            .handle_message(message(5, "https://www.cian.ru/sale/flat/312256069/"))
            .await;
        assert!(handle.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn processed_listing_reaches_user_and_admin() {
        let mut server = mockito::Server::new_async().await;
        let downloads = tempfile::tempdir().unwrap();
        let html = std::fs::read_to_string("tests/fixtures/minimal.html").unwrap();
        let _page = server.mock("GET", "/sale/flat/42/").with_body(html).create_async().await;
        let notice = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::Regex("Обрабатываю".into()))
            .with_body(SENT)
            .expect(1)
            .create_async()
            .await;
        let deleted = server
            .mock("POST", "/botT/deleteMessage")
            .match_body(Matcher::PartialJson(serde_json::json!({ "chat_id": 5, "message_id": 10 })))
            .with_body(r#"{"ok":true,"result":true}"#)
            .expect(1)
            .create_async()
            .await;
        let full_text = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({ "chat_id": 5 })),
                Matcher::Regex(r"\*Цена\*".into()),
            ]))
            .with_body(SENT)
            .expect(1)
            .create_async()
            .await;
        let admin_text = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({ "chat_id": 99 })),
                Matcher::Regex("PDF не создан, запрос от 5".into()),
            ]))
            .with_body(SENT)
            .expect(1)
            .create_async()
            .await;
        let snapshot = server
            .mock("POST", "/botT/sendDocument")
            .match_body(Matcher::Regex(r#"filename="listing_42_\d{14}\.json""#.into()))
            .with_body(SENT)
            .expect(1)
            .create_async()
            .await;

        let settings = settings(&server, downloads.path(), Some(99));
        let bot = bot(&settings);
        let url = format!("{}/sale/flat/42/", server.url());
        process(bot.shared.as_ref(), 5, 5, &url).await;

        notice.assert_async().await;
        deleted.assert_async().await;
        full_text.assert_async().await;
        admin_text.assert_async().await;
        snapshot.assert_async().await;
        let leftovers: Vec<_> = std::fs::read_dir(downloads.path().join("42"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".json"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_is_explained() {
        let mut server = mockito::Server::new_async().await;
        let downloads = tempfile::tempdir().unwrap();
        let _page = server.mock("GET", "/sale/flat/42/").with_status(404).create_async().await;
        let _notice = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::Regex("Обрабатываю".into()))
            .with_body(SENT)
            .create_async()
            .await;
        let _deleted = server
            .mock("POST", "/botT/deleteMessage")
            .with_body(r#"{"ok":true,"result":true}"#)
            .create_async()
            .await;
        let explained = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::Regex("Не удалось получить данные".into()))
            .with_body(SENT)
            .expect(1)
            .create_async()
            .await;

        let bot = bot(&settings(&server, downloads.path(), None));
        let url = format!("{}/sale/flat/42/", server.url());
        process(bot.shared.as_ref(), 5, 5, &url).await;
        explained.assert_async().await;
    }
}
