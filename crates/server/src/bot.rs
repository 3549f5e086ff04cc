//! Telegram front-end: command dispatch and the update polling loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use ferry_core::{FileRecord, RecordId, Token, size_label};
use ferry_registry::{FileRegistry, RegistryError, UploadRequest};
use ferry_relay::ContentSource;
use ferry_telegram::{Message, TelegramClient, TelegramError};

use crate::commands::Command;
use crate::links::{LinkPresenter, deep_link};

const INVALID_LINK: &str = "Sorry, this file link is invalid or expired.";
const DELIVERY_FAILED: &str = "Failed to deliver file. It might have been deleted.";
const TEMPORARILY_UNAVAILABLE: &str = "Something went wrong on our side. Please try again later.";
const LINK_USAGE: &str =
    "Reply to the file (video/document/photo) with /link to get a sharable link.";
const UNSUPPORTED_MEDIA: &str = "Unsupported media type. Reply to a document/video/photo/audio.";
const LOG_CHANNEL_FAILED: &str =
    "Bot couldn't save file to log channel. Make sure bot is admin of the log channel.";
const SEARCH_USAGE: &str = "Usage: /search <filename or keyword>";
const NO_RESULTS: &str = "No files found for that query.";
const DELFILE_USAGE: &str = "Usage: /delfile <db_id>";
const INVALID_ID: &str = "Invalid id.";
const FILE_NOT_FOUND: &str = "File not found.";
const FILE_DELETED: &str =
    "Deleted file record and removed file from log channel (if possible).";
const BROADCAST_USAGE: &str =
    "Reply to a message with /broadcast to send it to the update channel.";
const BROADCAST_SENT: &str = "Broadcast sent to update channel.";
const BROADCAST_FAILED: &str =
    "Broadcast failed. Make sure bot has rights in the update channel.";
const NO_UPDATE_CHANNEL: &str = "No update channel is configured.";
const PONG: &str = "Pong!";

/// Pause before retrying a failed `getUpdates` call.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// How long shutdown waits for in-flight messages.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Outgoing chat operations the bot needs.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError>;

    /// Copy a message into `chat_id` without a forward header.
    async fn copy(&self, chat_id: i64, from_chat_id: i64, message_id: i64)
    -> Result<(), TelegramError>;
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.send_message(chat_id, text).await.map(|_| ())
    }

    async fn copy(
        &self,
        chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError> {
        self.copy_message(chat_id, from_chat_id, message_id, None)
            .await
            .map(|_| ())
    }
}

/// Static settings for the bot front-end.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Username used in deep links, without the `@`.
    pub bot_username: String,
    pub admin_ids: Vec<i64>,
    pub update_channel: Option<i64>,
    /// Shown to uploaders in the `/link` reply.
    pub retention_hours: u64,
    pub search_limit: usize,
}

/// Descriptive metadata for a replied-to media message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub display_name: Option<String>,
    pub size_label: Option<String>,
}

/// Work out name and size for supported media, with per-kind name defaults.
///
/// Returns `None` when the message carries no document, video, audio or photo.
pub fn describe_media(message: &Message) -> Option<MediaInfo> {
    let id = message.message_id;
    let label = |bytes: Option<u64>| bytes.map(|b| size_label(Some(b)));

    if let Some(document) = &message.document {
        return Some(MediaInfo {
            display_name: document.file_name.clone(),
            size_label: label(document.file_size),
        });
    }
    if let Some(video) = &message.video {
        return Some(MediaInfo {
            display_name: Some(
                video
                    .file_name
                    .clone()
                    .unwrap_or_else(|| format!("video_{id}.mp4")),
            ),
            size_label: label(video.file_size),
        });
    }
    if let Some(audio) = &message.audio {
        return Some(MediaInfo {
            display_name: Some(
                audio
                    .file_name
                    .clone()
                    .unwrap_or_else(|| format!("audio_{id}")),
            ),
            size_label: label(audio.file_size),
        });
    }
    if let Some(photo) = message.photo.as_ref().and_then(|sizes| sizes.last()) {
        return Some(MediaInfo {
            display_name: Some(format!("photo_{id}.jpg")),
            size_label: label(photo.file_size),
        });
    }
    None
}

/// Dispatches bot commands to the file registry.
pub struct Bot {
    registry: Arc<FileRegistry>,
    messenger: Arc<dyn Messenger>,
    links: LinkPresenter,
    settings: BotSettings,
}

impl Bot {
    pub fn new(
        registry: Arc<FileRegistry>,
        messenger: Arc<dyn Messenger>,
        links: LinkPresenter,
        settings: BotSettings,
    ) -> Self {
        Self {
            registry,
            messenger,
            links,
            settings,
        }
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.settings.admin_ids.contains(&user_id)
    }

    /// Handle one incoming message.
    ///
    /// User commands are only served in private chats. Administrative
    /// commands from anyone not listed in `admin_ids` are ignored.
    #[instrument(skip(self, message), fields(chat_id = message.chat.id, message_id = message.message_id))]
    pub async fn handle(&self, message: &Message) {
        let Some(command) = message.text.as_deref().and_then(Command::parse) else {
            return;
        };

        if command.is_admin_only() {
            let sender = message.from.as_ref().map(|u| u.id);
            if !sender.is_some_and(|id| self.is_admin(id)) {
                debug!(?sender, "ignoring administrative command from non-admin");
                return;
            }
        } else if !message.chat.is_private() {
            return;
        }

        let reply = match command {
            Command::Start(payload) => self.start(message, payload.as_deref()).await,
            Command::Help => Some(self.help_text()),
            Command::Link => Some(self.link(message).await),
            Command::Search(query) => Some(self.search(query.as_deref()).await),
            Command::DelFile(raw) => Some(self.delete(raw.as_deref()).await.to_owned()),
            Command::Broadcast => Some(self.broadcast(message).await.to_owned()),
            Command::Ping => Some(PONG.to_owned()),
        };

        if let Some(text) = reply {
            self.reply(message.chat.id, &text).await;
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "failed to send reply");
        }
    }

    async fn start(&self, message: &Message, payload: Option<&str>) -> Option<String> {
        match payload {
            Some(token) if Token::is_token(token) => self
                .deliver(message.chat.id, token)
                .await
                .map(str::to_owned),
            _ => Some(self.greeting(message)),
        }
    }

    /// Resolve and deliver a token. Returns the error reply, if any.
    async fn deliver(&self, chat_id: i64, token: &str) -> Option<&'static str> {
        let record = match self.registry.resolve(token).await {
            Ok(record) => record,
            Err(e) if e.is_link_error() => return Some(INVALID_LINK),
            Err(e) => {
                error!(error = %e, "failed to resolve file link");
                return Some(TEMPORARILY_UNAVAILABLE);
            }
        };

        let caption = format!("{}\nSize: {}", record.display_name, record.size_label);
        match self.registry.deliver(&record, chat_id, Some(&caption)).await {
            Ok(()) => {
                info!(record_id = %record.id, "file delivered");
                None
            }
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "failed to deliver file");
                Some(DELIVERY_FAILED)
            }
        }
    }

    fn greeting(&self, message: &Message) -> String {
        let name = message
            .from
            .as_ref()
            .map_or("User", |u| u.first_name.as_str());
        format!(
            "Hi {name}! I'm @{bot}.\n\n\
             Reply to any document, video, audio or photo with /link and I'll give you a \
             sharable link to it. Links stay valid for {hours} hours.\n\n\
             Send /help to see everything I can do.",
            bot = self.settings.bot_username,
            hours = self.settings.retention_hours,
        )
    }

    fn help_text(&self) -> String {
        format!(
            "/link - reply to a file to get a sharable link\n\
             /search <keyword> - find shared files by name\n\
             /start <token> - fetch a shared file\n\n\
             Files are removed automatically after {} hours.",
            self.settings.retention_hours
        )
    }

    async fn link(&self, message: &Message) -> String {
        let Some(media_message) = message.reply_to_message.as_deref() else {
            return LINK_USAGE.to_owned();
        };
        let Some(media) = describe_media(media_message) else {
            return UNSUPPORTED_MEDIA.to_owned();
        };

        let (owner_id, owner_label) = message.from.as_ref().map_or_else(
            || (message.chat.id, ferry_core::UNKNOWN.to_owned()),
            |u| (u.id, u.label().to_owned()),
        );
        let request = UploadRequest {
            source: ContentSource::new(media_message.chat.id, media_message.message_id),
            owner_id,
            owner_label,
            display_name: media.display_name,
            size_label: media.size_label,
        };

        match self.registry.create(request).await {
            Ok(token) => {
                let direct = deep_link(&self.settings.bot_username, &token);
                let short = self.links.shorten(&direct).await;
                format!(
                    "Link generated ✅\n\nDirect: {direct}\n\nShort: {short}\n\n\
                     Note: File will auto-delete after {} hours.",
                    self.settings.retention_hours
                )
            }
            Err(RegistryError::RelayUnavailable(e)) => {
                warn!(error = %e, "failed to copy upload into the relay");
                LOG_CHANNEL_FAILED.to_owned()
            }
            Err(e) => {
                error!(error = %e, "failed to create file record");
                TEMPORARILY_UNAVAILABLE.to_owned()
            }
        }
    }

    fn search_line(&self, record: &FileRecord) -> String {
        let token = Token::encode(&record.id);
        format!(
            "{} — /start {token} → {}",
            record.display_name,
            deep_link(&self.settings.bot_username, &token)
        )
    }

    async fn search(&self, query: Option<&str>) -> String {
        let Some(query) = query else {
            return SEARCH_USAGE.to_owned();
        };

        let found: Result<Vec<FileRecord>, RegistryError> = self
            .registry
            .search(query, self.settings.search_limit)
            .try_collect()
            .await;

        match found {
            Ok(records) if records.is_empty() => NO_RESULTS.to_owned(),
            Ok(records) => records
                .iter()
                .map(|r| self.search_line(r))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => {
                error!(error = %e, "search failed");
                TEMPORARILY_UNAVAILABLE.to_owned()
            }
        }
    }

    /// Administrative delete. Accepts a bare record id or a full token.
    async fn delete(&self, raw: Option<&str>) -> &'static str {
        let Some(raw) = raw else {
            return DELFILE_USAGE;
        };
        let Some(id) = raw
            .parse::<RecordId>()
            .ok()
            .or_else(|| Token::decode(raw).ok())
        else {
            return INVALID_ID;
        };

        match self.registry.delete(&id).await {
            Ok(()) => FILE_DELETED,
            Err(RegistryError::NotFound(_)) => FILE_NOT_FOUND,
            Err(e) => {
                error!(record_id = %id, error = %e, "administrative delete failed");
                TEMPORARILY_UNAVAILABLE
            }
        }
    }

    async fn broadcast(&self, message: &Message) -> &'static str {
        let Some(channel) = self.settings.update_channel else {
            return NO_UPDATE_CHANNEL;
        };
        let Some(original) = message.reply_to_message.as_deref() else {
            return BROADCAST_USAGE;
        };

        match self
            .messenger
            .copy(channel, original.chat.id, original.message_id)
            .await
        {
            Ok(()) => {
                info!(channel, "broadcast sent");
                BROADCAST_SENT
            }
            Err(e) => {
                warn!(channel, error = %e, "broadcast failed");
                BROADCAST_FAILED
            }
        }
    }
}

/// Long-poll `getUpdates` and hand each message to `bot` on its own task
/// until `shutdown` resolves.
///
/// At most `max_concurrent` messages are handled at once. On shutdown the
/// loop stops polling and waits for in-flight messages to finish.
pub async fn run_polling<F>(
    bot: Arc<Bot>,
    client: Arc<TelegramClient>,
    poll_timeout: Duration,
    max_concurrent: usize,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let permits = max_concurrent.max(1);
    let semaphore = Arc::new(Semaphore::new(permits));
    let mut offset: Option<i64> = None;
    tokio::pin!(shutdown);

    info!(max_concurrent = permits, "bot polling for updates");

    loop {
        let result = tokio::select! {
            () = &mut shutdown => break,
            result = client.get_updates(offset, poll_timeout) => result,
        };

        match result {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let Some(message) = update.message else {
                        continue;
                    };
                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                        continue;
                    };
                    let bot = Arc::clone(&bot);
                    tokio::spawn(async move {
                        bot.handle(&message).await;
                        drop(permit);
                    });
                }
            }
            Err(e) => {
                let backoff = match &e {
                    TelegramError::RateLimited {
                        retry_after: Some(seconds),
                    } => Duration::from_secs(*seconds),
                    _ => POLL_ERROR_BACKOFF,
                };
                warn!(error = %e, ?backoff, "getUpdates failed; backing off");
                tokio::select! {
                    () = &mut shutdown => break,
                    () = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }

    info!("bot polling stopped; waiting for in-flight messages");
    let all = u32::try_from(permits).unwrap_or(u32::MAX);
    if tokio::time::timeout(DRAIN_TIMEOUT, semaphore.acquire_many(all))
        .await
        .is_err()
    {
        warn!("timed out waiting for in-flight messages");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeDelta, TimeZone, Utc};
    use tokio::sync::Mutex;

    use ferry_core::ManualClock;
    use ferry_registry::FileRegistryBuilder;
    use ferry_relay::MemoryRelay;
    use ferry_store_memory::MemoryMetadataStore;

    use super::*;
    use crate::config::LinksConfig;

    const ADMIN: i64 = 1;
    const USER: i64 = 42;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        Text { chat_id: i64, text: String },
        Copy { chat_id: i64, from_chat_id: i64, message_id: i64 },
    }

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<Sent>>,
    }

    impl RecordingMessenger {
        async fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .await
                .iter()
                .filter_map(|s| match s {
                    Sent::Text { text, .. } => Some(text.clone()),
                    Sent::Copy { .. } => None,
                })
                .collect()
        }

        async fn last_text(&self) -> String {
            self.texts().await.pop().expect("a reply was sent")
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
            self.sent.lock().await.push(Sent::Text {
                chat_id,
                text: text.to_owned(),
            });
            Ok(())
        }

        async fn copy(
            &self,
            chat_id: i64,
            from_chat_id: i64,
            message_id: i64,
        ) -> Result<(), TelegramError> {
            self.sent.lock().await.push(Sent::Copy {
                chat_id,
                from_chat_id,
                message_id,
            });
            Ok(())
        }
    }

    struct Harness {
        bot: Bot,
        relay: Arc<MemoryRelay>,
        clock: Arc<ManualClock>,
        messenger: Arc<RecordingMessenger>,
    }

    fn harness() -> Harness {
        let relay = Arc::new(MemoryRelay::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let registry = FileRegistryBuilder::new()
            .store(Arc::new(MemoryMetadataStore::new()))
            .relay(relay.clone())
            .clock(clock.clone())
            .retention(Duration::from_secs(6 * 3600))
            .build()
            .unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let links = LinkPresenter::new(LinksConfig {
            tinyurl_fallback: false,
            ..LinksConfig::default()
        })
        .unwrap();
        let bot = Bot::new(
            Arc::new(registry),
            messenger.clone(),
            links,
            BotSettings {
                bot_username: "ferry_bot".into(),
                admin_ids: vec![ADMIN],
                update_channel: Some(-100_999),
                retention_hours: 6,
                search_limit: 10,
            },
        );
        Harness {
            bot,
            relay,
            clock,
            messenger,
        }
    }

    fn message(from: i64, text: &str) -> Message {
        serde_json::from_value(serde_json::json!({
            "message_id": 100,
            "chat": {"id": from, "type": "private"},
            "from": {"id": from, "first_name": "Ada", "username": "ada"},
            "text": text,
        }))
        .unwrap()
    }

    fn reply_to(from: i64, text: &str, media: serde_json::Value) -> Message {
        let mut replied = serde_json::json!({
            "message_id": 55,
            "chat": {"id": from, "type": "private"},
        });
        if let (Some(target), Some(extra)) = (replied.as_object_mut(), media.as_object()) {
            for (k, v) in extra {
                target.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(serde_json::json!({
            "message_id": 101,
            "chat": {"id": from, "type": "private"},
            "from": {"id": from, "first_name": "Ada", "username": "ada"},
            "text": text,
            "reply_to_message": replied,
        }))
        .unwrap()
    }

    fn document(name: &str, size: u64) -> serde_json::Value {
        serde_json::json!({"document": {"file_id": "BQAD", "file_name": name, "file_size": size}})
    }

    fn token_in(reply: &str) -> String {
        let start = reply.find("start=").expect("deep link in reply") + "start=".len();
        reply[start..]
            .split_whitespace()
            .next()
            .unwrap()
            .to_owned()
    }

    async fn share(h: &Harness, name: &str) -> String {
        h.bot
            .handle(&reply_to(USER, "/link", document(name, 2_097_152)))
            .await;
        token_in(&h.messenger.last_text().await)
    }

    #[tokio::test]
    async fn link_then_start_delivers_with_caption() {
        let h = harness();
        h.bot
            .handle(&reply_to(USER, "/link", document("report.pdf", 2_097_152)))
            .await;
        let reply = h.messenger.last_text().await;
        assert!(reply.contains("Direct: https://t.me/ferry_bot?start=file_"));
        assert!(reply.contains("auto-delete after 6 hours"));

        let token = token_in(&reply);
        h.bot.handle(&message(USER, &format!("/start {token}"))).await;

        let deliveries = h.relay.deliveries().await;
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].destination_chat, USER);
        assert_eq!(deliveries[0].caption.as_deref(), Some("report.pdf\nSize: 2.0 MB"));
        // Successful delivery sends no extra text.
        assert_eq!(h.messenger.texts().await.len(), 1);
    }

    #[tokio::test]
    async fn start_accepts_equals_payload() {
        let h = harness();
        let token = share(&h, "a.pdf").await;
        h.bot.handle(&message(USER, &format!("/start={token}"))).await;
        assert_eq!(h.relay.deliveries().await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_and_expired_links_get_the_same_reply() {
        let h = harness();
        h.bot.handle(&message(USER, "/start file_nothex")).await;
        assert_eq!(h.messenger.last_text().await, INVALID_LINK);

        let token = share(&h, "a.pdf").await;
        h.clock.advance(TimeDelta::hours(7));
        h.bot.handle(&message(USER, &format!("/start {token}"))).await;
        assert_eq!(h.messenger.last_text().await, INVALID_LINK);
        assert!(h.relay.deliveries().await.is_empty());
    }

    #[tokio::test]
    async fn missing_relay_copy_reports_delivery_failure() {
        let h = harness();
        let token = share(&h, "a.pdf").await;
        let locator = h.bot.registry.resolve(&token).await.unwrap().content_locator;
        assert!(h.relay.lose(&locator));

        h.bot.handle(&message(USER, &format!("/start {token}"))).await;
        assert_eq!(h.messenger.last_text().await, DELIVERY_FAILED);
    }

    #[tokio::test]
    async fn bare_start_greets() {
        let h = harness();
        h.bot.handle(&message(USER, "/start")).await;
        let reply = h.messenger.last_text().await;
        assert!(reply.starts_with("Hi Ada!"));
        assert!(reply.contains("@ferry_bot"));
    }

    #[tokio::test]
    async fn link_requires_supported_media_reply() {
        let h = harness();
        h.bot.handle(&message(USER, "/link")).await;
        assert_eq!(h.messenger.last_text().await, LINK_USAGE);

        h.bot
            .handle(&reply_to(USER, "/link", serde_json::json!({"text": "just words"})))
            .await;
        assert_eq!(h.messenger.last_text().await, UNSUPPORTED_MEDIA);
        assert!(h.relay.is_empty());
    }

    #[tokio::test]
    async fn link_reports_relay_failure() {
        let h = harness();
        h.relay.fail_stores(true);
        h.bot
            .handle(&reply_to(USER, "/link", document("a.pdf", 10)))
            .await;
        assert_eq!(h.messenger.last_text().await, LOG_CHANNEL_FAILED);
    }

    #[tokio::test]
    async fn search_lists_matches_newest_first() {
        let h = harness();
        let older = share(&h, "Report_Final.pdf").await;
        h.clock.advance(TimeDelta::minutes(1));
        let newer = share(&h, "final_cut.mp4").await;
        share(&h, "notes.txt").await;

        h.bot.handle(&message(USER, "/search final")).await;
        let reply = h.messenger.last_text().await;
        let lines: Vec<&str> = reply.split("\n\n").collect();
        assert_eq!(
            lines,
            vec![
                format!("final_cut.mp4 — /start {newer} → https://t.me/ferry_bot?start={newer}"),
                format!("Report_Final.pdf — /start {older} → https://t.me/ferry_bot?start={older}"),
            ]
        );
    }

    #[tokio::test]
    async fn search_edge_cases() {
        let h = harness();
        h.bot.handle(&message(USER, "/search")).await;
        assert_eq!(h.messenger.last_text().await, SEARCH_USAGE);

        h.bot.handle(&message(USER, "/search nothing")).await;
        assert_eq!(h.messenger.last_text().await, NO_RESULTS);
    }

    #[tokio::test]
    async fn admin_commands_ignore_non_admins() {
        let h = harness();
        h.bot.handle(&message(USER, "/ping")).await;
        h.bot.handle(&message(USER, "/delfile abc")).await;
        assert!(h.messenger.sent.lock().await.is_empty());

        h.bot.handle(&message(ADMIN, "/ping")).await;
        assert_eq!(h.messenger.last_text().await, PONG);
    }

    #[tokio::test]
    async fn delfile_flow() {
        let h = harness();
        let token = share(&h, "a.pdf").await;
        let id = Token::decode(&token).unwrap();

        h.bot.handle(&message(ADMIN, "/delfile")).await;
        assert_eq!(h.messenger.last_text().await, DELFILE_USAGE);

        h.bot.handle(&message(ADMIN, "/delfile not-an-id")).await;
        assert_eq!(h.messenger.last_text().await, INVALID_ID);

        h.bot.handle(&message(ADMIN, &format!("/delfile {id}"))).await;
        assert_eq!(h.messenger.last_text().await, FILE_DELETED);
        assert!(h.relay.is_empty());

        h.bot.handle(&message(ADMIN, &format!("/delfile {token}"))).await;
        assert_eq!(h.messenger.last_text().await, FILE_NOT_FOUND);
    }

    #[tokio::test]
    async fn broadcast_copies_to_update_channel() {
        let h = harness();
        h.bot
            .handle(&reply_to(ADMIN, "/broadcast", serde_json::json!({"text": "news"})))
            .await;
        let sent = h.messenger.sent.lock().await.clone();
        assert_eq!(
            sent[0],
            Sent::Copy {
                chat_id: -100_999,
                from_chat_id: ADMIN,
                message_id: 55
            }
        );
        assert_eq!(h.messenger.last_text().await, BROADCAST_SENT);

        h.bot.handle(&message(ADMIN, "/broadcast")).await;
        assert_eq!(h.messenger.last_text().await, BROADCAST_USAGE);
    }

    #[tokio::test]
    async fn user_commands_only_in_private_chats() {
        let h = harness();
        let group: Message = serde_json::from_value(serde_json::json!({
            "message_id": 1,
            "chat": {"id": -500, "type": "group"},
            "from": {"id": USER, "first_name": "Ada"},
            "text": "/help",
        }))
        .unwrap();
        h.bot.handle(&group).await;
        assert!(h.messenger.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn polling_hands_updates_to_the_bot() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await.unwrap();
            let body = r#"{"ok":true,"result":[{"update_id":41,"message":{"message_id":1,"chat":{"id":1,"type":"private"},"from":{"id":1,"first_name":"Root"},"text":"/ping"}}]}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let h = harness();
        let messenger = h.messenger.clone();
        let client = Arc::new(
            TelegramClient::new(
                ferry_telegram::TelegramConfig::new("1:test").with_api_base_url(base_url),
            )
            .unwrap(),
        );
        let shutdown = {
            let messenger = messenger.clone();
            async move {
                while messenger.sent.lock().await.is_empty() {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        };

        tokio::time::timeout(
            Duration::from_secs(10),
            run_polling(Arc::new(h.bot), client, Duration::ZERO, 4, shutdown),
        )
        .await
        .expect("polling should stop on shutdown");
        server.await.unwrap();

        assert_eq!(
            messenger.sent.lock().await.clone(),
            vec![Sent::Text {
                chat_id: 1,
                text: PONG.to_owned()
            }]
        );
    }

    #[test]
    fn media_name_defaults() {
        let video: Message = serde_json::from_value(serde_json::json!({
            "message_id": 9,
            "chat": {"id": 1, "type": "private"},
            "video": {"file_id": "v", "file_size": 5_242_880},
        }))
        .unwrap();
        assert_eq!(
            describe_media(&video),
            Some(MediaInfo {
                display_name: Some("video_9.mp4".into()),
                size_label: Some("5.0 MB".into()),
            })
        );

        let audio: Message = serde_json::from_value(serde_json::json!({
            "message_id": 9,
            "chat": {"id": 1, "type": "private"},
            "audio": {"file_id": "a"},
        }))
        .unwrap();
        assert_eq!(
            describe_media(&audio),
            Some(MediaInfo {
                display_name: Some("audio_9".into()),
                size_label: None,
            })
        );

        let photo: Message = serde_json::from_value(serde_json::json!({
            "message_id": 9,
            "chat": {"id": 1, "type": "private"},
            "photo": [
                {"file_id": "small", "file_size": 1000},
                {"file_id": "large", "file_size": 262_144},
            ],
        }))
        .unwrap();
        assert_eq!(
            describe_media(&photo),
            Some(MediaInfo {
                display_name: Some("photo_9.jpg".into()),
                size_label: Some("0.25 MB".into()),
            })
        );
    }
}
