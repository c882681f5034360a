use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, MessageSender, Shard,
    StreamExt,
};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::channel::{ChannelType, Message};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_model::util::Timestamp;

use jobbot_common::error::Error;
use jobbot_common::models::{ChannelEvent, ChannelMessage};
use jobbot_common::traits::{ChatTransport, ConnectionStatus, PlatformIntegration};

/// The shard runner:
///   - calls `shard.next_event(...)`
///   - updates the in-memory cache
///   - forwards message create/update/delete events to `tx`.
async fn shard_runner(mut shard: Shard, tx: UnboundedSender<ChannelEvent>, cache: Arc<InMemoryCache>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(event) => {
                cache.update(&event);

                match &event {
                    Event::Ready(ready) => {
                        info!(
                            "Shard {shard_id} => READY as {} (ID={})",
                            ready.user.name, ready.user.id
                        );
                    }
                    Event::MessageCreate(msg) => {
                        let _ = tx.send(ChannelEvent::MessageCreate(convert_message(msg)));
                    }
                    Event::MessageUpdate(update) => {
                        let _ = tx.send(ChannelEvent::MessageUpdate(convert_message(update)));
                    }
                    Event::MessageDelete(deletion) => {
                        let _ = tx.send(ChannelEvent::MessageDelete {
                            channel_id: deletion.channel_id.to_string(),
                            message_id: deletion.id.to_string(),
                        });
                    }
                    _ => {
                        trace!("Shard {shard_id} => unhandled event: {event:?}");
                    }
                }
            }
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

fn convert_message(msg: &Message) -> ChannelMessage {
    ChannelMessage {
        id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        author_id: msg.author.id.to_string(),
        author_name: msg.author.name.clone(),
        author_is_bot: msg.author.bot,
        content: msg.content.clone(),
        timestamp: timestamp_to_utc(msg.timestamp),
        is_reply: msg.reference.is_some(),
        mentions: msg.mentions.iter().map(|m| m.id.to_string()).collect(),
    }
}

fn timestamp_to_utc(ts: Timestamp) -> chrono::DateTime<chrono::Utc> {
    // A malformed timestamp falls back to the epoch, which ages straight
    // out of every window instead of counting as fresh.
    chrono::DateTime::from_timestamp_micros(ts.as_micros()).unwrap_or_default()
}

fn parse_id<T>(kind: &str, raw: &str) -> Result<Id<T>, Error> {
    let value: u64 = raw
        .parse()
        .map_err(|_| Error::Platform(format!("Invalid {kind} ID: {raw}")))?;
    Id::new_checked(value).ok_or_else(|| Error::Platform(format!("Invalid {kind} ID: {raw}")))
}

/// Discord runtime: owns the gateway shards and the HTTP client, and
/// exposes the inbound event stream plus the transport operations the
/// moderation core consumes.
pub struct DiscordPlatform {
    pub token: String,
    pub guild_id: String,
    pub connection_status: ConnectionStatus,

    /// Inbound events; `None` until `connect` installs the receiver.
    pub rx: Mutex<Option<UnboundedReceiver<ChannelEvent>>>,

    pub shard_tasks: Vec<JoinHandle<()>>,
    pub shard_senders: Vec<MessageSender>,

    pub http: Option<Arc<HttpClient>>,
    pub cache: Option<Arc<InMemoryCache>>,
}

impl DiscordPlatform {
    pub fn new(token: String, guild_id: String) -> Self {
        Self {
            token,
            guild_id,
            connection_status: ConnectionStatus::Disconnected,
            rx: Mutex::new(None),
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
            http: None,
            cache: None,
        }
    }

    /// Await the next inbound channel event, or `None` once disconnected.
    pub async fn next_event(&self) -> Option<ChannelEvent> {
        let mut guard = self.rx.lock().await;
        match guard.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    fn http_client(&self) -> Result<&Arc<HttpClient>, Error> {
        self.http
            .as_ref()
            .ok_or_else(|| Error::Platform("Discord HTTP client not available".to_string()))
    }
}

#[async_trait]
impl PlatformIntegration for DiscordPlatform {
    async fn connect(&mut self) -> Result<(), Error> {
        if matches!(self.connection_status, ConnectionStatus::Connected) {
            info!("(DiscordPlatform) Already connected => skipping");
            return Ok(());
        }
        if self.token.is_empty() {
            return Err(Error::Auth("Discord token is empty".into()));
        }

        let (tx, rx) = unbounded_channel::<ChannelEvent>();
        {
            let mut guard = self.rx.lock().await;
            *guard = Some(rx);
        }

        let http_client = Arc::new(
            ClientBuilder::new()
                .token(self.token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        self.http = Some(http_client.clone());

        let cache = InMemoryCache::builder()
            .resource_types(ResourceType::GUILD | ResourceType::CHANNEL | ResourceType::MESSAGE)
            .build();
        let cache = Arc::new(cache);
        self.cache = Some(cache.clone());

        let config = Config::new(
            self.token.clone(),
            Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT,
        );

        let shards = gateway::create_recommended(&http_client, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

        for shard in shards {
            self.shard_senders.push(shard.sender());

            let tx_for_shard = tx.clone();
            let cache_for_shard = cache.clone();

            let handle = tokio::spawn(async move {
                shard_runner(shard, tx_for_shard, cache_for_shard).await;
            });
            self.shard_tasks.push(handle);
        }

        self.connection_status = ConnectionStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        self.connection_status = ConnectionStatus::Disconnected;

        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in &mut self.shard_tasks {
            let _ = task.await;
        }

        self.shard_senders.clear();
        self.shard_tasks.clear();

        {
            let mut guard = self.rx.lock().await;
            *guard = None;
        }

        Ok(())
    }

    async fn get_connection_status(&self) -> Result<ConnectionStatus, Error> {
        Ok(self.connection_status.clone())
    }
}

#[async_trait]
impl ChatTransport for DiscordPlatform {
    async fn fetch_messages_before(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: u16,
    ) -> Result<Vec<ChannelMessage>, Error> {
        let http = self.http_client()?;
        let channel = parse_id::<ChannelMarker>("channel", channel_id)?;

        let response = match before {
            Some(before) => {
                http.channel_messages(channel)
                    .before(parse_id::<MessageMarker>("message", before)?)
                    .limit(limit)
                    .await
            }
            None => http.channel_messages(channel).limit(limit).await,
        };

        let messages = response
            .map_err(|e| Error::Platform(format!("Error fetching channel history: {e:?}")))?
            .models()
            .await
            .map_err(|e| Error::Platform(format!("Error parsing channel history: {e:?}")))?;

        Ok(messages.iter().map(convert_message).collect())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, Error> {
        let http = self.http_client()?;
        let channel = parse_id::<ChannelMarker>("channel", channel_id)?;

        let message = http
            .create_message(channel)
            .content(content)
            .await
            .map_err(|e| Error::Platform(format!("Error sending Discord message: {e:?}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error parsing sent message: {e:?}")))?;

        Ok(message.id.to_string())
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), Error> {
        let http = self.http_client()?;
        let channel = parse_id::<ChannelMarker>("channel", channel_id)?;
        let message = parse_id::<MessageMarker>("message", message_id)?;

        http.update_message(channel, message)
            .content(Some(content))
            .await
            .map_err(|e| Error::Platform(format!("Error editing Discord message: {e:?}")))?;

        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), Error> {
        let http = self.http_client()?;
        let channel = parse_id::<ChannelMarker>("channel", channel_id)?;
        let message = parse_id::<MessageMarker>("message", message_id)?;

        http.delete_message(channel, message)
            .await
            .map_err(|e| Error::Platform(format!("Error deleting Discord message: {e:?}")))?;

        Ok(())
    }

    async fn create_thread(&self, channel_id: &str, name: &str) -> Result<String, Error> {
        let http = self.http_client()?;
        let channel = parse_id::<ChannelMarker>("channel", channel_id)?;

        let thread = http
            .create_thread(channel, name, ChannelType::PublicThread)
            .await
            .map_err(|e| Error::Platform(format!("Error creating thread: {e:?}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error parsing created thread: {e:?}")))?;

        Ok(thread.id.to_string())
    }

    async fn timeout_member(&self, author_id: &str, duration: Duration) -> Result<(), Error> {
        let http = self.http_client()?;
        let guild = parse_id::<GuildMarker>("guild", &self.guild_id)?;
        let user = parse_id::<UserMarker>("user", author_id)?;

        let until = chrono::Utc::now()
            + chrono::Duration::from_std(duration)
                .map_err(|e| Error::Platform(format!("Timeout duration out of range: {e}")))?;
        let until = Timestamp::from_secs(until.timestamp())
            .map_err(|e| Error::Platform(format!("Invalid timeout timestamp: {e:?}")))?;

        http.update_guild_member(guild, user)
            .communication_disabled_until(Some(until))
            .await
            .map_err(|e| Error::Platform(format!("Error timing out member: {e:?}")))?;

        Ok(())
    }
}
