use chrono::{DateTime, Utc};

/// The transport layer's view of a single chat message. This is the input
/// to parsing and validation; it carries only what the moderation core
/// needs, not the platform's full payload.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
    /// Original message timestamp from the platform, not receipt time.
    pub timestamp: DateTime<Utc>,
    /// True when the message replies to another message.
    pub is_reply: bool,
    /// User ids @-mentioned in the message body.
    pub mentions: Vec<String>,
}

/// Inbound channel events the moderation core subscribes to.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    MessageCreate(ChannelMessage),
    MessageUpdate(ChannelMessage),
    MessageDelete {
        channel_id: String,
        message_id: String,
    },
}

impl ChannelEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ChannelEvent::MessageCreate(_) => "message.create",
            ChannelEvent::MessageUpdate(_) => "message.update",
            ChannelEvent::MessageDelete { .. } => "message.delete",
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            ChannelEvent::MessageCreate(msg) | ChannelEvent::MessageUpdate(msg) => &msg.channel_id,
            ChannelEvent::MessageDelete { channel_id, .. } => channel_id,
        }
    }
}
