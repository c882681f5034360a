use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::message::ChannelMessage;

/// The narrow boundary to the message-transport collaborator. Everything
/// here is asynchronous and may fail (network, permissions, already-deleted
/// targets); the moderation core treats every call as best-effort and never
/// retries, because a duplicate moderation action is worse than a missed one.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Page backward through channel history: messages strictly older than
    /// `before` (or the newest messages when `before` is `None`), newest
    /// first, at most `limit` of them.
    async fn fetch_messages_before(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: u16,
    ) -> Result<Vec<ChannelMessage>, Error>;

    /// Send a message; returns the new message's id.
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, Error>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), Error>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), Error>;

    /// Create a thread under `channel_id`; returns the thread's channel id.
    async fn create_thread(&self, channel_id: &str, name: &str) -> Result<String, Error>;

    /// Restrict a member from participating for `duration`.
    async fn timeout_member(&self, author_id: &str, duration: Duration) -> Result<(), Error>;
}
