//! Message, reply, and permission types shared by the pipeline and commands.

use std::collections::BTreeSet;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

pub type GuildId = u64;
pub type ChannelId = u64;
pub type UserId = u64;
pub type MessageId = u64;

/// Effective permissions of a message author in the originating channel.
///
/// The gateway adapter computes these from the platform's permission model;
/// the command dispatcher only compares against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// May change server-wide bot configuration.
    ManageGuild,
    /// May read the channel the command was issued in.
    ReadChannels,
    /// May inspect server activity statistics.
    ViewAuditLog,
}

/// A normalized inbound chat message, produced by a gateway adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Tenant scope; `None` for direct messages.
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author_id: UserId,
    pub author_name: String,
    /// Whether the author is itself an automated account.
    pub author_is_bot: bool,
    pub body: String,
    /// Channels explicitly mentioned in the message, in order of appearance.
    pub mentioned_channels: Vec<ChannelId>,
    pub author_permissions: BTreeSet<Permission>,
}

impl InboundMessage {
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }

    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.author_permissions.contains(&permission)
    }
}

/// An outbound reply, ready for a gateway adapter to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPayload {
    pub text: String,
    /// Message to attach the reply to, if the platform supports references.
    pub reply_to: Option<MessageId>,
}

impl ReplyPayload {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_to: None,
        }
    }

    #[must_use]
    pub fn replying_to(text: impl Into<String>, message_id: MessageId) -> Self {
        Self {
            text: text.into(),
            reply_to: Some(message_id),
        }
    }
}

/// Deliver replies back to the chat platform. The gateway adapter provides
/// the concrete implementation.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, channel_id: ChannelId, payload: ReplyPayload) -> anyhow::Result<()>;

    /// Show a "typing" indicator while searches run. No-op by default.
    async fn send_typing(&self, _channel_id: ChannelId) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Resolve guild channels by plaintext name, for command arguments that are
/// neither mentions nor numeric ids. Backed by the gateway's channel cache.
pub trait ChannelResolver: Send + Sync {
    fn channel_by_name(&self, guild_id: GuildId, name: &str) -> Option<ChannelId>;
}

/// Render a channel id the way the chat platform displays a channel mention.
#[must_use]
pub fn channel_mention(channel_id: ChannelId) -> String {
    format!("<#{channel_id}>")
}
