//! Which channels are eligible for search replies, and where replies go.

use {
    lorebot_common::types::ChannelId,
    lorebot_settings::GuildSettings,
};

/// Whether a channel should get token responses. `settings` is `None` for
/// direct (non-guild) channels, which are always tracked.
///
/// Guild rules, in order: the configured bot channel is always tracked; a
/// blacklisted channel never is (blacklist beats whitelist); a non-empty
/// whitelist tracks only its members; otherwise everything is tracked.
#[must_use]
pub fn is_tracked(channel: ChannelId, settings: Option<&GuildSettings>) -> bool {
    let Some(settings) = settings else {
        return true;
    };

    if settings.bot_channel == Some(channel) {
        return true;
    }
    if settings.channel_blacklist.contains(&channel) {
        return false;
    }
    if !settings.channel_whitelist.is_empty() {
        return settings.channel_whitelist.contains(&channel);
    }
    true
}

/// Search replies go to the guild's bot channel when one is configured,
/// otherwise back to the originating channel.
#[must_use]
pub fn reply_channel(origin: ChannelId, settings: Option<&GuildSettings>) -> ChannelId {
    settings
        .and_then(|s| s.bot_channel)
        .unwrap_or(origin)
}
