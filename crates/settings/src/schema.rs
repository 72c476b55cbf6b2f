//! The per-guild settings record and its `key=value` wire form.

use std::collections::BTreeSet;

use tracing::warn;

use {
    crate::error::{Error, Result},
    lorebot_common::types::{ChannelId, GuildId},
};

pub const TOKEN_LEFT_DEFAULT: &str = "[[";
pub const TOKEN_RIGHT_DEFAULT: &str = "]]";
pub const SPLIT_DEFAULT: &str = "|";

const KEY_LOG_STATS: &str = "log_stats";
const KEY_TOKEN_LEFT: &str = "token_left";
const KEY_TOKEN_RIGHT: &str = "token_right";
const KEY_SPLIT: &str = "split_marker";
const KEY_BOT_CHANNEL: &str = "bot_channel";
const KEY_WHITELIST: &str = "whitelist";
const KEY_BLACKLIST: &str = "blacklist";

/// Sentinel distinguishing "no bot channel" from a numeric channel id.
const BOT_CHANNEL_UNSET: &str = "null";

/// Outcome of toggling a channel on a filter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// The channel was added; `pruned` is set when it was removed from the
    /// opposite list at the same time.
    Added { pruned: bool },
    /// The channel was already present and has been removed.
    Removed,
}

/// Configuration scope for a single guild.
///
/// The delimiter fields are private: they must never be empty, and the
/// setters are the enforcement point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSettings {
    id: GuildId,
    pub log_stats: bool,
    token_left: String,
    token_right: String,
    split_marker: String,
    pub bot_channel: Option<ChannelId>,
    pub channel_whitelist: BTreeSet<ChannelId>,
    pub channel_blacklist: BTreeSet<ChannelId>,
}

impl GuildSettings {
    /// Default settings: stats logging on, `[[query|meta]]` tokens, no bot
    /// channel, no channel filters.
    #[must_use]
    pub fn new(id: GuildId) -> Self {
        Self {
            id,
            log_stats: true,
            token_left: TOKEN_LEFT_DEFAULT.into(),
            token_right: TOKEN_RIGHT_DEFAULT.into(),
            split_marker: SPLIT_DEFAULT.into(),
            bot_channel: None,
            channel_whitelist: BTreeSet::new(),
            channel_blacklist: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> GuildId {
        self.id
    }

    #[must_use]
    pub fn token_left(&self) -> &str {
        &self.token_left
    }

    #[must_use]
    pub fn token_right(&self) -> &str {
        &self.token_right
    }

    #[must_use]
    pub fn split_marker(&self) -> &str {
        &self.split_marker
    }

    pub fn set_token_left(&mut self, value: impl Into<String>) -> Result<()> {
        Self::assign_delimiter(&mut self.token_left, value.into())
    }

    pub fn set_token_right(&mut self, value: impl Into<String>) -> Result<()> {
        Self::assign_delimiter(&mut self.token_right, value.into())
    }

    pub fn set_split_marker(&mut self, value: impl Into<String>) -> Result<()> {
        Self::assign_delimiter(&mut self.split_marker, value.into())
    }

    fn assign_delimiter(slot: &mut String, value: String) -> Result<()> {
        if value.is_empty() {
            return Err(Error::EmptyDelimiter);
        }
        *slot = value;
        Ok(())
    }

    /// Toggle a channel on the whitelist. Adding prunes it from the blacklist.
    pub fn toggle_whitelist(&mut self, channel: ChannelId) -> FilterChange {
        Self::toggle(&mut self.channel_whitelist, &mut self.channel_blacklist, channel)
    }

    /// Toggle a channel on the blacklist. Adding prunes it from the whitelist.
    pub fn toggle_blacklist(&mut self, channel: ChannelId) -> FilterChange {
        Self::toggle(&mut self.channel_blacklist, &mut self.channel_whitelist, channel)
    }

    fn toggle(
        list: &mut BTreeSet<ChannelId>,
        other: &mut BTreeSet<ChannelId>,
        channel: ChannelId,
    ) -> FilterChange {
        if list.remove(&channel) {
            FilterChange::Removed
        } else {
            list.insert(channel);
            FilterChange::Added {
                pruned: other.remove(&channel),
            }
        }
    }

    /// Reset every field except the id back to defaults.
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }

    // ── Wire form ───────────────────────────────────────────────────────────

    /// Serialize to the newline-separated `key=value` on-disk form.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let mut put = |key: &str, value: &str| {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        };

        put(KEY_LOG_STATS, if self.log_stats { "true" } else { "false" });
        put(KEY_TOKEN_LEFT, &self.token_left);
        put(KEY_TOKEN_RIGHT, &self.token_right);
        put(KEY_SPLIT, &self.split_marker);
        let bot_channel = self
            .bot_channel
            .map_or_else(|| BOT_CHANNEL_UNSET.to_string(), |id| id.to_string());
        put(KEY_BOT_CHANNEL, &bot_channel);
        put(KEY_WHITELIST, &join_ids(&self.channel_whitelist));
        put(KEY_BLACKLIST, &join_ids(&self.channel_blacklist));
        out
    }

    /// Parse the on-disk form. Any field whose stored value fails to parse is
    /// logged and left at its default; a corrupt field never aborts the load.
    #[must_use]
    pub fn parse(id: GuildId, text: &str) -> Self {
        let mut settings = Self::new(id);

        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!(guild_id = id, line, "skipping malformed settings line");
                continue;
            };

            match key {
                KEY_LOG_STATS => match value {
                    "true" => settings.log_stats = true,
                    "false" => settings.log_stats = false,
                    _ => warn!(guild_id = id, value, "bad log_stats value, using default"),
                },
                KEY_TOKEN_LEFT => {
                    if settings.set_token_left(value).is_err() {
                        warn!(guild_id = id, "empty token_left in save, using default");
                    }
                },
                KEY_TOKEN_RIGHT => {
                    if settings.set_token_right(value).is_err() {
                        warn!(guild_id = id, "empty token_right in save, using default");
                    }
                },
                KEY_SPLIT => {
                    if settings.set_split_marker(value).is_err() {
                        warn!(guild_id = id, "empty split_marker in save, using default");
                    }
                },
                KEY_BOT_CHANNEL => {
                    if value == BOT_CHANNEL_UNSET {
                        settings.bot_channel = None;
                    } else {
                        match value.parse::<ChannelId>() {
                            Ok(channel) => settings.bot_channel = Some(channel),
                            Err(_) => {
                                warn!(guild_id = id, value, "bad bot_channel value, using default");
                            },
                        }
                    }
                },
                KEY_WHITELIST => match parse_ids(value) {
                    Some(ids) => settings.channel_whitelist = ids,
                    None => warn!(guild_id = id, value, "bad whitelist value, using default"),
                },
                KEY_BLACKLIST => match parse_ids(value) {
                    Some(ids) => settings.channel_blacklist = ids,
                    None => warn!(guild_id = id, value, "bad blacklist value, using default"),
                },
                _ => warn!(guild_id = id, key, "unknown settings key, ignoring"),
            }
        }

        settings
    }
}

fn join_ids(ids: &BTreeSet<ChannelId>) -> String {
    let strings: Vec<String> = ids.iter().map(ChannelId::to_string).collect();
    strings.join(",")
}

fn parse_ids(value: &str) -> Option<BTreeSet<ChannelId>> {
    if value.is_empty() {
        return Some(BTreeSet::new());
    }
    value
        .split(',')
        .map(|part| part.trim().parse::<ChannelId>().ok())
        .collect()
}
