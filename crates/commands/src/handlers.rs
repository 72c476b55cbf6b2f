//! The command handlers. Each takes the dispatch context plus the raw
//! argument string and replies directly through the context's sink.

use tracing::info;

use {
    lorebot_common::types::{ChannelId, GuildId, channel_mention},
    lorebot_settings::{FilterChange, GuildSettings},
};

use crate::{dispatch::CommandContext, error::Result, help};

// Shorthand interpolation strings.
const OK: &str = ":white_check_mark:";
const INFO: &str = ":information_source:";
const WARN: &str = ":warning:";

/// Commands that configure a guild only make sense inside one. Replies and
/// returns `None` for direct messages.
async fn require_guild(ctx: &CommandContext<'_>) -> Result<Option<GuildId>> {
    match ctx.msg.guild_id {
        Some(guild) => Ok(Some(guild)),
        None => {
            ctx.reply("Could not find a server to configure :zipper_mouth:")
                .await?;
            Ok(None)
        },
    }
}

/// Resolve a channel argument: an explicit mention, a numeric id, or a
/// plaintext channel name (via the resolver, when one is wired in). Replies
/// and returns `None` when nothing parses.
async fn parse_channel_arg(
    ctx: &CommandContext<'_>,
    guild: GuildId,
    arg: &str,
) -> Result<Option<ChannelId>> {
    let channel = ctx
        .msg
        .mentioned_channels
        .first()
        .copied()
        .or_else(|| {
            arg.strip_prefix("<#")
                .and_then(|rest| rest.strip_suffix('>'))
                .and_then(|id| id.parse().ok())
        })
        .or_else(|| arg.parse().ok())
        .or_else(|| {
            ctx.resolver
                .and_then(|r| r.channel_by_name(guild, arg.to_lowercase().as_str()))
        });

    if channel.is_none() {
        info!(arg, "could not parse channel argument");
        ctx.reply(format!("{WARN} Could not parse channel name.\nNo changes have been made."))
            .await?;
    }
    Ok(channel)
}

pub(crate) async fn help(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    help::respond(ctx, arg).await
}

enum FilterList {
    Whitelist,
    Blacklist,
}

impl FilterList {
    fn name(&self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist",
            Self::Blacklist => "blacklist",
        }
    }

    fn other(&self) -> &'static str {
        match self {
            Self::Whitelist => "blacklist",
            Self::Blacklist => "whitelist",
        }
    }
}

/// Toggle a channel on one filter list, pruning it from the other on add.
async fn toggle_filter(ctx: &CommandContext<'_>, arg: &str, list: FilterList) -> Result<()> {
    let Some(guild) = require_guild(ctx).await? else {
        return Ok(());
    };
    let Some(channel) = parse_channel_arg(ctx, guild, arg).await? else {
        return Ok(());
    };

    let mut change = FilterChange::Removed;
    ctx.store
        .update(guild, |settings| {
            change = match list {
                FilterList::Whitelist => settings.toggle_whitelist(channel),
                FilterList::Blacklist => settings.toggle_blacklist(channel),
            };
        })
        .await;

    let mention = channel_mention(channel);
    let text = match change {
        FilterChange::Removed => format!(
            "The {0} already contains {mention}.\n{OK} {mention} has been removed from the {0}.",
            list.name()
        ),
        FilterChange::Added { pruned: false } => {
            format!("{OK} {mention} has been added to the {}.", list.name())
        },
        FilterChange::Added { pruned: true } => format!(
            "{OK} {mention} has been added to the {}.\n{OK} {mention} has been removed from the {}.",
            list.name(),
            list.other()
        ),
    };
    ctx.reply(text).await
}

pub(crate) async fn whitelist(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    toggle_filter(ctx, arg, FilterList::Whitelist).await
}

pub(crate) async fn blacklist(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    toggle_filter(ctx, arg, FilterList::Blacklist).await
}

pub(crate) async fn bot_channel(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    let Some(guild) = require_guild(ctx).await? else {
        return Ok(());
    };
    let Some(channel) = parse_channel_arg(ctx, guild, arg).await? else {
        return Ok(());
    };

    let previous = ctx.store.get(guild).await.bot_channel;
    let mention = channel_mention(channel);
    if previous == Some(channel) {
        ctx.reply(format!(
            "{OK} Bot channel is already {mention}.\nNo changes have been made."
        ))
        .await?;
        return Ok(());
    }

    ctx.store
        .update(guild, |settings| settings.bot_channel = Some(channel))
        .await;
    ctx.reply(format!("{OK} Bot channel has been set to {mention}."))
        .await
}

pub(crate) async fn bot_channel_clear(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(guild) = require_guild(ctx).await? else {
        return Ok(());
    };

    let mut previous = None;
    ctx.store
        .update(guild, |settings| {
            previous = settings.bot_channel.take();
        })
        .await;

    let text = match previous {
        Some(channel) => format!(
            "{OK} Bot channel {} has been cleared.",
            channel_mention(channel)
        ),
        None => format!("{OK} No bot channel exists yet.\nNo changes have been made."),
    };
    ctx.reply(text).await
}

pub(crate) async fn view_filters(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(guild) = require_guild(ctx).await? else {
        return Ok(());
    };
    let settings = ctx.store.get(guild).await;

    let mut text = String::new();
    match settings.bot_channel {
        Some(channel) => {
            text.push_str(&format!("{INFO} Bot channel: {}\n", channel_mention(channel)));
        },
        None => text.push_str(&format!("{INFO} No bot channel has been set.\n")),
    }

    for (label, list) in [
        ("whitelisted", &settings.channel_whitelist),
        ("blacklisted", &settings.channel_blacklist),
    ] {
        if list.is_empty() {
            text.push_str(&format!("{INFO} No channels have been {label}.\n"));
        } else {
            let mentions: Vec<String> = list.iter().copied().map(channel_mention).collect();
            let heading = if label == "whitelisted" { "Whitelist" } else { "Blacklist" };
            text.push_str(&format!("{INFO} {heading}: {}\n", mentions.join(" ")));
        }
    }

    ctx.reply(text.trim_end().to_string()).await
}

enum Delimiter {
    Left,
    Right,
    Split,
}

impl Delimiter {
    fn label(&self) -> &'static str {
        match self {
            Self::Left => "Left-hand token",
            Self::Right => "Right-hand token",
            Self::Split => "Splitter token",
        }
    }
}

/// Change one of the delimiter strings. Empty values are rejected before any
/// settings mutation happens.
async fn set_delimiter(ctx: &CommandContext<'_>, arg: &str, which: Delimiter) -> Result<()> {
    let Some(guild) = require_guild(ctx).await? else {
        return Ok(());
    };

    if arg.is_empty() {
        ctx.reply(format!(
            "{WARN} Tokens cannot be set to empty strings.\nNo settings have been changed."
        ))
        .await?;
        return Ok(());
    }

    let mut old = String::new();
    ctx.store
        .update(guild, |settings| {
            old = match which {
                Delimiter::Left => {
                    let old = settings.token_left().to_string();
                    let _ = settings.set_token_left(arg);
                    old
                },
                Delimiter::Right => {
                    let old = settings.token_right().to_string();
                    let _ = settings.set_token_right(arg);
                    old
                },
                Delimiter::Split => {
                    let old = settings.split_marker().to_string();
                    let _ = settings.set_split_marker(arg);
                    old
                },
            };
        })
        .await;

    ctx.reply(format!(
        "{OK} {} changed from `{old}` to `{arg}`.",
        which.label()
    ))
    .await
}

pub(crate) async fn set_token_left(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    set_delimiter(ctx, arg, Delimiter::Left).await
}

pub(crate) async fn set_token_right(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    set_delimiter(ctx, arg, Delimiter::Right).await
}

pub(crate) async fn set_split(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    set_delimiter(ctx, arg, Delimiter::Split).await
}

pub(crate) async fn view_tokens(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(guild) = require_guild(ctx).await? else {
        return Ok(());
    };
    let settings = ctx.store.get(guild).await;

    ctx.reply(format!(
        "{INFO} Search token format:\n`{}`query`{}`meta`{}`",
        settings.token_left(),
        settings.split_marker(),
        settings.token_right()
    ))
    .await
}

pub(crate) async fn reset_server_settings(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(guild) = require_guild(ctx).await? else {
        return Ok(());
    };

    ctx.store.update(guild, GuildSettings::reset).await;
    ctx.reply(format!(
        "{OK} All server settings have been reset to their defaults."
    ))
    .await
}

pub(crate) async fn stats(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    let Some(guild) = require_guild(ctx).await? else {
        return Ok(());
    };

    match arg {
        "" => {
            let settings = ctx.store.get(guild).await;
            let state = if settings.log_stats { "enabled" } else { "disabled" };
            ctx.reply(format!("{INFO} Stats logging is {state} for this server."))
                .await
        },
        "on" | "off" => {
            let enable = arg == "on";
            ctx.store
                .update(guild, |settings| settings.log_stats = enable)
                .await;
            let state = if enable { "enabled" } else { "disabled" };
            ctx.reply(format!("{OK} Stats logging is now {state}."))
                .await
        },
        _ => {
            ctx.reply(format!("{WARN} Usage: `-stats [on|off]`.")).await
        },
    }
}

pub(crate) async fn version(ctx: &CommandContext<'_>) -> Result<()> {
    ctx.reply(format!(
        "{INFO} **lorebot {}**",
        env!("CARGO_PKG_VERSION")
    ))
    .await
}

pub(crate) async fn global_stats(ctx: &CommandContext<'_>) -> Result<()> {
    let guilds = ctx.store.saved_guild_count().await;
    let plural = if guilds == 1 { "" } else { "s" };
    ctx.reply(format!("{INFO} Tracking settings for {guilds} server{plural}."))
        .await
}
