//! Help text, general and per-command, built against the guild's configured
//! token syntax so examples always match what the server actually accepts.

use lorebot_settings::{SPLIT_DEFAULT, TOKEN_LEFT_DEFAULT, TOKEN_RIGHT_DEFAULT};

use crate::{dispatch::CommandContext, error::Result, registry::CommandId};

/// Reply with help: general when `arg` is empty or unknown, otherwise the
/// help entry for the named command.
pub(crate) async fn respond(ctx: &CommandContext<'_>, arg: &str) -> Result<()> {
    let text = match ctx.registry.resolve(arg) {
        Some(command) if !arg.is_empty() => command_help(command).to_string(),
        _ => general_help(ctx).await,
    };
    ctx.reply(text).await
}

async fn general_help(ctx: &CommandContext<'_>) -> String {
    // Show the tenant's own delimiters when it has overrides.
    let (left, right, split) = match ctx.msg.guild_id {
        Some(guild) => {
            let settings = ctx.store.get(guild).await;
            (
                settings.token_left().to_string(),
                settings.token_right().to_string(),
                settings.split_marker().to_string(),
            )
        },
        None => (
            TOKEN_LEFT_DEFAULT.to_string(),
            TOKEN_RIGHT_DEFAULT.to_string(),
            SPLIT_DEFAULT.to_string(),
        ),
    };

    format!(
        "Surround anything you want to search for in your message with `{left}` and `{right}`.\n\
         > I would have done better if you had given me `{left}innervate{right}`.\n\
         You can add `{split}` to direct a query at a specific search engine.\n\
         > `{left}frostbolt{split}glossary{right}`\n\
         \n\
         Use the command name to get more help on commands, e.g.:\n\
         `-help view-tokens`"
    )
}

fn command_help(command: CommandId) -> &'static str {
    match command {
        CommandId::Help => "`-help [command]` — this text, or help for one command.",
        CommandId::Blacklist => {
            "`-blacklist <channel>` — toggle a channel on the blacklist. \
             Blacklisted channels never get search replies."
        },
        CommandId::Whitelist => {
            "`-whitelist <channel>` — toggle a channel on the whitelist. \
             When a whitelist exists, only whitelisted channels get replies."
        },
        CommandId::BotChannel => {
            "`-bot-channel <channel>` — send all search replies to one designated channel."
        },
        CommandId::BotChannelClear => {
            "`-clear-bot-channel` — replies go back to the channel the query came from."
        },
        CommandId::ViewFilters => "`-view-filters` — show the bot channel and both filter lists.",
        CommandId::SetTokenLeft => "`-set-token-l <value>` — change the opening search delimiter.",
        CommandId::SetTokenRight => "`-set-token-r <value>` — change the closing search delimiter.",
        CommandId::SetSplit => "`-set-split <value>` — change the query/meta splitter.",
        CommandId::ViewTokens => "`-view-tokens` — show the current search token format.",
        CommandId::ResetSettings => {
            "`-reset-server-settings` — reset all server settings to their defaults."
        },
        CommandId::Stats => "`-stats [on|off]` — show or toggle stats logging for this server.",
        CommandId::Version => "`-version` — show the running release.",
        CommandId::Exit => "`-exit` — (admin) shut the bot down.",
        CommandId::Restart => "`-restart` — (admin) restart the bot.",
        CommandId::GlobalStats => "`-global-stats` — (admin) usage totals across all servers.",
    }
}
