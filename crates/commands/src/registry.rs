//! Static command tables: aliases, permission requirements, admin-only set.
//!
//! Built once at process start and passed by reference into the dispatcher.

use std::collections::HashMap;

use lorebot_common::types::Permission;

/// Handler identity. Several aliases map to one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Help,
    Blacklist,
    Whitelist,
    BotChannel,
    BotChannelClear,
    ViewFilters,
    SetTokenLeft,
    SetTokenRight,
    SetSplit,
    ViewTokens,
    ResetSettings,
    Stats,
    Version,
    Exit,
    Restart,
    GlobalStats,
}

/// Immutable alias table, case-insensitive on lookup.
pub struct CommandRegistry {
    aliases: HashMap<&'static str, CommandId>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        use CommandId::*;
        let aliases = HashMap::from([
            ("help", Help),
            ("h", Help),
            ("?", Help),
            ("blacklist", Blacklist),
            ("whitelist", Whitelist),
            ("bot-channel", BotChannel),
            ("bot-channel-set", BotChannel),
            ("set-bot-channel", BotChannel),
            ("clear-bot-channel", BotChannelClear),
            ("bot-channel-clear", BotChannelClear),
            ("unset-bot-channel", BotChannelClear),
            ("bot-channel-unset", BotChannelClear),
            ("reset-bot-channel", BotChannelClear),
            ("bot-channel-reset", BotChannelClear),
            ("view-filters", ViewFilters),
            ("view-blacklist", ViewFilters),
            ("view-whitelist", ViewFilters),
            ("set-token-l", SetTokenLeft),
            ("set-token-r", SetTokenRight),
            ("set-split", SetSplit),
            ("view-tokens", ViewTokens),
            ("view-token", ViewTokens),
            ("reset-server-settings", ResetSettings),
            ("stats", Stats),
            ("version", Version),
            ("build", Version),
            ("exit", Exit),
            ("end", Exit),
            ("kill", Exit),
            ("terminate", Exit),
            ("restart", Restart),
            ("reboot", Restart),
            ("global-stats", GlobalStats),
        ]);
        Self { aliases }
    }

    /// Resolve an alias to a handler identity, case-insensitively.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<CommandId> {
        self.aliases.get(name.to_lowercase().as_str()).copied()
    }

    /// Permission required in the originating channel, if any.
    #[must_use]
    pub fn required_permission(command: CommandId) -> Option<Permission> {
        use CommandId::*;
        match command {
            Blacklist | Whitelist | BotChannel | BotChannelClear | SetTokenLeft
            | SetTokenRight | SetSplit | ResetSettings => Some(Permission::ManageGuild),
            ViewFilters | ViewTokens => Some(Permission::ReadChannels),
            Stats => Some(Permission::ViewAuditLog),
            Help | Version | Exit | Restart | GlobalStats => None,
        }
    }

    /// Whether the command is restricted to the configured admin identity.
    #[must_use]
    pub fn is_admin_only(command: CommandId) -> bool {
        matches!(
            command,
            CommandId::Exit | CommandId::Restart | CommandId::GlobalStats
        )
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_share_one_identity() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.resolve("bot-channel"), Some(CommandId::BotChannel));
        assert_eq!(registry.resolve("set-bot-channel"), Some(CommandId::BotChannel));
        assert_eq!(registry.resolve("h"), Some(CommandId::Help));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.resolve("BLACKLIST"), Some(CommandId::Blacklist));
        assert_eq!(registry.resolve("View-Filters"), Some(CommandId::ViewFilters));
    }

    #[test]
    fn unknown_alias_resolves_to_none() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.resolve("frobnicate"), None);
    }

    #[test]
    fn admin_commands_have_no_guild_permission_requirement() {
        for command in [CommandId::Exit, CommandId::Restart, CommandId::GlobalStats] {
            assert!(CommandRegistry::is_admin_only(command));
            assert_eq!(CommandRegistry::required_permission(command), None);
        }
    }
}
