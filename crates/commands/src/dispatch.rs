//! Permission-checked routing of `-command arg` strings to handlers.

use tracing::info;

use {
    lorebot_common::types::{ChannelResolver, InboundMessage, ReplyPayload, ReplySink, UserId},
    lorebot_settings::SettingsStore,
};

use crate::{
    error::{Error, Result},
    handlers,
    registry::{CommandId, CommandRegistry},
};

/// Marker a command string begins with.
pub const COMMAND_PREFIX: char = '-';

/// Control-flow outcome a handler can surface to the embedding process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    /// Nothing beyond any replies already sent.
    None,
    /// The admin asked the process to shut down.
    Shutdown,
    /// The admin asked the process to restart.
    Restart,
}

/// Everything a handler needs: the triggering message plus the shared
/// collaborators, borrowed for the duration of one dispatch.
pub struct CommandContext<'a> {
    pub msg: &'a InboundMessage,
    pub store: &'a SettingsStore,
    pub sink: &'a dyn ReplySink,
    pub resolver: Option<&'a dyn ChannelResolver>,
    pub registry: &'a CommandRegistry,
}

impl CommandContext<'_> {
    /// Reply to the triggering message in its own channel.
    pub async fn reply(&self, text: impl Into<String>) -> Result<()> {
        self.sink
            .send(
                self.msg.channel_id,
                ReplyPayload::replying_to(text, self.msg.message_id),
            )
            .await
            .map_err(Error::Delivery)
    }
}

/// Table-driven command router. The tables are immutable and shared.
pub struct CommandDispatcher {
    registry: CommandRegistry,
    admin_user_id: Option<UserId>,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(registry: CommandRegistry, admin_user_id: Option<UserId>) -> Self {
        Self {
            registry,
            admin_user_id,
        }
    }

    /// Route one command string. `text` must start with [`COMMAND_PREFIX`];
    /// the remainder splits on the first whitespace into a command name and
    /// a single raw argument string passed whole to the handler.
    pub async fn dispatch(
        &self,
        text: &str,
        msg: &InboundMessage,
        store: &SettingsStore,
        sink: &dyn ReplySink,
        resolver: Option<&dyn ChannelResolver>,
    ) -> Result<CommandEffect> {
        let Some(input) = text.strip_prefix(COMMAND_PREFIX) else {
            return Ok(CommandEffect::None);
        };

        let (name, arg) = match input.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (input, ""),
        };

        let ctx = CommandContext {
            msg,
            store,
            sink,
            resolver,
            registry: &self.registry,
        };

        let Some(command) = self.registry.resolve(name) else {
            info!(command = name, "unrecognized command");
            ctx.reply(format!(
                ":confused: Unknown command. Use `{COMMAND_PREFIX}help` for more info."
            ))
            .await?;
            return Ok(CommandEffect::None);
        };

        // Guild permission gate, checked before invocation.
        if let Some(required) = CommandRegistry::required_permission(command)
            && !msg.has_permission(required)
        {
            info!(
                author = %msg.author_name,
                ?command,
                "author lacks permission for command"
            );
            ctx.reply(":warning: You do not have sufficient permissions to use that command.")
                .await?;
            return Ok(CommandEffect::None);
        }

        // Admin gate: the author must be the configured admin identity.
        if CommandRegistry::is_admin_only(command)
            && self.admin_user_id != Some(msg.author_id)
        {
            info!(
                author = %msg.author_name,
                ?command,
                "non-admin attempted an admin command"
            );
            ctx.reply(":warning: Only the bot admin can use that command.")
                .await?;
            return Ok(CommandEffect::None);
        }

        info!(?command, arg, "dispatching command");
        self.invoke(command, arg, &ctx).await
    }

    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    async fn invoke(
        &self,
        command: CommandId,
        arg: &str,
        ctx: &CommandContext<'_>,
    ) -> Result<CommandEffect> {
        match command {
            CommandId::Help => handlers::help(ctx, arg).await?,
            CommandId::Blacklist => handlers::blacklist(ctx, arg).await?,
            CommandId::Whitelist => handlers::whitelist(ctx, arg).await?,
            CommandId::BotChannel => handlers::bot_channel(ctx, arg).await?,
            CommandId::BotChannelClear => handlers::bot_channel_clear(ctx).await?,
            CommandId::ViewFilters => handlers::view_filters(ctx).await?,
            CommandId::SetTokenLeft => handlers::set_token_left(ctx, arg).await?,
            CommandId::SetTokenRight => handlers::set_token_right(ctx, arg).await?,
            CommandId::SetSplit => handlers::set_split(ctx, arg).await?,
            CommandId::ViewTokens => handlers::view_tokens(ctx).await?,
            CommandId::ResetSettings => handlers::reset_server_settings(ctx).await?,
            CommandId::Stats => handlers::stats(ctx, arg).await?,
            CommandId::Version => handlers::version(ctx).await?,
            CommandId::GlobalStats => handlers::global_stats(ctx).await?,
            CommandId::Exit => {
                ctx.reply("Shutting down.").await?;
                return Ok(CommandEffect::Shutdown);
            },
            CommandId::Restart => {
                ctx.reply("Restarting.").await?;
                return Ok(CommandEffect::Restart);
            },
        }
        Ok(CommandEffect::None)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, sync::Mutex};

    use {
        async_trait::async_trait,
        tempfile::TempDir,
    };

    use {
        super::*,
        lorebot_common::types::{ChannelId, Permission},
    };

    /// Captures outbound replies for assertions.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(ChannelId, ReplyPayload)>>,
    }

    impl RecordingSink {
        fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, payload)| payload.text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ReplySink for RecordingSink {
        async fn send(&self, channel_id: ChannelId, payload: ReplyPayload) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push((channel_id, payload));
            Ok(())
        }
    }

    const ADMIN: UserId = 900;

    fn message(body: &str, permissions: &[Permission]) -> InboundMessage {
        InboundMessage {
            guild_id: Some(1),
            channel_id: 10,
            message_id: 100,
            author_id: 50,
            author_name: "tester".into(),
            author_is_bot: false,
            body: body.into(),
            mentioned_channels: Vec::new(),
            author_permissions: permissions.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    struct Fixture {
        _tmp: TempDir,
        store: SettingsStore,
        sink: RecordingSink,
        dispatcher: CommandDispatcher,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let store = SettingsStore::new(tmp.path().to_path_buf());
        Fixture {
            _tmp: tmp,
            store,
            sink: RecordingSink::default(),
            dispatcher: CommandDispatcher::new(CommandRegistry::new(), Some(ADMIN)),
        }
    }

    async fn dispatch(fixture: &Fixture, msg: &InboundMessage) -> CommandEffect {
        fixture
            .dispatcher
            .dispatch(&msg.body, msg, &fixture.store, &fixture.sink, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_command_gets_a_visible_reply() {
        let fx = fixture();
        let msg = message("-frobnicate", &[]);
        dispatch(&fx, &msg).await;

        let texts = fx.sink.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Unknown command"));
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let fx = fixture();
        let msg = message("-VERSION", &[]);
        dispatch(&fx, &msg).await;

        assert!(fx.sink.texts()[0].contains("lorebot"));
    }

    #[tokio::test]
    async fn insufficient_permission_rejects_before_invocation() {
        let fx = fixture();
        let msg = message("-set-token-l <<", &[]);
        dispatch(&fx, &msg).await;

        assert!(fx.sink.texts()[0].contains("sufficient permissions"));
        // the handler never ran, so the delimiter is untouched
        assert_eq!(fx.store.get(1).await.token_left(), "[[");
    }

    #[tokio::test]
    async fn empty_token_value_is_rejected_without_mutation() {
        let fx = fixture();
        let msg = message("-set-token-l", &[Permission::ManageGuild]);
        dispatch(&fx, &msg).await;

        assert!(fx.sink.texts()[0].contains("cannot be set to empty"));
        assert_eq!(fx.store.get(1).await.token_left(), "[[");
        assert!(!fx.store.has_save(1).await);
    }

    #[tokio::test]
    async fn set_token_persists_and_reports_old_value() {
        let fx = fixture();
        let msg = message("-set-token-l <<", &[Permission::ManageGuild]);
        dispatch(&fx, &msg).await;

        assert!(fx.sink.texts()[0].contains("changed from `[[` to `<<`"));
        assert_eq!(fx.store.get(1).await.token_left(), "<<");
        assert!(fx.store.has_save(1).await);
    }

    #[tokio::test]
    async fn admin_command_as_non_admin_is_rejected_without_invocation() {
        let fx = fixture();
        let msg = message("-exit", &[Permission::ManageGuild]);
        let effect = dispatch(&fx, &msg).await;

        assert_eq!(effect, CommandEffect::None);
        let texts = fx.sink.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Only the bot admin"));
    }

    #[tokio::test]
    async fn admin_command_as_admin_surfaces_effect() {
        let fx = fixture();
        let mut msg = message("-exit", &[]);
        msg.author_id = ADMIN;
        let effect = dispatch(&fx, &msg).await;

        assert_eq!(effect, CommandEffect::Shutdown);
    }

    #[tokio::test]
    async fn restart_surfaces_effect() {
        let fx = fixture();
        let mut msg = message("-reboot", &[]);
        msg.author_id = ADMIN;
        assert_eq!(dispatch(&fx, &msg).await, CommandEffect::Restart);
    }

    #[tokio::test]
    async fn whitelist_toggle_prunes_blacklist() {
        let fx = fixture();
        fx.store
            .update(1, |s| {
                s.toggle_blacklist(77);
            })
            .await;

        let msg = message("-whitelist 77", &[Permission::ManageGuild]);
        dispatch(&fx, &msg).await;

        let settings = fx.store.get(1).await;
        assert!(settings.channel_whitelist.contains(&77));
        assert!(settings.channel_blacklist.is_empty());
        assert!(fx.sink.texts()[0].contains("removed from the blacklist"));
    }

    #[tokio::test]
    async fn channel_argument_accepts_mention_syntax() {
        let fx = fixture();
        let msg = message("-blacklist <#42>", &[Permission::ManageGuild]);
        dispatch(&fx, &msg).await;

        assert!(fx.store.get(1).await.channel_blacklist.contains(&42));
    }

    #[tokio::test]
    async fn unparseable_channel_changes_nothing() {
        let fx = fixture();
        let msg = message("-blacklist somewhere", &[Permission::ManageGuild]);
        dispatch(&fx, &msg).await;

        assert!(fx.sink.texts()[0].contains("Could not parse channel"));
        assert!(fx.store.get(1).await.channel_blacklist.is_empty());
    }

    #[tokio::test]
    async fn bot_channel_set_and_clear() {
        let fx = fixture();
        let msg = message("-bot-channel 42", &[Permission::ManageGuild]);
        dispatch(&fx, &msg).await;
        assert_eq!(fx.store.get(1).await.bot_channel, Some(42));

        let msg = message("-clear-bot-channel", &[Permission::ManageGuild]);
        dispatch(&fx, &msg).await;
        assert_eq!(fx.store.get(1).await.bot_channel, None);
    }

    #[tokio::test]
    async fn guild_command_in_direct_message_is_refused() {
        let fx = fixture();
        let mut msg = message("-view-filters", &[Permission::ReadChannels]);
        msg.guild_id = None;
        dispatch(&fx, &msg).await;

        assert!(fx.sink.texts()[0].contains("Could not find a server"));
    }

    #[tokio::test]
    async fn stats_toggle_roundtrip() {
        let fx = fixture();
        let msg = message("-stats off", &[Permission::ViewAuditLog]);
        dispatch(&fx, &msg).await;
        assert!(!fx.store.get(1).await.log_stats);

        let msg = message("-stats", &[Permission::ViewAuditLog]);
        dispatch(&fx, &msg).await;
        assert!(fx.sink.texts()[1].contains("disabled"));
    }

    #[tokio::test]
    async fn help_mentions_configured_delimiters() {
        let fx = fixture();
        fx.store
            .update(1, |s| {
                s.set_token_left("{{").unwrap();
                s.set_token_right("}}").unwrap();
            })
            .await;

        let msg = message("-help", &[]);
        dispatch(&fx, &msg).await;

        let text = &fx.sink.texts()[0];
        assert!(text.contains("`{{`"));
        assert!(text.contains("`}}`"));
    }
}
