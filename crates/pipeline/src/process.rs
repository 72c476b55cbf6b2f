//! The per-message orchestrator: rate limit → channel policy → command
//! dispatch → token extraction → per-token search.

use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    lorebot_commands::{COMMAND_PREFIX, CommandDispatcher, CommandEffect, CommandRegistry},
    lorebot_common::types::{ChannelResolver, GuildId, InboundMessage, ReplyPayload, ReplySink, UserId},
    lorebot_engines::SearchEngine,
    lorebot_settings::{GuildSettings, SettingsStore},
};

use crate::{
    aggregate::{SearchAggregator, SearchOutcome},
    error::Result,
    extract::TokenExtractor,
    policy,
    ratelimit::{BotRateLimiter, RateLimitConfig},
};

/// Process-wide pipeline tuning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The bot's own user id; its messages are never processed.
    pub bot_user_id: UserId,
    /// When set, commands must be addressed through this mention string
    /// (e.g. `<@12345>`); it is stripped before any further parsing.
    pub mention_prefix: Option<String>,
    /// Identity allowed to run admin-only commands.
    pub admin_user_id: Option<UserId>,
    /// Most tokens processed per message; the earliest win.
    pub cap_tokens: usize,
    /// Most results rendered per query.
    pub cap_results: usize,
    pub rate_limits: RateLimitConfig,
}

impl PipelineConfig {
    #[must_use]
    pub fn new(bot_user_id: UserId) -> Self {
        Self {
            bot_user_id,
            mention_prefix: None,
            admin_user_id: None,
            cap_tokens: 5,
            cap_results: 3,
            rate_limits: RateLimitConfig::default(),
        }
    }
}

/// Consumes inbound message events, one independent task per message.
///
/// Shared state (settings cache, rate-limiter buckets) is internally locked
/// per key; callers may invoke [`MessagePipeline::handle`] from any number of
/// concurrent tasks.
pub struct MessagePipeline {
    config: PipelineConfig,
    store: Arc<SettingsStore>,
    limiter: BotRateLimiter,
    dispatcher: CommandDispatcher,
    aggregator: SearchAggregator,
    sink: Arc<dyn ReplySink>,
    resolver: Option<Arc<dyn ChannelResolver>>,
}

impl MessagePipeline {
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        store: Arc<SettingsStore>,
        engines: Vec<Arc<dyn SearchEngine>>,
        sink: Arc<dyn ReplySink>,
    ) -> Self {
        let limiter = BotRateLimiter::new(config.rate_limits);
        let dispatcher = CommandDispatcher::new(CommandRegistry::new(), config.admin_user_id);
        let aggregator = SearchAggregator::new(engines, config.cap_results);
        Self {
            config,
            store,
            limiter,
            dispatcher,
            aggregator,
            sink,
            resolver: None,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ChannelResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Eager tenant setup on guild join: record the name and persist default
    /// settings when none exist yet.
    pub async fn guild_joined(&self, guild: GuildId, name: &str) {
        self.store.record_name(guild, name).await;
        if !self.store.has_save(guild).await {
            let defaults = self.store.get(guild).await;
            if let Err(err) = self.store.save(&defaults).await {
                warn!(guild_id = guild, %err, "could not persist default settings");
            }
        }
        info!(guild_id = guild, name, "guild settings initialized");
    }

    /// Tenant teardown on guild removal: all durable state is deleted.
    pub async fn guild_removed(&self, guild: GuildId) {
        if let Err(err) = self.store.delete(guild).await {
            warn!(guild_id = guild, %err, "could not delete guild settings");
        }
    }

    /// Handle one inbound message to completion. Returns the control-flow
    /// effect a command handler surfaced, if any.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<CommandEffect> {
        // Never respond to self.
        if msg.author_id == self.config.bot_user_id {
            return Ok(CommandEffect::None);
        }

        // Rate-limit responses to other bots; denial is silent.
        if msg.author_is_bot && !self.limiter.check(msg.channel_id, msg.author_id) {
            info!(
                channel_id = msg.channel_id,
                sender = %msg.author_name,
                "bot sender is rate limited, discarding message"
            );
            return Ok(CommandEffect::None);
        }

        let settings = match msg.guild_id {
            Some(guild) => Some(self.store.get(guild).await),
            None => None,
        };

        if !policy::is_tracked(msg.channel_id, settings.as_ref()) {
            debug!(channel_id = msg.channel_id, "channel is not tracked");
            return Ok(CommandEffect::None);
        }

        // Strip the bot mention, when one is configured and present.
        let mut text = msg.body.trim_start();
        let mut addressed = self.config.mention_prefix.is_none();
        if let Some(prefix) = &self.config.mention_prefix
            && let Some(rest) = text.strip_prefix(prefix.as_str())
        {
            text = rest.trim_start();
            addressed = true;
        }

        let mut effect = CommandEffect::None;
        if addressed && text.starts_with(COMMAND_PREFIX) {
            effect = self
                .dispatcher
                .dispatch(
                    text,
                    msg,
                    &self.store,
                    self.sink.as_ref(),
                    self.resolver.as_deref(),
                )
                .await?;
        }

        self.process_queries(msg, settings.as_ref(), text).await;
        Ok(effect)
    }

    async fn process_queries(
        &self,
        msg: &InboundMessage,
        settings: Option<&GuildSettings>,
        text: &str,
    ) {
        let extractor = match settings {
            Some(settings) => TokenExtractor::for_settings(settings),
            None => TokenExtractor::with_defaults(),
        };
        let extractor = match extractor {
            Ok(extractor) => extractor,
            Err(err) => {
                warn!(%err, "could not build token matcher");
                return;
            },
        };

        let mut tokens = extractor.extract(text);
        if tokens.is_empty() {
            return;
        }
        info!(count = tokens.len(), "queries found in message");

        if tokens.len() > self.config.cap_tokens {
            warn!(
                found = tokens.len(),
                kept = self.config.cap_tokens,
                "query cap exceeded, discarding excess queries"
            );
            tokens.truncate(self.config.cap_tokens);
        }

        // Let the user know the query was received and is being worked on.
        if let Err(err) = self.sink.send_typing(msg.channel_id).await {
            debug!(%err, "could not send typing indicator");
        }

        let reply_channel = policy::reply_channel(msg.channel_id, settings);

        for token in &tokens {
            info!(query = %token.text, meta = ?token.meta, "searching");

            match self.aggregator.search(token).await {
                SearchOutcome::NoResults => {
                    let notice = format!("No results found for `{}`.", token.text);
                    if let Err(err) = self
                        .sink
                        .send(msg.channel_id, ReplyPayload::replying_to(notice, msg.message_id))
                        .await
                    {
                        warn!(%err, "could not deliver no-results notice");
                    }
                    // Do not fall through to the remaining tokens.
                    return;
                },
                SearchOutcome::Rendered(bodies) => {
                    for body in bodies {
                        if let Err(err) = self
                            .sink
                            .send(reply_channel, ReplyPayload::replying_to(body, msg.message_id))
                            .await
                        {
                            warn!(%err, "could not deliver search result");
                        }
                    }
                },
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {
        async_trait::async_trait,
        tempfile::TempDir,
    };

    use {
        super::*,
        lorebot_common::types::{ChannelId, Permission},
        lorebot_engines::{EngineKind, ResultPayload, SearchResult, SearchToken},
    };

    const BOT: UserId = 1;
    const GUILD: GuildId = 7;
    const CHANNEL: ChannelId = 70;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(ChannelId, ReplyPayload)>>,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<(ChannelId, ReplyPayload)> {
            self.sent.lock().unwrap().clone()
        }

        fn texts(&self) -> Vec<String> {
            self.sent()
                .into_iter()
                .map(|(_, payload)| payload.text)
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

    /// Scripted engine: records the queries it sees, answers from a fixed
    /// (query → results) table.
    #[derive(Default)]
    struct ScriptedEngine {
        answers: Vec<(String, Vec<SearchResult>)>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        fn answering(query: &str, results: Vec<SearchResult>) -> Self {
            Self {
                answers: vec![(query.into(), results)],
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchEngine for ScriptedEngine {
        fn kind(&self) -> EngineKind {
            EngineKind::Glossary
        }

        async fn search(
            &self,
            token: &SearchToken,
        ) -> lorebot_engines::Result<Vec<SearchResult>> {
            self.seen.lock().unwrap().push(token.text.clone());
            Ok(self
                .answers
                .iter()
                .find(|(query, _)| *query == token.text)
                .map(|(_, results)| results.clone())
                .unwrap_or_default())
        }
    }

    /// Engine that always fails, for bulkhead coverage.
    struct BrokenEngine;

    #[async_trait]
    impl SearchEngine for BrokenEngine {
        fn kind(&self) -> EngineKind {
            EngineKind::EasterEgg
        }

        async fn search(
            &self,
            _token: &SearchToken,
        ) -> lorebot_engines::Result<Vec<SearchResult>> {
            Err(lorebot_engines::Error::Message("backend offline".into()))
        }
    }

    fn exact(name: &str, body: &str) -> SearchResult {
        SearchResult {
            is_exact_match: true,
            similarity: 1.0,
            name: name.into(),
            payload: ResultPayload::Plain(body.into()),
        }
    }

    fn fuzzy(name: &str, body: &str) -> SearchResult {
        SearchResult {
            is_exact_match: false,
            similarity: 0.5,
            name: name.into(),
            payload: ResultPayload::Plain(body.into()),
        }
    }

    fn message(body: &str) -> InboundMessage {
        InboundMessage {
            guild_id: Some(GUILD),
            channel_id: CHANNEL,
            message_id: 500,
            author_id: 42,
            author_name: "someone".into(),
            author_is_bot: false,
            body: body.into(),
            mentioned_channels: Vec::new(),
            author_permissions: [Permission::ManageGuild].into_iter().collect(),
        }
    }

    struct Fixture {
        _tmp: TempDir,
        store: Arc<SettingsStore>,
        sink: Arc<RecordingSink>,
        pipeline: MessagePipeline,
    }

    fn fixture_with(config: PipelineConfig, engines: Vec<Arc<dyn SearchEngine>>) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(SettingsStore::new(tmp.path().to_path_buf()));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = MessagePipeline::new(
            config,
            Arc::clone(&store),
            engines,
            Arc::clone(&sink) as Arc<dyn ReplySink>,
        );
        Fixture {
            _tmp: tmp,
            store,
            sink,
            pipeline,
        }
    }

    fn fixture(engines: Vec<Arc<dyn SearchEngine>>) -> Fixture {
        fixture_with(PipelineConfig::new(BOT), engines)
    }

    #[tokio::test]
    async fn no_results_yields_exactly_one_notice() {
        let fx = fixture(vec![Arc::new(ScriptedEngine::default())]);

        fx.pipeline.handle(&message("[[foo]]")).await.unwrap();

        let texts = fx.sink.texts();
        assert_eq!(texts, ["No results found for `foo`."]);
    }

    #[tokio::test]
    async fn own_messages_are_ignored() {
        let engine = Arc::new(ScriptedEngine::default());
        let fx = fixture(vec![Arc::clone(&engine) as Arc<dyn SearchEngine>]);

        let mut msg = message("[[foo]]");
        msg.author_id = BOT;
        fx.pipeline.handle(&msg).await.unwrap();

        assert!(engine.seen().is_empty());
        assert!(fx.sink.texts().is_empty());
    }

    #[tokio::test]
    async fn exact_results_are_rendered_up_to_the_cap() {
        let results = vec![
            exact("a", "first"),
            exact("b", "second"),
            exact("c", "third"),
            exact("d", "fourth"),
        ];
        let engine = Arc::new(ScriptedEngine::answering("foo", results));
        let fx = fixture(vec![engine]);

        fx.pipeline.handle(&message("[[foo]]")).await.unwrap();

        assert_eq!(fx.sink.texts(), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn non_exact_results_are_collected_but_never_rendered() {
        let results = vec![fuzzy("a", "close"), exact("b", "spot on"), fuzzy("c", "closer")];
        let engine = Arc::new(ScriptedEngine::answering("foo", results));
        let fx = fixture(vec![engine]);

        fx.pipeline.handle(&message("[[foo]]")).await.unwrap();

        assert_eq!(fx.sink.texts(), ["spot on"]);
    }

    #[tokio::test]
    async fn token_cap_keeps_the_earliest_queries() {
        let engine = Arc::new(ScriptedEngine {
            answers: (1..=6)
                .map(|i| (format!("q{i}"), vec![exact("n", "r")]))
                .collect(),
            seen: Mutex::new(Vec::new()),
        });
        let fx = fixture(vec![Arc::clone(&engine) as Arc<dyn SearchEngine>]);

        fx.pipeline
            .handle(&message("[[q1]] [[q2]] [[q3]] [[q4]] [[q5]] [[q6]]"))
            .await
            .unwrap();

        assert_eq!(engine.seen(), ["q1", "q2", "q3", "q4", "q5"]);
    }

    #[tokio::test]
    async fn no_results_stops_remaining_tokens() {
        let engine = Arc::new(ScriptedEngine::answering("second", vec![exact("n", "r")]));
        let fx = fixture(vec![Arc::clone(&engine) as Arc<dyn SearchEngine>]);

        fx.pipeline.handle(&message("[[first]] [[second]]")).await.unwrap();

        // the miss on `first` replied and ended the message
        assert_eq!(engine.seen(), ["first"]);
        assert_eq!(fx.sink.texts(), ["No results found for `first`."]);
    }

    #[tokio::test]
    async fn engine_failure_is_a_bulkhead_not_an_abort() {
        let healthy = Arc::new(ScriptedEngine::answering("foo", vec![exact("n", "found it")]));
        let fx = fixture(vec![
            Arc::new(BrokenEngine),
            Arc::clone(&healthy) as Arc<dyn SearchEngine>,
        ]);

        fx.pipeline.handle(&message("[[foo]]")).await.unwrap();

        assert_eq!(fx.sink.texts(), ["found it"]);
    }

    #[tokio::test]
    async fn blacklisted_channel_is_dropped() {
        let engine = Arc::new(ScriptedEngine::answering("foo", vec![exact("n", "r")]));
        let fx = fixture(vec![Arc::clone(&engine) as Arc<dyn SearchEngine>]);

        fx.store
            .update(GUILD, |s| {
                s.toggle_blacklist(CHANNEL);
            })
            .await;

        fx.pipeline.handle(&message("[[foo]]")).await.unwrap();
        assert!(engine.seen().is_empty());
        assert!(fx.sink.texts().is_empty());
    }

    #[tokio::test]
    async fn results_deliver_to_the_bot_channel_when_configured() {
        let engine = Arc::new(ScriptedEngine::answering("foo", vec![exact("n", "r")]));
        let fx = fixture(vec![engine]);

        fx.store
            .update(GUILD, |s| s.bot_channel = Some(999))
            .await;

        fx.pipeline.handle(&message("[[foo]]")).await.unwrap();

        let sent = fx.sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 999);
        assert_eq!(sent[0].1.reply_to, Some(500));
    }

    #[tokio::test]
    async fn tenant_delimiter_overrides_apply() {
        let engine = Arc::new(ScriptedEngine::answering("foo", vec![exact("n", "r")]));
        let fx = fixture(vec![Arc::clone(&engine) as Arc<dyn SearchEngine>]);

        fx.store
            .update(GUILD, |s| {
                s.set_token_left("{{").unwrap();
                s.set_token_right("}}").unwrap();
            })
            .await;

        // the default syntax no longer matches
        fx.pipeline.handle(&message("[[foo]]")).await.unwrap();
        assert!(engine.seen().is_empty());

        fx.pipeline.handle(&message("{{foo}}")).await.unwrap();
        assert_eq!(engine.seen(), ["foo"]);
    }

    #[tokio::test]
    async fn rate_limited_bot_senders_are_silently_dropped() {
        let engine = Arc::new(ScriptedEngine::answering("foo", vec![exact("n", "r")]));
        let fx = fixture(vec![Arc::clone(&engine) as Arc<dyn SearchEngine>]);

        let mut msg = message("[[foo]]");
        msg.author_is_bot = true;

        // short window admits 5; the 6th is silently discarded
        for _ in 0..6 {
            fx.pipeline.handle(&msg).await.unwrap();
        }
        assert_eq!(engine.seen().len(), 5);
        assert_eq!(fx.sink.texts().len(), 5);
    }

    #[tokio::test]
    async fn direct_messages_search_with_default_syntax() {
        let engine = Arc::new(ScriptedEngine::answering("foo", vec![exact("n", "r")]));
        let fx = fixture(vec![Arc::clone(&engine) as Arc<dyn SearchEngine>]);

        let mut msg = message("[[foo]]");
        msg.guild_id = None;
        fx.pipeline.handle(&msg).await.unwrap();

        assert_eq!(engine.seen(), ["foo"]);
    }

    #[tokio::test]
    async fn commands_dispatch_and_surface_effects() {
        let mut config = PipelineConfig::new(BOT);
        config.admin_user_id = Some(42);
        let fx = fixture_with(config, Vec::new());

        let effect = fx.pipeline.handle(&message("-exit")).await.unwrap();
        assert_eq!(effect, CommandEffect::Shutdown);
    }

    #[tokio::test]
    async fn mention_prefix_gates_commands_but_not_queries() {
        let mut config = PipelineConfig::new(BOT);
        config.mention_prefix = Some("<@1>".into());
        let engine = Arc::new(ScriptedEngine::answering("foo", vec![exact("n", "r")]));
        let fx = fixture_with(config, vec![Arc::clone(&engine) as Arc<dyn SearchEngine>]);

        // not addressed to the bot: command ignored, query still runs
        fx.pipeline.handle(&message("-version [[foo]]")).await.unwrap();
        assert_eq!(engine.seen(), ["foo"]);
        assert_eq!(fx.sink.texts(), ["r"]);

        // addressed: the command dispatches too
        fx.pipeline.handle(&message("<@1> -version")).await.unwrap();
        assert!(fx.sink.texts()[1].contains("lorebot"));
    }

    #[tokio::test]
    async fn guild_lifecycle_creates_and_deletes_saves() {
        let fx = fixture(Vec::new());

        fx.pipeline.guild_joined(GUILD, "Test Guild").await;
        assert!(fx.store.has_save(GUILD).await);

        fx.pipeline.guild_removed(GUILD).await;
        assert!(!fx.store.has_save(GUILD).await);
    }
}
