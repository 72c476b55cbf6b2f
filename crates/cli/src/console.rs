//! Console gateway adapter: stdin lines in, printed replies out.
//!
//! Each line becomes an inbound message in a synthetic guild/channel with
//! full permissions, so every command and query path is reachable locally.

use std::{collections::BTreeSet, sync::Arc};

use {
    async_trait::async_trait,
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::debug,
};

use {
    lorebot_commands::CommandEffect,
    lorebot_common::types::{ChannelId, InboundMessage, Permission, ReplyPayload, ReplySink},
    lorebot_pipeline::MessagePipeline,
};

/// Identity the pipeline treats as "self".
pub const BOT_USER: u64 = 0;
/// Identity attached to console input.
pub const CONSOLE_USER: u64 = 100;

const CONSOLE_GUILD: u64 = 1;
const CONSOLE_CHANNEL: u64 = 10;

struct ConsoleSink;

#[async_trait]
impl ReplySink for ConsoleSink {
    async fn send(&self, channel_id: ChannelId, payload: ReplyPayload) -> anyhow::Result<()> {
        println!("[#{channel_id}] {}", payload.text);
        Ok(())
    }
}

pub fn sink() -> Arc<dyn ReplySink> {
    Arc::new(ConsoleSink)
}

/// Feed stdin lines through the pipeline until EOF or a shutdown/restart
/// command. Returns the effect that ended the loop.
pub async fn run(pipeline: &MessagePipeline, as_bot: bool) -> anyhow::Result<CommandEffect> {
    let permissions: BTreeSet<Permission> = [
        Permission::ManageGuild,
        Permission::ReadChannels,
        Permission::ViewAuditLog,
    ]
    .into_iter()
    .collect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut message_id = 0u64;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        message_id += 1;

        let msg = InboundMessage {
            guild_id: Some(CONSOLE_GUILD),
            channel_id: CONSOLE_CHANNEL,
            message_id,
            author_id: CONSOLE_USER,
            author_name: "console".into(),
            author_is_bot: as_bot,
            body: line,
            mentioned_channels: Vec::new(),
            author_permissions: permissions.clone(),
        };

        match pipeline.handle(&msg).await {
            Ok(CommandEffect::None) => {},
            Ok(effect) => return Ok(effect),
            Err(err) => debug!(%err, "message handling failed"),
        }
    }

    Ok(CommandEffect::None)
}
