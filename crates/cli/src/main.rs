//! lorebot entrypoint.
//!
//! The chat-platform gateway is an external collaborator; this binary wires
//! the message pipeline to a console adapter so the whole flow can run (and
//! be poked at) locally: type a line, it becomes an inbound message.

mod console;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use {
    clap::Parser,
    tracing::{info, warn},
    tracing_subscriber::EnvFilter,
};

use {
    lorebot_commands::CommandEffect,
    lorebot_engines::{EasterEggEngine, GlossaryEngine, SearchEngine},
    lorebot_pipeline::{MessagePipeline, PipelineConfig},
    lorebot_settings::SettingsStore,
};

/// Exit code asking a supervisor to start a fresh process.
const EXIT_RESTART: u8 = 2;

#[derive(Parser)]
#[command(name = "lorebot", about = "lorebot — delimited-query search bot")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Guild settings directory (defaults to ~/.lorebot/guilds).
    #[arg(long, env = "LOREBOT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// User id allowed to run admin commands. Defaults to the console user.
    #[arg(long, default_value_t = console::CONSOLE_USER)]
    admin_id: u64,

    /// Treat console input as coming from a bot, to exercise rate limiting.
    #[arg(long, default_value_t = false)]
    as_bot: bool,

    /// Glossary database (`term=definition` lines).
    #[arg(long, default_value = "db/glossary.txt")]
    glossary_db: PathBuf,

    /// Easter egg database (`name=response` lines).
    #[arg(long, default_value = "db/easter_eggs.txt")]
    eggs_db: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let store = match &cli.data_dir {
        Some(dir) => SettingsStore::new(dir.clone()),
        None => SettingsStore::default_path()?,
    };

    let mut engines: Vec<Arc<dyn SearchEngine>> = Vec::new();
    if cli.glossary_db.exists() {
        engines.push(Arc::new(GlossaryEngine::new(cli.glossary_db.clone())));
    } else {
        warn!(path = %cli.glossary_db.display(), "glossary database not found, engine disabled");
    }
    if cli.eggs_db.exists() {
        engines.push(Arc::new(EasterEggEngine::new(cli.eggs_db.clone())));
    } else {
        warn!(path = %cli.eggs_db.display(), "easter egg database not found, engine disabled");
    }

    let mut config = PipelineConfig::new(console::BOT_USER);
    config.admin_user_id = Some(cli.admin_id);

    let pipeline = MessagePipeline::new(config, Arc::new(store), engines, console::sink());

    info!("lorebot ready, reading messages from stdin");
    let effect = console::run(&pipeline, cli.as_bot).await?;

    Ok(match effect {
        CommandEffect::Restart => ExitCode::from(EXIT_RESTART),
        _ => ExitCode::SUCCESS,
    })
}
