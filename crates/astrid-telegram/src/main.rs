//! Astrid Telegram channel adapter (spec §5): a thin `teloxide` frontend
//! wired directly into `astrid-mediator::Mediator`. No daemon, no RPC layer.
//!
//! Reads the bot token from `TELOXIDE_TOKEN`, per `teloxide`'s own
//! convention (`Bot::from_env`).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use astrid_crypto::KeyPair;
use astrid_mediator::{Mediator, MediatorConfig, UnconfiguredDispatcher};
use astrid_policy::{ObserverConfig, PermissionConfig, PolicyEngine};
use astrid_storage::Database;
use astrid_telemetry::{LogConfig, LogFormat, setup_logging};
use astrid_tools::GuardConfig;
use astrid_totp::{GateConfig, UnixSocketTotpDaemon};
use teloxide::Bot;

/// Resolve the Astrid home directory: `$ASTRID_HOME`, or `~/.astrid`.
///
/// Mirrors `astrid-cli`'s own resolution so every binary pointed at the
/// same home shares the same database and runtime key.
fn astrid_home() -> PathBuf {
    if let Ok(home) = std::env::var("ASTRID_HOME") {
        return PathBuf::from(home);
    }
    directories::BaseDirs::new().map_or_else(|| PathBuf::from(".astrid"), |dirs| dirs.home_dir().join(".astrid"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let resolved = astrid_config::Config::load(None).context("loading configuration")?;
    let config = resolved.config;

    let log_format = if config.logging.json { LogFormat::Json } else { LogFormat::Pretty };
    setup_logging(&LogConfig::new(config.logging.level.clone()).with_format(log_format))
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("initializing logging")?;

    let home = astrid_home();
    let data_dir = home.join("data");
    let key_path = home.join("keys").join("runtime.key");
    std::fs::create_dir_all(&data_dir).with_context(|| format!("creating data directory {}", data_dir.display()))?;
    std::fs::create_dir_all(key_path.parent().expect("key_path has a parent"))
        .with_context(|| format!("creating key directory for {}", key_path.display()))?;

    let db = Database::connect_embedded(data_dir.to_str().context("data directory path is not valid UTF-8")?)
        .await
        .context("opening the Astrid database")?;
    let runtime_key = KeyPair::load_or_generate(&key_path).context("loading or generating the runtime key")?;

    let totp_daemon = UnixSocketTotpDaemon::new(config.totp.socket_path.clone());
    let policy = PolicyEngine::new(ObserverConfig::default());
    let mediator_config = MediatorConfig {
        permissions: PermissionConfig::default(),
        sandbox_initialized: false,
        approval_ttl_millis: 5 * 60 * 1000,
        guard: GuardConfig::default(),
    };

    let mediator = Mediator::new(db, policy, totp_daemon, GateConfig::default(), runtime_key, mediator_config);
    let dispatcher: Arc<dyn astrid_mediator::AgentDispatcher> = Arc::new(UnconfiguredDispatcher);
    let state = Arc::new(astrid_telegram::BotState::new(mediator, dispatcher, "telegram:social".to_owned(), "astrid".to_owned()));

    let bot = Bot::from_env();
    astrid_telegram::run(bot, state).await.map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}
