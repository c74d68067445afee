//! Astrid operator CLI (spec §6): `ban`, `unban`, `force-reauth`,
//! `list-bans`, `cron status|list|add|remove|enable|disable|run`,
//! `sessions`, `memory read|write|quarantine`, `reset-db`.
//!
//! A thin, direct-to-storage admin tool — it talks to the same database
//! the Mediator and its satellite crates use, with no RPC daemon in
//! between. Exit codes follow spec §6: 0 success, 1 a refused or invalid
//! operation, >1 an unexpected error.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::process::ExitCode;

use anyhow::Result;
use astrid_telemetry::{LogConfig, setup_logging};
use clap::{Parser, Subcommand};

mod commands;
mod context;
mod theme;

use commands::Outcome;
use context::CliContext;
use theme::Theme;

#[derive(Parser)]
#[command(name = "astrid")]
#[command(author, version, about = "Astrid Security Mediation Kernel operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ban a chat from reaching the mediator.
    Ban {
        chat_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Lift a ban.
    Unban { chat_id: String },
    /// List every currently banned chat.
    ListBans,
    /// Invalidate a chat's verified TOTP session.
    ForceReauth { chat_id: String },
    /// Manage scheduled jobs.
    Cron {
        #[command(subcommand)]
        command: CronCommands,
    },
    /// List recent sessions, derived from audit history.
    Sessions {
        /// Only show sessions active within the last N minutes.
        #[arg(long)]
        active: Option<i64>,
        /// Maximum number of sessions to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Inspect or mutate the operator memory store.
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Wipe every kernel table. Requires confirmation.
    ResetDb,
}

#[derive(Subcommand)]
enum CronCommands {
    /// Summarize job counts.
    Status,
    /// List every job.
    List,
    /// Schedule a new job.
    Add {
        id: String,
        #[arg(long)]
        name: String,
        /// Run once at this millisecond timestamp.
        #[arg(long)]
        at: Option<i64>,
        /// Run every N milliseconds.
        #[arg(long = "every-ms")]
        every_ms: Option<i64>,
        /// Run on a standard 5-field cron expression.
        #[arg(long)]
        cron: Option<String>,
        /// Opaque JSON action payload, forwarded to whatever runs the job.
        #[arg(long, default_value = "{}")]
        action: String,
        /// Soft deadline, milliseconds.
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: i64,
    },
    /// Delete a job.
    Remove { id: String },
    /// Enable a disabled job.
    Enable { id: String },
    /// Disable a job without deleting it.
    Disable { id: String },
    /// Queue a job to run on the next scheduler tick, regardless of schedule.
    Run { id: String },
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Print a memory entry.
    Read { id: String },
    /// Propose a new memory entry.
    Write { id: String, content: String },
    /// Quarantine an existing memory entry.
    Quarantine { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = setup_logging(&LogConfig::new("info")) {
        eprintln!("{}", Theme::warning(&format!("logging setup failed: {err}")));
    }

    match run().await {
        Ok(Outcome::Success) => ExitCode::from(0),
        Ok(Outcome::Failure(message)) => {
            eprintln!("{}", Theme::error(&message));
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("{}", Theme::error(&format!("{err:#}")));
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<Outcome> {
    let cli = Cli::parse();
    let ctx = CliContext::connect().await?;

    match cli.command {
        Commands::Ban { chat_id, reason } => commands::bans::ban(&ctx, &chat_id, reason).await,
        Commands::Unban { chat_id } => commands::bans::unban(&ctx, &chat_id).await,
        Commands::ListBans => commands::bans::list_bans(&ctx).await,
        Commands::ForceReauth { chat_id } => commands::bans::force_reauth(&ctx, &chat_id).await,
        Commands::Cron { command } => run_cron(&ctx, command).await,
        Commands::Sessions { active, limit } => commands::sessions::list(&ctx, active, limit).await,
        Commands::Memory { command } => run_memory(&ctx, command).await,
        Commands::ResetDb => commands::reset_db::reset_db(&ctx).await,
    }
}

async fn run_cron(ctx: &CliContext, command: CronCommands) -> Result<Outcome> {
    match command {
        CronCommands::Status => commands::cron::status(ctx).await,
        CronCommands::List => commands::cron::list(ctx).await,
        CronCommands::Add { id, name, at, every_ms, cron, action, timeout_ms } => {
            let action: serde_json::Value = serde_json::from_str(&action)?;
            commands::cron::add(ctx, id, name, at, every_ms, cron, action, timeout_ms).await
        }
        CronCommands::Remove { id } => commands::cron::remove(ctx, &id).await,
        CronCommands::Enable { id } => commands::cron::enable(ctx, &id).await,
        CronCommands::Disable { id } => commands::cron::disable(ctx, &id).await,
        CronCommands::Run { id } => commands::cron::run(ctx, &id).await,
    }
}

async fn run_memory(ctx: &CliContext, command: MemoryCommands) -> Result<Outcome> {
    match command {
        MemoryCommands::Read { id } => commands::memory::read(ctx, &id).await,
        MemoryCommands::Write { id, content } => commands::memory::write(ctx, id, content).await,
        MemoryCommands::Quarantine { id } => commands::memory::quarantine(ctx, &id).await,
    }
}
