//! `reset-db` (spec §6): wipes every kernel table. Guarded by a
//! confirmation phrase typed interactively, or — when stdin is not a
//! TTY, e.g. run from a script or a cron job — the same phrase supplied
//! through `ASTRID_RESET_DB_CONFIRM` instead.

use std::io::{IsTerminal, Write};

use anyhow::Result;
use astrid_storage::tables::names;

use crate::commands::Outcome;
use crate::context::CliContext;
use crate::theme::Theme;

const CONFIRM_PHRASE: &str = "RESET EVERYTHING";

const ALL_TABLES: &[&str] = &[
    names::SESSION,
    names::APPROVAL,
    names::IDENTITY_LINK,
    names::PENDING_LINK_CODE,
    names::TOTP_SESSION,
    names::PENDING_TOTP_MESSAGE,
    names::RATE_BUCKET,
    names::CIRCUIT_STATE,
    names::CRON_JOB,
    names::CRON_RUN,
    names::MEMORY_ENTRY,
    names::AUDIT_ENTRY,
    names::BAN,
    names::AUTH_NONCE,
];

fn confirmed_interactively() -> Result<bool> {
    println!("{}", Theme::warning("this permanently erases every table in the Astrid database"));
    print!("Type \"{CONFIRM_PHRASE}\" to continue: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == CONFIRM_PHRASE)
}

fn confirmed_from_env() -> bool {
    std::env::var("ASTRID_RESET_DB_CONFIRM").is_ok_and(|value| value.trim() == CONFIRM_PHRASE)
}

pub(crate) async fn reset_db(ctx: &CliContext) -> Result<Outcome> {
    let confirmed = if std::io::stdin().is_terminal() { confirmed_interactively()? } else { confirmed_from_env() };

    if !confirmed {
        return Ok(Outcome::Failure("reset-db was not confirmed".to_string()));
    }

    for table in ALL_TABLES {
        ctx.db.client().query("DELETE FROM type::table($table)").bind(("table", *table)).await?;
    }

    println!("{}", Theme::success("database reset"));
    Ok(Outcome::Success)
}
