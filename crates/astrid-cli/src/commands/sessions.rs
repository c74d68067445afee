//! `sessions [--active N] [--limit N]` (spec §6).
//!
//! `astrid-session::SessionMap` is purely in-memory and lives inside the
//! mediator process this CLI does not share, so session visibility here is
//! grounded on audit history instead — every session that has appended at
//! least one audit entry is recoverable this way, with `last_active` taken
//! from its most recent entry.

use anyhow::Result;
use astrid_core::Timestamp;

use crate::commands::Outcome;
use crate::context::CliContext;
use crate::theme::Theme;

pub(crate) async fn list(ctx: &CliContext, active_minutes: Option<i64>, limit: usize) -> Result<Outcome> {
    let session_ids = ctx.audit.list_sessions().await?;
    if session_ids.is_empty() {
        println!("{}", Theme::info("no sessions recorded"));
        return Ok(Outcome::Success);
    }

    let mut rows = Vec::with_capacity(session_ids.len());
    for session_id in session_ids {
        let entries = ctx.audit.get_session_entries(session_id).await?;
        let Some(last) = entries.last() else { continue };
        rows.push((session_id, entries.len(), last.timestamp));
    }

    rows.sort_by(|a, b| b.2.cmp(&a.2));

    if let Some(minutes) = active_minutes {
        let cutoff = Timestamp::now().plus_millis(-minutes.saturating_mul(60_000));
        rows.retain(|(_, _, last_active)| *last_active >= cutoff);
    }
    rows.truncate(limit);

    if rows.is_empty() {
        println!("{}", Theme::info("no sessions match that filter"));
        return Ok(Outcome::Success);
    }

    println!("{}", Theme::header("Sessions"));
    println!("{}", Theme::separator());
    for (session_id, entry_count, last_active) in rows {
        println!(
            "{:<48} entries={entry_count:<6} last_active={}",
            session_id.to_string(),
            Theme::timestamp(last_active.into_millis())
        );
    }
    Ok(Outcome::Success)
}
