//! `ban` / `unban` / `list-bans` / `force-reauth` (spec §6).

use std::path::PathBuf;

use anyhow::Result;
use astrid_totp::{GateConfig, TotpGate, UnixSocketTotpDaemon};

use crate::commands::Outcome;
use crate::context::CliContext;
use crate::theme::Theme;

const OPERATOR: &str = "cli-operator";

/// Default path to the TOTP daemon's Unix socket, overridable via
/// `ASTRID_TOTP_SOCKET`. `force-reauth` never actually dials it — it only
/// deletes the local session row — so an unreachable daemon does not block
/// this command.
fn totp_socket_path() -> PathBuf {
    std::env::var("ASTRID_TOTP_SOCKET").map_or_else(|_| PathBuf::from("/run/astrid/totp.sock"), PathBuf::from)
}

pub(crate) async fn ban(ctx: &CliContext, chat_id: &str, reason: Option<String>) -> Result<Outcome> {
    let reason = reason.unwrap_or_else(|| "no reason given".to_string());
    ctx.bans().ban(chat_id, reason.as_str(), OPERATOR).await?;
    println!("{}", Theme::success(&format!("banned {chat_id} ({reason})")));
    Ok(Outcome::Success)
}

pub(crate) async fn unban(ctx: &CliContext, chat_id: &str) -> Result<Outcome> {
    ctx.bans().unban(chat_id).await?;
    println!("{}", Theme::success(&format!("unbanned {chat_id}")));
    Ok(Outcome::Success)
}

pub(crate) async fn list_bans(ctx: &CliContext) -> Result<Outcome> {
    let mut bans = ctx.bans().list().await?;
    if bans.is_empty() {
        println!("{}", Theme::info("no banned chats"));
        return Ok(Outcome::Success);
    }

    bans.sort_by(|a, b| b.banned_at.cmp(&a.banned_at));
    println!("{}", Theme::header("Banned chats"));
    println!("{}", Theme::separator());
    for record in bans {
        println!(
            "{:<20} {:<16} {}  {}",
            record.chat_id,
            record.banned_by,
            Theme::timestamp(record.banned_at.into_millis()),
            record.reason
        );
    }
    Ok(Outcome::Success)
}

pub(crate) async fn force_reauth(ctx: &CliContext, chat_id: &str) -> Result<Outcome> {
    let Some(link) = ctx.identity_links().resolve(chat_id).await? else {
        return Ok(Outcome::Failure(format!("{chat_id} has no identity link; nothing to reauth")));
    };

    let gate = TotpGate::new(ctx.db.clone(), UnixSocketTotpDaemon::new(totp_socket_path()), GateConfig::default());
    gate.force_reauth(&link.local_user_id).await?;
    println!("{}", Theme::success(&format!("cleared the TOTP session for {} ({chat_id})", link.local_user_id)));
    Ok(Outcome::Success)
}
