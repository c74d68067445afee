//! `cron status|list|add|remove|enable|disable|run` (spec §6, §4.L).
//!
//! This CLI has no live connection to a running [`astrid_scheduler::SchedulerEngine`]
//! — jobs are opaque payloads executed by whatever process owns the
//! scheduler, not by the operator tool. `run` therefore does the one thing
//! available from here: force the job due immediately so the next
//! scheduler tick claims it, rather than executing it in-process.

use anyhow::Result;
use astrid_core::Timestamp;
use astrid_scheduler::{CronJob, Schedule, compute_next_run_at_ms};

use crate::commands::Outcome;
use crate::context::CliContext;
use crate::theme::Theme;

pub(crate) async fn status(ctx: &CliContext) -> Result<Outcome> {
    let jobs = ctx.cron().list_jobs().await?;
    let enabled = jobs.iter().filter(|j| j.enabled).count();
    let running = jobs.iter().filter(|j| j.running).count();
    println!("{}", Theme::header("Scheduler status"));
    println!("{}", Theme::kv("total jobs", &jobs.len().to_string()));
    println!("{}", Theme::kv("enabled", &enabled.to_string()));
    println!("{}", Theme::kv("currently running", &running.to_string()));
    Ok(Outcome::Success)
}

pub(crate) async fn list(ctx: &CliContext) -> Result<Outcome> {
    let mut jobs = ctx.cron().list_jobs().await?;
    if jobs.is_empty() {
        println!("{}", Theme::info("no cron jobs"));
        return Ok(Outcome::Success);
    }

    jobs.sort_by_key(|j| j.next_run_at.map(Timestamp::into_millis));
    println!("{}", Theme::header("Cron jobs"));
    println!("{}", Theme::separator());
    for job in jobs {
        let next = job.next_run_at.map_or_else(|| "-".to_string(), |t| Theme::timestamp(t.into_millis()));
        let state = if job.running { "running" } else if job.enabled { "enabled" } else { "disabled" };
        println!("{:<36} {:<24} {:<10} next={next} runs={}", job.id, job.name, state, job.run_count);
    }
    Ok(Outcome::Success)
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn add(
    ctx: &CliContext,
    id: String,
    name: String,
    at_ms: Option<i64>,
    every_ms: Option<i64>,
    cron_expr: Option<String>,
    action: serde_json::Value,
    timeout_ms: i64,
) -> Result<Outcome> {
    let schedule = match (at_ms, every_ms, cron_expr) {
        (Some(at), None, None) => Schedule::At { at: Timestamp::from_millis(at) },
        (None, Some(every_ms), None) => Schedule::Every { every_ms },
        (None, None, Some(expression)) => Schedule::Cron { expression },
        _ => return Ok(Outcome::Failure("specify exactly one of --at, --every-ms, --cron".to_string())),
    };

    let mut job = CronJob::new(id, name, schedule, action, timeout_ms);
    job.next_run_at = compute_next_run_at_ms(&job.schedule, Timestamp::now()).map(Timestamp::from_millis);
    if job.next_run_at.is_none() {
        return Ok(Outcome::Failure("schedule never fires (already in the past, or an invalid cron expression)".to_string()));
    }

    ctx.cron().put_job(&job).await?;
    println!("{}", Theme::success(&format!("scheduled {} ({})", job.id, job.name)));
    Ok(Outcome::Success)
}

pub(crate) async fn remove(ctx: &CliContext, id: &str) -> Result<Outcome> {
    ctx.cron().remove_job(id).await?;
    println!("{}", Theme::success(&format!("removed cron job {id}")));
    Ok(Outcome::Success)
}

async fn set_enabled(ctx: &CliContext, id: &str, enabled: bool) -> Result<Outcome> {
    let Some(mut job) = ctx.cron().get_job(id).await? else {
        return Ok(Outcome::Failure(format!("no such cron job: {id}")));
    };

    job.enabled = enabled;
    if enabled && job.next_run_at.is_none() {
        job.next_run_at = compute_next_run_at_ms(&job.schedule, Timestamp::now()).map(Timestamp::from_millis);
    }
    job.updated_at = Timestamp::now();
    ctx.cron().put_job(&job).await?;

    let verb = if enabled { "enabled" } else { "disabled" };
    println!("{}", Theme::success(&format!("{verb} cron job {id}")));
    Ok(Outcome::Success)
}

pub(crate) async fn enable(ctx: &CliContext, id: &str) -> Result<Outcome> {
    set_enabled(ctx, id, true).await
}

pub(crate) async fn disable(ctx: &CliContext, id: &str) -> Result<Outcome> {
    set_enabled(ctx, id, false).await
}

pub(crate) async fn run(ctx: &CliContext, id: &str) -> Result<Outcome> {
    let Some(mut job) = ctx.cron().get_job(id).await? else {
        return Ok(Outcome::Failure(format!("no such cron job: {id}")));
    };
    if job.running {
        return Ok(Outcome::Failure(format!("cron job {id} is already running")));
    }

    job.next_run_at = Some(Timestamp::now());
    ctx.cron().put_job(&job).await?;
    println!("{}", Theme::success(&format!("queued {id} to run on the next scheduler tick")));
    Ok(Outcome::Success)
}
