//! `memory read|write|quarantine` (spec §6, §4.K).
//!
//! Operates directly on the `memory_entry` table, the same one
//! `astrid-broker`'s HTTP routes serve to in-process callers — this is the
//! operator's out-of-band path, bypassing internal-auth entirely since the
//! CLI already runs with full local trust.

use anyhow::Result;
use astrid_storage::tables::{GenericTable, Table, names};
use serde::{Deserialize, Serialize};

use crate::commands::Outcome;
use crate::context::CliContext;
use crate::theme::Theme;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryEntry {
    id: String,
    content: String,
    status: MemoryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MemoryStatus {
    Proposed,
    Confirmed,
    Quarantined,
}

fn table(ctx: &CliContext) -> GenericTable {
    GenericTable::new(ctx.db.clone(), names::MEMORY_ENTRY)
}

pub(crate) async fn read(ctx: &CliContext, id: &str) -> Result<Outcome> {
    let entry: Option<MemoryEntry> = Table::get(&table(ctx), id).await?;
    let Some(entry) = entry else {
        return Ok(Outcome::Failure(format!("no memory entry at {id}")));
    };

    println!("{}", Theme::kv("id", &entry.id));
    println!("{}", Theme::kv("status", &format!("{:?}", entry.status)));
    println!("{}", Theme::kv("content", &entry.content));
    Ok(Outcome::Success)
}

pub(crate) async fn write(ctx: &CliContext, id: String, content: String) -> Result<Outcome> {
    let entry = MemoryEntry { id: id.clone(), content, status: MemoryStatus::Proposed };
    Table::upsert(&table(ctx), &id, &entry).await?;
    println!("{}", Theme::success(&format!("wrote memory entry {id} (proposed)")));
    Ok(Outcome::Success)
}

pub(crate) async fn quarantine(ctx: &CliContext, id: &str) -> Result<Outcome> {
    let table = table(ctx);
    let Some(mut entry): Option<MemoryEntry> = Table::get(&table, id).await? else {
        return Ok(Outcome::Failure(format!("no memory entry at {id}")));
    };
    entry.status = MemoryStatus::Quarantined;
    Table::upsert(&table, id, &entry).await?;
    println!("{}", Theme::success(&format!("quarantined memory entry {id}")));
    Ok(Outcome::Success)
}
