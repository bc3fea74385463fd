//! Prompt display order.
//!
//! Reads always sort by `display_order, id`. Appends take `max + 1`,
//! deletes leave gaps, and an explicit reorder rewrites every row to its
//! position in the caller's list.

use crate::error::{Error, Result};
use crate::model::SuiteScope;
use crate::storage::sqlite::{SqliteStore, resolve_suite};
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::debug;

/// Order value for a prompt appended to `suite_id`.
pub(crate) fn next_display_order(conn: &Connection, suite_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(display_order), -1) + 1 FROM prompts WHERE suite_id = ?1",
        [suite_id],
        |row| row.get(0),
    )
}

/// Prompt ids of a suite in read order.
pub(crate) fn ordered_prompt_ids(conn: &Connection, suite_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM prompts WHERE suite_id = ?1 ORDER BY display_order, id",
    )?;
    let ids = stmt
        .query_map([suite_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Check that `ordered` is a permutation of `existing`.
///
/// # Errors
///
/// `Validation` naming the first duplicate, missing or foreign id.
pub fn check_permutation(existing: &[i64], ordered: &[i64]) -> Result<()> {
    let mut seen = HashSet::with_capacity(ordered.len());
    for id in ordered {
        if !seen.insert(*id) {
            return Err(Error::Validation(format!("prompt {id} listed twice")));
        }
    }

    let known: HashSet<i64> = existing.iter().copied().collect();
    if let Some(foreign) = ordered.iter().find(|id| !known.contains(id)) {
        return Err(Error::Validation(format!(
            "prompt {foreign} does not belong to this suite"
        )));
    }
    if let Some(missing) = existing.iter().find(|id| !seen.contains(id)) {
        return Err(Error::Validation(format!("prompt {missing} missing from new order")));
    }
    Ok(())
}

/// Move the element at `from` so it lands at position `to` of the result.
///
/// `to == ids.len()` means "to the end".
///
/// # Errors
///
/// `Validation` if either index is out of range.
pub fn move_within(ids: &[i64], from: usize, to: usize) -> Result<Vec<i64>> {
    if from >= ids.len() || to > ids.len() {
        return Err(Error::Validation(format!(
            "cannot move prompt {from} to {to}: suite has {} prompts",
            ids.len()
        )));
    }

    let mut out = ids.to_vec();
    let id = out.remove(from);
    let to = if to > from { to - 1 } else { to };
    out.insert(to.min(out.len()), id);
    Ok(out)
}

fn write_order(conn: &Connection, ordered: &[i64]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("UPDATE prompts SET display_order = ?1 WHERE id = ?2")?;
    for (position, id) in (0_i64..).zip(ordered) {
        stmt.execute([position, *id])?;
    }
    Ok(())
}

impl SqliteStore {
    /// Rewrite the display order of a suite's prompts.
    ///
    /// # Errors
    ///
    /// `Validation` unless `ordered` lists every prompt of the suite exactly once.
    pub fn reorder_prompts(&self, scope: SuiteScope<'_>, ordered: &[i64]) -> Result<()> {
        self.mutate("reorder_prompts", |tx, ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            let existing = ordered_prompt_ids(tx, suite_id)?;
            check_permutation(&existing, ordered)?;
            write_order(tx, ordered)?;
            ctx.notify_suite(suite_id);
            debug!(suite_id, prompts = ordered.len(), "Reordered prompts");
            Ok(())
        })
    }

    /// Move the prompt at read position `from` to position `to`.
    ///
    /// `to` may equal the prompt count, meaning "to the end". The read and
    /// the rewrite happen in one transaction.
    ///
    /// # Errors
    ///
    /// `Validation` if either index is out of range.
    pub fn move_prompt(&self, scope: SuiteScope<'_>, from: usize, to: usize) -> Result<()> {
        self.mutate("move_prompt", |tx, ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            let moved = move_within(&ordered_prompt_ids(tx, suite_id)?, from, to)?;
            write_order(tx, &moved)?;
            ctx.notify_suite(suite_id);
            debug!(suite_id, from, to, "Moved prompt");
            Ok(())
        })
    }
}
