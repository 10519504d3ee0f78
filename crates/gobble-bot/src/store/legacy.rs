//! Tab-separated interchange with the two-column user table
//! (`UserId`, `Saved Restaurants`).

use std::io::{BufRead, Write};

use gobble::DecidedSet;

use super::UserStore;
use crate::types::{McpError, McpResult};

pub const HEADER: &str = "UserId\tSaved Restaurants";

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub users: usize,
    pub saved: usize,
    /// Indices dropped because they fall outside the catalog.
    pub dropped: usize,
}

/// Write every user as `user_id<TAB>3, 0, 7`.
pub fn export_table<W: Write>(store: &mut UserStore, out: &mut W) -> McpResult<usize> {
    writeln!(out, "{HEADER}")?;
    let ids = store.user_ids()?;
    for user_id in &ids {
        let record = store.load(*user_id)?;
        writeln!(out, "{user_id}\t{}", record.state.decided.to_saved_list())?;
    }
    Ok(ids.len())
}

/// Merge a table into the store. Existing decisions are kept.
pub fn import_table<R: BufRead>(
    store: &mut UserStore,
    input: R,
    catalog_size: usize,
) -> McpResult<ImportReport> {
    let mut report = ImportReport::default();

    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || (line_no == 0 && line.starts_with("UserId")) {
            continue;
        }

        let (id_cell, saved_cell) = line.split_once('\t').unwrap_or((line.as_str(), ""));
        let user_id: i64 = id_cell.trim().parse().map_err(|_| {
            McpError::InvalidParams(format!(
                "Line {}: UserId {:?} is not an integer",
                line_no + 1,
                id_cell.trim()
            ))
        })?;

        let parsed = DecidedSet::parse_saved_list(saved_cell);
        let (saved, dropped) = store.update(user_id, |record| {
            let mut saved = 0usize;
            let mut dropped = 0usize;
            for index in parsed.iter() {
                if index >= catalog_size {
                    tracing::warn!(
                        "User {user_id}: dropping saved index {index} (catalog has {catalog_size})"
                    );
                    dropped += 1;
                } else if record.state.decided.insert(index) {
                    saved += 1;
                }
            }
            Ok((saved, dropped))
        })?;

        report.users += 1;
        report.saved += saved;
        report.dropped += dropped;
    }

    tracing::info!(
        "Imported {} users ({} saved, {} dropped)",
        report.users,
        report.saved,
        report.dropped
    );
    Ok(report)
}
