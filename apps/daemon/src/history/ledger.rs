//! Append/lookup/delete/merge over the history log.
//!
//! Storage order is append order (chronological application order). The
//! UI shows a newest-first sort, so deletion goes through the sorted view
//! and resolves a composite identity before touching the underlying
//! array — display indexes never address storage slots directly.

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::models::history::HistoryEntry;
use crate::store::{keys, Store, StoreError};

/// What `checkHistory` reports for a job that was already applied to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMatch {
    pub job_title: String,
    pub company_name: String,
    pub filename: String,
    pub application_date: String,
    pub job_post_url: String,
}

fn load(store: &Store) -> Vec<HistoryEntry> {
    store.get(keys::HISTORY_LOG).unwrap_or_default()
}

/// Appends one entry to the end of the log and persists the full array.
pub fn append(store: &Store, entry: HistoryEntry) -> Result<(), StoreError> {
    let mut history = load(store);
    history.push(entry);
    store.set(keys::HISTORY_LOG, &history)
}

/// Finds the latest application for `job_id`.
///
/// The empty-string sentinel never matches: stored entries may carry it
/// too, and "" matching "" would claim unrelated unidentifiable postings
/// were the same job. Among matches the max timestamp wins; ties keep
/// the earliest array position, deterministically.
pub fn lookup(store: &Store, job_id: &str) -> Option<HistoryMatch> {
    if job_id.is_empty() {
        return None;
    }
    let history = load(store);
    let best = history
        .iter()
        .filter(|e| e.job_id == job_id)
        .fold(None::<&HistoryEntry>, |best, e| match best {
            Some(b) if e.timestamp > b.timestamp => Some(e),
            None => Some(e),
            other => other,
        })?;

    Some(HistoryMatch {
        job_title: best.job_title.clone(),
        company_name: best.company_name.clone(),
        filename: best.filename.clone(),
        application_date: format_timestamp(best.timestamp),
        job_post_url: best.job_post_url.clone(),
    })
}

/// Newest-first view for the history surface. Stable sort, so entries
/// sharing a timestamp keep their storage order.
pub fn list(store: &Store) -> Vec<HistoryEntry> {
    let mut history = load(store);
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    history
}

/// Deletes the entry at `display_index` in the newest-first view.
///
/// Recomputes the sorted view, resolves the target's composite identity,
/// then removes matching entries from the unsorted array. Returns the
/// resolved entry, or `None` when the index is out of range.
pub fn delete(store: &Store, display_index: usize) -> Result<Option<HistoryEntry>, StoreError> {
    let sorted = list(store);
    let Some(target) = sorted.get(display_index).cloned() else {
        return Ok(None);
    };

    let identity = target.identity();
    let remaining: Vec<HistoryEntry> = load(store)
        .into_iter()
        .filter(|e| e.identity() != identity)
        .collect();

    store.set(keys::HISTORY_LOG, &remaining)?;
    Ok(Some(target))
}

/// Merges imported entries: identities already present are dropped, only
/// genuinely new entries are appended. Existing entries are never
/// overwritten. Returns (added, skipped).
pub fn merge(store: &Store, imported: Vec<HistoryEntry>) -> Result<(usize, usize), StoreError> {
    let mut history = load(store);
    let existing: HashSet<(String, i64, String)> = history
        .iter()
        .map(|e| (e.job_id.clone(), e.timestamp, e.filename.clone()))
        .collect();

    let mut added = 0usize;
    let mut skipped = 0usize;
    for entry in imported {
        let key = (entry.job_id.clone(), entry.timestamp, entry.filename.clone());
        if existing.contains(&key) {
            skipped += 1;
        } else {
            history.push(entry);
            added += 1;
        }
    }

    if added > 0 {
        store.set(keys::HISTORY_LOG, &history)?;
    }
    Ok((added, skipped))
}

/// Wholesale reset, user-initiated from the history surface.
pub fn clear(store: &Store) -> Result<(), StoreError> {
    store.set(keys::HISTORY_LOG, &Vec::<HistoryEntry>::new())
}

fn format_timestamp(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => millis.to_string(),
    }
}
