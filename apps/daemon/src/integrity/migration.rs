//! Idempotent per-entry history schema upgrade.
//!
//! Ordered backfills, applied to every entry: companyUrl/jobPostUrl get
//! the empty string, jobId is re-derived from jobPostUrl, timestamp gets
//! the current time. The array is rewritten only if something actually
//! changed, so a second pass over migrated data touches nothing.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::history::job_id::derive_job_id;
use crate::store::{keys, Store, StoreError};

/// Runs the migration pass. Returns the number of entries that changed.
pub fn migrate_history(store: &Store) -> Result<usize, StoreError> {
    let Some(raw) = store.get_raw(keys::HISTORY_LOG) else {
        debug!("no history data found, migration not needed");
        return Ok(0);
    };
    let Value::Array(entries) = raw else {
        warn!("historyLog is not an array, leaving it for repair");
        return Ok(0);
    };

    debug!("checking {} history entries for migration", entries.len());

    let mut migrated_count = 0usize;
    let migrated: Vec<Value> = entries
        .into_iter()
        .map(|entry| migrate_entry(entry, &mut migrated_count))
        .collect();

    if migrated_count > 0 {
        info!("migrating {migrated_count} history entries to the current format");
        store.set(keys::HISTORY_LOG, &migrated)?;
    } else {
        debug!("all history entries already in the current format");
    }

    Ok(migrated_count)
}

fn migrate_entry(entry: Value, migrated_count: &mut usize) -> Value {
    let mut map = match entry {
        Value::Object(map) => map,
        // Not an object; nothing sensible to backfill.
        other => return other,
    };

    let mut changed = false;

    if !map.contains_key("companyUrl") {
        map.insert("companyUrl".to_string(), Value::String(String::new()));
        changed = true;
    }

    if !map.contains_key("jobPostUrl") {
        map.insert("jobPostUrl".to_string(), Value::String(String::new()));
        changed = true;
    }

    if !map.contains_key("jobId") {
        let url = map
            .get("jobPostUrl")
            .and_then(Value::as_str)
            .unwrap_or_default();
        map.insert("jobId".to_string(), Value::String(derive_job_id(url)));
        changed = true;
    }

    if !map.contains_key("timestamp") {
        map.insert(
            "timestamp".to_string(),
            Value::from(Utc::now().timestamp_millis()),
        );
        changed = true;
    }

    if changed {
        *migrated_count += 1;
    }
    Value::Object(map)
}
