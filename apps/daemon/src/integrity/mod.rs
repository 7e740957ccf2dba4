//! Storage integrity: startup checks, self-healing repair, backup cycle.
//!
//! Nothing in this module is fatal. A read failure is treated as an empty
//! store and repaired; a missing backup is a no-op. The guardian runs on
//! every process start, before the router comes up.

pub mod backup;
pub mod migration;
pub mod preservation;

use tracing::{debug, warn};

use crate::store::{keys, Store, StoreError};

/// Startup integrity check over the whole store.
///
/// Empty store → full default initialization via preservation. Any
/// essential object missing → targeted repair via preservation. All
/// present → only the (cheap) history migration pass.
pub fn check_integrity(store: &Store) -> Result<(), StoreError> {
    if store.is_empty() {
        warn!("no storage data found, this could indicate data loss; re-initializing defaults");
        return preservation::preserve_user_data(store);
    }

    debug!(
        has_profile = store.contains(keys::PROFILE),
        has_settings = store.contains(keys::SETTINGS),
        has_history = store.contains(keys::HISTORY_LOG),
        "storage data summary"
    );

    let missing: Vec<&str> = keys::ESSENTIAL
        .iter()
        .copied()
        .filter(|k| !store.contains(k))
        .collect();

    if !missing.is_empty() {
        warn!("missing storage objects {missing:?}, running repair");
        return preservation::preserve_user_data(store);
    }

    debug!("storage integrity check passed, essential objects exist");
    migration::migrate_history(store)?;
    Ok(())
}
