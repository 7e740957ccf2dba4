//! Periodic whole-store snapshot and conservative startup restore.
//!
//! One backup slot, overwritten wholesale each cycle. Restore runs once
//! at startup and writes back only keys the live store is missing; it
//! never overwrites live data, and never restores the slot into itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::store::{keys, Store, StoreError};

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupSlot {
    /// Wall-clock milliseconds at snapshot time.
    pub timestamp: i64,
    pub data: Map<String, Value>,
}

/// Snapshots the whole store (minus the slot itself) into `backupSlot`,
/// unconditionally overwriting any prior snapshot.
pub fn snapshot(store: &Store) -> Result<(), StoreError> {
    let mut data = store.snapshot();
    data.remove(keys::BACKUP_SLOT);
    if data.is_empty() {
        warn!("no data to back up");
        return Ok(());
    }

    let slot = BackupSlot {
        timestamp: Utc::now().timestamp_millis(),
        data,
    };
    store.set(keys::BACKUP_SLOT, &slot)?;
    debug!("data backup created at {}", slot.timestamp);
    Ok(())
}

/// Startup-only restore. Returns the number of keys written back.
///
/// No-op when there is no backup, or when all essential objects are
/// already live — this function never overwrites existing live data.
pub fn restore(store: &Store) -> Result<usize, StoreError> {
    let Some(slot) = store.get::<BackupSlot>(keys::BACKUP_SLOT) else {
        debug!("no backup found");
        return Ok(0);
    };
    info!("found backup from {}", slot.timestamp);

    let has_essential = keys::ESSENTIAL.iter().all(|k| store.contains(k));
    if has_essential {
        debug!("all essential data present, no need to restore from backup");
        return Ok(0);
    }

    let mut restored = 0usize;
    store.update(|map| {
        for (key, value) in slot.data {
            if key == keys::BACKUP_SLOT || map.contains_key(&key) {
                continue;
            }
            info!("restoring '{key}' from backup");
            map.insert(key, value);
            restored += 1;
        }
    })?;

    if restored > 0 {
        info!("restored {restored} keys from backup");
    }
    Ok(restored)
}

/// Runs an initial snapshot, then one per interval for the life of the
/// process. Independent of any in-flight generation.
pub fn spawn_backup_task(store: Arc<Store>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = snapshot(&store) {
            warn!("initial backup failed: {e}");
        }
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await; // first tick fires immediately; already snapshotted
        loop {
            ticker.tick().await;
            if let Err(e) = snapshot(&store) {
                warn!("periodic backup failed: {e}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path().join("store.json")).expect("open");
        (dir, store)
    }

    #[test]
    fn snapshot_excludes_the_slot_itself() {
        let (_dir, store) = temp_store();
        store.set(keys::PROFILE, &json!({"fullName": "Jane"})).unwrap();
        snapshot(&store).unwrap();
        // Second snapshot must not capture the first one.
        snapshot(&store).unwrap();

        let slot: BackupSlot = store.get(keys::BACKUP_SLOT).unwrap();
        assert!(slot.data.contains_key(keys::PROFILE));
        assert!(!slot.data.contains_key(keys::BACKUP_SLOT));
        assert!(slot.timestamp <= Utc::now().timestamp_millis());
    }

    #[test]
    fn snapshot_of_empty_store_writes_nothing() {
        let (_dir, store) = temp_store();
        snapshot(&store).unwrap();
        assert!(!store.contains(keys::BACKUP_SLOT));
    }

    #[test]
    fn restore_is_noop_without_backup() {
        let (_dir, store) = temp_store();
        assert_eq!(restore(&store).unwrap(), 0);
    }

    #[test]
    fn restore_never_overwrites_live_data() {
        let (_dir, store) = temp_store();
        store.set(keys::PROFILE, &json!({"fullName": "Old"})).unwrap();
        store.set(keys::SETTINGS, &json!({"relevancyPower": 50})).unwrap();
        store.set(keys::HISTORY_LOG, &json!([])).unwrap();
        snapshot(&store).unwrap();

        // Live profile diverges from the backup; settings goes missing.
        store.set(keys::PROFILE, &json!({"fullName": "New"})).unwrap();
        store.remove(keys::SETTINGS).unwrap();

        let restored = restore(&store).unwrap();
        assert_eq!(restored, 1);

        let profile = store.get_raw(keys::PROFILE).unwrap();
        assert_eq!(profile, json!({"fullName": "New"}));
        assert_eq!(
            store.get_raw(keys::SETTINGS).unwrap(),
            json!({"relevancyPower": 50})
        );
    }

    #[test]
    fn restore_skips_when_essentials_are_live() {
        let (_dir, store) = temp_store();
        store.set(keys::PROFILE, &json!({"fullName": "A"})).unwrap();
        store.set(keys::SETTINGS, &json!({})).unwrap();
        store.set(keys::HISTORY_LOG, &json!([])).unwrap();
        store.set("extraKey", &json!("x")).unwrap();
        snapshot(&store).unwrap();

        // extraKey missing but all essentials live: conservative no-op.
        store.remove("extraKey").unwrap();
        assert_eq!(restore(&store).unwrap(), 0);
        assert!(!store.contains("extraKey"));
    }
}
