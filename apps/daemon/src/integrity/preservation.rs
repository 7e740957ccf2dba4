//! Field-level default-merge repair.
//!
//! The schema grows across versions; repair must never discard data a
//! previous version captured. So this is a targeted merge on the raw JSON
//! objects — existing populated fields are kept verbatim, only genuinely
//! missing fields receive defaults — never a wholesale replacement.

use serde_json::Value;
use tracing::info;

use crate::integrity::migration;
use crate::models::profile::Profile;
use crate::models::settings::Settings;
use crate::store::{keys, Store, StoreError};

/// Repairs or initializes the top-level schema objects, then runs the
/// history migration pass.
pub fn preserve_user_data(store: &Store) -> Result<(), StoreError> {
    if store.is_empty() {
        info!("no existing data found, initializing defaults");
        let profile = serde_json::to_value(Profile::default())?;
        let settings = serde_json::to_value(Settings::default())?;
        store.update(|map| {
            map.insert(keys::PROFILE.to_string(), profile);
            map.insert(keys::SETTINGS.to_string(), settings);
            map.insert(keys::HISTORY_LOG.to_string(), Value::Array(vec![]));
        })?;
        return Ok(());
    }

    info!("existing data found, ensuring schema is up to date");
    let profile_defaults = serde_json::to_value(Profile::default())?;
    let settings_defaults = serde_json::to_value(Settings::default())?;

    store.update(|map| {
        let profile = merge_defaults(map.remove(keys::PROFILE), profile_defaults);
        let settings = merge_defaults(map.remove(keys::SETTINGS), settings_defaults);
        map.insert(keys::PROFILE.to_string(), profile);
        map.insert(keys::SETTINGS.to_string(), settings);
        map.entry(keys::HISTORY_LOG.to_string())
            .or_insert_with(|| Value::Array(vec![]));
    })?;

    migration::migrate_history(store)?;
    Ok(())
}

/// Fills only genuinely missing fields of `existing` from `defaults`.
/// A non-object existing value is replaced wholesale by the defaults;
/// fields unknown to the default schema survive untouched.
pub fn merge_defaults(existing: Option<Value>, defaults: Value) -> Value {
    let Some(Value::Object(mut map)) = existing else {
        return defaults;
    };
    if let Value::Object(defaults) = defaults {
        for (key, default_value) in defaults {
            let missing = match map.get(&key) {
                None => true,
                // JSON null only counts as missing when the default is
                // non-null; a null default (e.g. no resume uploaded) is a
                // legitimate stored value.
                Some(Value::Null) => !default_value.is_null(),
                Some(_) => false,
            };
            if missing {
                map.insert(key, default_value);
            }
        }
    }
    Value::Object(map)
}

/// Overlay used by the profile/settings PUT handlers: `incoming` fields
/// win, absent fields keep their current value, and anything still
/// missing is defaulted. Same non-destructive contract as repair.
pub fn overlay_update(current: Option<Value>, incoming: Value, defaults: Value) -> Value {
    let mut base = merge_defaults(current, defaults);
    if let (Value::Object(base_map), Value::Object(incoming)) = (&mut base, incoming) {
        for (key, value) in incoming {
            base_map.insert(key, value);
        }
    }
    base
}
