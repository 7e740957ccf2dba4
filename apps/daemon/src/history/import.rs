//! Data-pack import: merges a previously exported backup document into
//! the live store.
//!
//! Validation happens up front and rejection is wholesale — an invalid
//! pack writes nothing. History merges by composite identity, settings
//! are replaced, and the profile merge always keeps the live binary
//! payloads (exports carry placeholders, not real data).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::history::ledger;
use crate::integrity::preservation::merge_defaults;
use crate::models::history::HistoryEntry;
use crate::models::profile::Profile;
use crate::models::settings::Settings;
use crate::store::{keys, Store, StoreError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPack {
    pub timestamp: Option<i64>,
    pub version: Option<String>,
    #[serde(default)]
    pub profile: Option<Value>,
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub history_log: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub entries_added: usize,
    pub entries_skipped: usize,
    pub settings_replaced: bool,
    pub profile_merged: bool,
}

pub fn apply(store: &Store, pack: DataPack) -> Result<ImportReport, AppError> {
    let (Some(timestamp), Some(version)) = (pack.timestamp, pack.version.as_deref()) else {
        return Err(AppError::ImportFormat(
            "backup document is missing its timestamp or version".to_string(),
        ));
    };
    if let Some(settings) = &pack.settings {
        if settings.relevancy_power > 100 {
            return Err(AppError::ImportFormat(
                "relevancyPower must be an integer between 0 and 100".to_string(),
            ));
        }
    }
    info!("importing data pack from {timestamp} (exported by v{version})");

    let (entries_added, entries_skipped) = match pack.history_log {
        Some(entries) => ledger::merge(store, entries)?,
        None => (0, 0),
    };

    let settings_replaced = match pack.settings {
        Some(settings) => {
            store.set(keys::SETTINGS, &settings)?;
            true
        }
        None => false,
    };

    let profile_merged = match pack.profile {
        Some(imported) => {
            merge_profile(store, imported)?;
            true
        }
        None => false,
    };

    Ok(ImportReport {
        entries_added,
        entries_skipped,
        settings_replaced,
        profile_merged,
    })
}

/// Imported profile fields win, except the binary payloads: the live
/// resume and profile photo are always kept.
fn merge_profile(store: &Store, imported: Value) -> Result<(), AppError> {
    let current = store.get_raw(keys::PROFILE);
    let live_resume = current
        .as_ref()
        .and_then(|p| p.get("resume"))
        .cloned()
        .unwrap_or(Value::Null);
    let live_photo = current
        .as_ref()
        .and_then(|p| p.get("profilePhoto"))
        .cloned()
        .unwrap_or(Value::Null);

    // Current fields fill whatever the import leaves out.
    let mut merged = merge_defaults(Some(imported), current.unwrap_or(Value::Null));
    let merged_map = merged
        .as_object_mut()
        .ok_or_else(|| AppError::ImportFormat("profile is not an object".to_string()))?;
    merged_map.insert("resume".to_string(), live_resume);
    merged_map.insert("profilePhoto".to_string(), live_photo);

    let defaults = serde_json::to_value(Profile::default()).map_err(StoreError::from)?;
    let merged = merge_defaults(Some(merged), defaults);
    store.set(keys::PROFILE, &merged)?;
    Ok(())
}
