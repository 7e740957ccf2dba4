//! Profile and settings accessors for the settings surface.
//!
//! PUT is an overlay update with the same non-destructive contract as
//! repair: incoming fields win, absent fields keep their stored value,
//! and nothing is ever blanked by a partial body.

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::errors::AppError;
use crate::integrity::preservation::overlay_update;
use crate::models::profile::Profile;
use crate::models::settings::Settings;
use crate::state::AppState;
use crate::store::{keys, StoreError};

/// GET /api/v1/profile
pub async fn get_profile(State(state): State<AppState>) -> Json<Profile> {
    Json(state.store.get(keys::PROFILE).unwrap_or_default())
}

/// PUT /api/v1/profile
pub async fn put_profile(
    State(state): State<AppState>,
    Json(incoming): Json<Value>,
) -> Result<Json<Profile>, AppError> {
    if !incoming.is_object() {
        return Err(AppError::Validation("profile must be an object".to_string()));
    }
    let defaults = serde_json::to_value(Profile::default()).map_err(StoreError::from)?;
    let merged = overlay_update(state.store.get_raw(keys::PROFILE), incoming, defaults);

    // Type-check the merged document before persisting it.
    let profile: Profile = serde_json::from_value(merged.clone())
        .map_err(|e| AppError::Validation(format!("profile does not match its schema: {e}")))?;

    state.store.set(keys::PROFILE, &merged)?;
    Ok(Json(profile))
}

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.store.get(keys::SETTINGS).unwrap_or_default())
}

/// PUT /api/v1/settings
pub async fn put_settings(
    State(state): State<AppState>,
    Json(incoming): Json<Value>,
) -> Result<Json<Settings>, AppError> {
    if !incoming.is_object() {
        return Err(AppError::Validation("settings must be an object".to_string()));
    }
    if let Some(power) = incoming.get("relevancyPower") {
        let valid = power.as_u64().map(|p| p <= 100).unwrap_or(false);
        if !valid {
            return Err(AppError::Validation(
                "relevancyPower must be an integer between 0 and 100".to_string(),
            ));
        }
    }

    let defaults = serde_json::to_value(Settings::default()).map_err(StoreError::from)?;
    let merged = overlay_update(state.store.get_raw(keys::SETTINGS), incoming, defaults);

    let settings: Settings = serde_json::from_value(merged.clone())
        .map_err(|e| AppError::Validation(format!("settings do not match their schema: {e}")))?;

    state.store.set(keys::SETTINGS, &merged)?;
    Ok(Json(settings))
}
