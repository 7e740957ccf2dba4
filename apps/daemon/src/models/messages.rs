//! Cross-surface wire types.
//!
//! Surfaces (popup, in-page overlay, settings page) are short-lived HTTP
//! clients; these types define the request/response contract they share
//! with the daemon. Field names match the original storage schema, so a
//! surface can round-trip values without renaming.

use serde::{Deserialize, Serialize};

/// Job posting details extracted by the page surface and passed to
/// `generate`. Extraction itself happens in the page — the daemon only
/// consumes the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    #[serde(default)]
    pub job_title: String,
    pub job_description: String,
    #[serde(default)]
    pub job_location: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_url: String,
    /// The job posting URL.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub job_id: String,
}

/// Placeholder the page surface uses when it could not read a location.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
