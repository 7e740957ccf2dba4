use serde::{Deserialize, Serialize};

/// User profile captured by the settings surface and read by the
/// generation coordinator. Created with defaults on install, never
/// deleted, only mutated.
///
/// `resume` and `profilePhoto` are base64 data URLs; `None` means the
/// user has not uploaded one yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub location: String,
    pub linkedin_url: String,
    pub resume: Option<String>,
    pub profile_photo: Option<String>,
    pub use_job_location: bool,
}
