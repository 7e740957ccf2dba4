use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME_FORMAT: &str = "{job_title}_Resume_{name}";
pub const DEFAULT_TEMPLATE: &str = "professional";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// How aggressively the generator tailors content, 0–100.
    pub relevancy_power: u8,
    /// Artifact filename template. Placeholders: {job_title}, {name}, {company}.
    pub resume_name_format: String,
    pub template_choice: String,
    /// Folder prefix inside the download directory; empty = download root.
    pub save_location: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            relevancy_power: 50,
            resume_name_format: DEFAULT_NAME_FORMAT.to_string(),
            template_choice: DEFAULT_TEMPLATE.to_string(),
            save_location: String::new(),
        }
    }
}
