use serde::{Deserialize, Serialize};

/// One generated artifact, appended to `historyLog` on success.
///
/// `jobId` alone is NOT unique — applying twice to the same posting is
/// legal. Identity for dedup and removal is the composite
/// (jobId, timestamp, filename). An unknown job id is the empty-string
/// sentinel, never an absent field (the migrator enforces this).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub filename: String,
    pub job_title: String,
    pub company_name: String,
    #[serde(default)]
    pub company_url: String,
    #[serde(default)]
    pub job_post_url: String,
    #[serde(default)]
    pub job_id: String,
    /// Wall-clock milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn identity(&self) -> (&str, i64, &str) {
        (&self.job_id, self.timestamp, &self.filename)
    }
}
