use serde::{Deserialize, Serialize};

/// Persisted generation state. This is the sole mechanism by which a
/// freshly (re)opened surface reconstructs in-flight or terminal state,
/// so every transition is written to the store before any notification
/// goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
    Cancelled,
}
