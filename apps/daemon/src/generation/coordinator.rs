//! Generation Coordinator — owns the single in-flight request.
//!
//! States: idle → loading → {success, error, cancelled}, and back to idle
//! on the next start or via staleness reconciliation. The coordinator
//! holds exactly one optional active-request slot; single-flight is
//! enforced at the slot, not by caller discipline. Every terminal state
//! is written to the store strictly before any cross-surface notification
//! goes out, so a freshly reopened surface always reads a consistent
//! terminal state.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::generation::client::{
    decode_data_url, GeneratedArtifact, GenerationBackend, GenerationJob, GeneratorError,
};
use crate::generation::filename::render_filename;
use crate::history::ledger;
use crate::models::history::HistoryEntry;
use crate::models::messages::{JobDetails, UNKNOWN_LOCATION};
use crate::models::profile::Profile;
use crate::models::settings::Settings;
use crate::models::status::GenerationStatus;
use crate::store::{keys, Store, StoreError};
use crate::surfaces::{IndicatorUpdate, Notifier};

/// A `loading` status older than this with no live handle is presumed to
/// belong to a previous process lifetime and is reset to idle.
const STALE_AFTER_MINUTES: i64 = 30;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Missing required personal information: {0}")]
    MissingFields(String),

    #[error("A generation request is already in progress")]
    AlreadyInProgress,

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("could not save artifact: {0}")]
    Artifact(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub filename: String,
    pub path: PathBuf,
}

pub struct Coordinator {
    store: Arc<Store>,
    backend: Arc<dyn GenerationBackend>,
    notifier: Notifier,
    download_dir: PathBuf,
    /// The single active-request slot. `Some` ⇔ a request is in flight.
    active: Mutex<Option<CancellationToken>>,
}

impl Coordinator {
    pub fn new(
        store: Arc<Store>,
        backend: Arc<dyn GenerationBackend>,
        notifier: Notifier,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            backend,
            notifier,
            download_dir,
            active: Mutex::new(None),
        }
    }

    /// Runs one generation end to end.
    ///
    /// Pre-flight validation happens before `loading` is ever entered; a
    /// cancelled token after resolution means the response is discarded
    /// without touching status or history (cancel already wrote the
    /// terminal state).
    pub async fn start(&self, details: JobDetails) -> Result<GenerateOutcome, CoordinatorError> {
        let profile: Profile = self.store.get(keys::PROFILE).unwrap_or_default();
        let settings: Settings = self.store.get(keys::SETTINGS).unwrap_or_default();

        let missing = missing_required_fields(&profile);
        if !missing.is_empty() {
            return Err(CoordinatorError::MissingFields(missing.join(", ")));
        }
        // Decode before entering loading so a corrupt payload is a
        // validation failure, not a mid-flight error state.
        let resume = decode_data_url(profile.resume.as_deref().unwrap_or_default())?;

        let token = CancellationToken::new();
        {
            let mut slot = self.active.lock().await;
            if slot.is_some() {
                return Err(CoordinatorError::AlreadyInProgress);
            }
            *slot = Some(token.clone());
        }

        if let Err(e) = self.write_status(GenerationStatus::Loading) {
            // The slot must not outlive a request that never got going.
            *self.active.lock().await = None;
            return Err(e.into());
        }
        info!("generation started for job '{}'", details.job_title);

        let job = GenerationJob {
            name: profile.full_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone_number.clone(),
            linkedin_url: profile.linkedin_url.clone(),
            location: select_location(&profile, &details),
            job_description: details.job_description.clone(),
            resume,
        };

        let resolved = tokio::select! {
            _ = token.cancelled() => None,
            res = self.backend.generate(job) => Some(res),
        };

        // Terminal section. The slot lock is held until the terminal
        // status is persisted, so another start cannot observe a free
        // slot and enter loading while this outcome is still landing.
        let mut slot = self.active.lock().await;

        // Cancellation between resolution and this point still discards
        // the response; cancel() has already written the terminal state
        // and emptied the slot.
        let Some(result) = resolved.filter(|_| !token.is_cancelled()) else {
            debug!("generation response discarded after cancellation");
            return Err(CoordinatorError::Cancelled);
        };
        *slot = None;

        let finished = match result {
            Ok(artifact) => self.finish_success(&profile, &settings, &details, artifact).await,
            Err(e) => {
                warn!("generation failed: {e}");
                Err(e.into())
            }
        };
        match finished {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.write_error_status(&e.to_string())?;
                Err(e)
            }
        }
    }

    /// Persists the artifact, appends history, writes the terminal state,
    /// and only then pushes the best-effort indicator update.
    async fn finish_success(
        &self,
        profile: &Profile,
        settings: &Settings,
        details: &JobDetails,
        artifact: GeneratedArtifact,
    ) -> Result<GenerateOutcome, CoordinatorError> {
        let job_title = if details.job_title.is_empty() {
            "Job"
        } else {
            details.job_title.as_str()
        };
        let company_name = if details.company_name.is_empty() {
            "Unknown Company"
        } else {
            details.company_name.as_str()
        };

        let filename = render_filename(
            &settings.resume_name_format,
            job_title,
            &profile.full_name,
            company_name,
            &settings.save_location,
        );

        let path = self.download_dir.join(&filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &artifact.bytes).await?;
        info!(
            "artifact saved to {} ({}, {} bytes)",
            path.display(),
            artifact.content_type,
            artifact.bytes.len()
        );

        let entry = HistoryEntry {
            filename: filename.clone(),
            job_title: job_title.to_string(),
            company_name: company_name.to_string(),
            company_url: details.company_url.clone(),
            job_post_url: details.url.clone(),
            job_id: details.job_id.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        ledger::append(&self.store, entry)?;

        self.write_status(GenerationStatus::Success)?;

        // Best-effort: a missing recipient is fine, the surface will read
        // the store when it reopens.
        if let Some(hit) = ledger::lookup(&self.store, &details.job_id) {
            let delivery = self.notifier.push(&IndicatorUpdate {
                job_id: details.job_id.clone(),
                job_history: hit,
            });
            debug!("indicator push after generation: {delivery:?}");
        }

        Ok(GenerateOutcome { filename, path })
    }

    /// Signals the active request, if any. The terminal `cancelled` state
    /// is written immediately, independent of when (or whether) the
    /// in-flight call resolves.
    pub async fn cancel(&self) -> Result<bool, CoordinatorError> {
        let mut slot = self.active.lock().await;
        match slot.take() {
            Some(token) => {
                token.cancel();
                // Written while the slot is still held, so a concurrent
                // start cannot interleave its loading write.
                self.write_status(GenerationStatus::Cancelled)?;
                info!("generation cancelled by user");
                Ok(true)
            }
            None => {
                debug!("cancel requested with no active generation");
                Ok(false)
            }
        }
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Staleness reconciliation: a persisted `loading` with no live
    /// handle and a last-activity stamp beyond the window is reset to
    /// idle. Returns the (possibly corrected) status.
    pub async fn reconcile(&self) -> Result<GenerationStatus, StoreError> {
        let status: GenerationStatus = self
            .store
            .get(keys::GENERATION_STATUS)
            .unwrap_or_default();

        if status != GenerationStatus::Loading || self.is_active().await {
            return Ok(status);
        }

        let last_generated_at: Option<String> = self.store.get(keys::LAST_GENERATED_AT);
        let fresh = last_generated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| Utc::now() - t.with_timezone(&Utc) < ChronoDuration::minutes(STALE_AFTER_MINUTES))
            .unwrap_or(false);

        if fresh {
            // Inside the tolerated window; leave it for the next reader.
            return Ok(status);
        }

        info!("resetting stale loading status with no live request");
        self.store.set(keys::GENERATION_STATUS, &GenerationStatus::Idle)?;
        Ok(GenerationStatus::Idle)
    }

    fn write_status(&self, status: GenerationStatus) -> Result<(), StoreError> {
        let status_value = serde_json::to_value(status)?;
        let now = Value::String(Utc::now().to_rfc3339());
        self.store.update(|map| {
            map.insert(keys::GENERATION_STATUS.to_string(), status_value);
            map.insert(keys::LAST_GENERATED_AT.to_string(), now);
        })
    }

    fn write_error_status(&self, message: &str) -> Result<(), StoreError> {
        let status_value = serde_json::to_value(GenerationStatus::Error)?;
        let now = Value::String(Utc::now().to_rfc3339());
        let message = Value::String(message.to_string());
        self.store.update(|map| {
            map.insert(keys::GENERATION_STATUS.to_string(), status_value);
            map.insert(keys::LAST_GENERATED_AT.to_string(), now);
            map.insert(keys::LAST_ERROR.to_string(), message);
        })
    }
}

fn missing_required_fields(profile: &Profile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.full_name.trim().is_empty() {
        missing.push("fullName");
    }
    if profile.email.trim().is_empty() {
        missing.push("email");
    }
    if profile.phone_number.trim().is_empty() {
        missing.push("phoneNumber");
    }
    if profile.location.trim().is_empty() {
        missing.push("location");
    }
    if profile.resume.as_deref().unwrap_or("").is_empty() {
        missing.push("resume");
    }
    missing
}

/// Job location wins only when the user opted in and the page actually
/// produced one; otherwise the profile location, possibly empty.
fn select_location(profile: &Profile, details: &JobDetails) -> String {
    if profile.use_job_location
        && !details.job_location.is_empty()
        && details.job_location != UNKNOWN_LOCATION
    {
        debug!("using location from job posting: {}", details.job_location);
        details.job_location.clone()
    } else if !profile.location.trim().is_empty() {
        profile.location.clone()
    } else {
        warn!("no usable location, proceeding with blank");
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Backend that blocks until released, then returns a fixed artifact.
    struct GatedBackend {
        release: Notify,
        calls: AtomicUsize,
    }

    impl GatedBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                release: Notify::new(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for GatedBackend {
        async fn generate(&self, _job: GenerationJob) -> Result<GeneratedArtifact, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(GeneratedArtifact {
                bytes: Bytes::from_static(b"%PDF-artifact"),
                content_type: "application/pdf".to_string(),
            })
        }
    }

    struct InstantBackend;

    #[async_trait]
    impl GenerationBackend for InstantBackend {
        async fn generate(&self, _job: GenerationJob) -> Result<GeneratedArtifact, GeneratorError> {
            Ok(GeneratedArtifact {
                bytes: Bytes::from_static(b"%PDF-artifact"),
                content_type: "application/pdf".to_string(),
            })
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl GenerationBackend for FailingBackend {
        async fn generate(&self, _job: GenerationJob) -> Result<GeneratedArtifact, GeneratorError> {
            Err(GeneratorError::Api {
                status: 500,
                message: "generator exploded".to_string(),
            })
        }
    }

    struct Fixture {
        _data_dir: tempfile::TempDir,
        download_dir: tempfile::TempDir,
        store: Arc<Store>,
    }

    fn fixture() -> Fixture {
        let data_dir = tempfile::tempdir().expect("tempdir");
        let download_dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(Store::open(data_dir.path().join("store.json")).expect("open"));
        Fixture {
            _data_dir: data_dir,
            download_dir,
            store,
        }
    }

    fn coordinator(fx: &Fixture, backend: Arc<dyn GenerationBackend>) -> Arc<Coordinator> {
        Arc::new(Coordinator::new(
            fx.store.clone(),
            backend,
            Notifier::new(),
            fx.download_dir.path().to_path_buf(),
        ))
    }

    fn complete_profile() -> Profile {
        Profile {
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone_number: "+1 555 0100".to_string(),
            location: "Berlin".to_string(),
            linkedin_url: String::new(),
            resume: Some(format!(
                "data:application/pdf;base64,{}",
                STANDARD.encode(b"%PDF-resume")
            )),
            profile_photo: None,
            use_job_location: false,
        }
    }

    fn details() -> JobDetails {
        serde_json::from_value(serde_json::json!({
            "jobTitle": "Rust Engineer",
            "jobDescription": "Build things in Rust.",
            "companyName": "Acme",
            "url": "https://www.linkedin.com/jobs/view/123456/",
            "jobId": "123456",
        }))
        .unwrap()
    }

    fn stored_status(store: &Store) -> GenerationStatus {
        store.get(keys::GENERATION_STATUS).unwrap_or_default()
    }

    #[tokio::test]
    async fn missing_fields_block_before_loading() {
        let fx = fixture();
        let coord = coordinator(&fx, Arc::new(InstantBackend));

        let err = coord.start(details()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("fullName"), "got: {message}");
        // Never entered loading: no status was written at all.
        assert!(!fx.store.contains(keys::GENERATION_STATUS));
        assert!(!coord.is_active().await);
    }

    #[tokio::test]
    async fn success_writes_artifact_history_and_status() {
        let fx = fixture();
        fx.store.set(keys::PROFILE, &complete_profile()).unwrap();
        let coord = coordinator(&fx, Arc::new(InstantBackend));

        let outcome = coord.start(details()).await.unwrap();
        assert_eq!(outcome.filename, "Rust_Engineer_Resume_Jane_Doe.pdf");
        assert_eq!(std::fs::read(&outcome.path).unwrap(), b"%PDF-artifact");

        let history: Vec<HistoryEntry> = fx.store.get(keys::HISTORY_LOG).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].job_id, "123456");

        assert_eq!(stored_status(&fx.store), GenerationStatus::Success);
        assert!(!coord.is_active().await);
    }

    #[tokio::test]
    async fn failure_writes_error_status_and_no_history() {
        let fx = fixture();
        fx.store.set(keys::PROFILE, &complete_profile()).unwrap();
        let coord = coordinator(&fx, Arc::new(FailingBackend));

        let err = coord.start(details()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Generator(_)));

        assert_eq!(stored_status(&fx.store), GenerationStatus::Error);
        let last_error: String = fx.store.get(keys::LAST_ERROR).unwrap();
        assert!(last_error.contains("generator exploded"));
        assert!(fx
            .store
            .get::<Vec<HistoryEntry>>(keys::HISTORY_LOG)
            .unwrap_or_default()
            .is_empty());
        // Ready for the next start.
        assert!(!coord.is_active().await);
    }

    #[tokio::test]
    async fn cancel_discards_the_eventual_response() {
        let fx = fixture();
        fx.store.set(keys::PROFILE, &complete_profile()).unwrap();
        let backend = GatedBackend::new();
        let coord = coordinator(&fx, backend.clone());

        let task = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.start(details()).await })
        };
        while !coord.is_active().await {
            tokio::task::yield_now().await;
        }
        assert_eq!(stored_status(&fx.store), GenerationStatus::Loading);

        assert!(coord.cancel().await.unwrap());
        // Let the (now pointless) backend response resolve anyway.
        backend.release.notify_waiters();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(CoordinatorError::Cancelled)));

        assert_eq!(stored_status(&fx.store), GenerationStatus::Cancelled);
        assert!(fx
            .store
            .get::<Vec<HistoryEntry>>(keys::HISTORY_LOG)
            .unwrap_or_default()
            .is_empty());
        assert!(!coord.is_active().await);
    }

    #[tokio::test]
    async fn cancel_without_active_request_is_noop() {
        let fx = fixture();
        let coord = coordinator(&fx, Arc::new(InstantBackend));
        assert!(!coord.cancel().await.unwrap());
        assert!(!fx.store.contains(keys::GENERATION_STATUS));
    }

    #[tokio::test]
    async fn second_start_is_refused_while_one_is_in_flight() {
        let fx = fixture();
        fx.store.set(keys::PROFILE, &complete_profile()).unwrap();
        let backend = GatedBackend::new();
        let coord = coordinator(&fx, backend.clone());

        let task = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.start(details()).await })
        };
        while !coord.is_active().await {
            tokio::task::yield_now().await;
        }

        let err = coord.start(details()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::AlreadyInProgress));

        // Single-threaded test runtime: once the call count is visible the
        // backend is parked on its gate, so the wakeup cannot be lost.
        while backend.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        backend.release.notify_waiters();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn storage_failure_entering_loading_frees_the_slot() {
        let fx = fixture();
        fx.store.set(keys::PROFILE, &complete_profile()).unwrap();
        // Break persistence: the store directory disappears under it.
        std::fs::remove_dir_all(fx._data_dir.path()).unwrap();
        let coord = coordinator(&fx, Arc::new(InstantBackend));

        let err = coord.start(details()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Storage(_)), "got: {err}");
        assert!(
            !coord.is_active().await,
            "slot still occupied after a failed start"
        );

        // The next attempt hits storage again, not AlreadyInProgress.
        let err = coord.start(details()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Storage(_)), "got: {err}");
    }

    #[tokio::test]
    async fn slot_empties_only_after_terminal_status_is_persisted() {
        let fx = fixture();
        fx.store.set(keys::PROFILE, &complete_profile()).unwrap();
        let backend = GatedBackend::new();
        let coord = coordinator(&fx, backend.clone());

        let task = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.start(details()).await })
        };
        while backend.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        backend.release.notify_waiters();

        // A start observing the free slot must never be able to overwrite
        // a terminal state that has not been stored yet.
        while coord.is_active().await {
            tokio::task::yield_now().await;
        }
        assert_eq!(stored_status(&fx.store), GenerationStatus::Success);

        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stale_loading_reconciles_to_idle() {
        let fx = fixture();
        let coord = coordinator(&fx, Arc::new(InstantBackend));

        let stale = (Utc::now() - ChronoDuration::minutes(31)).to_rfc3339();
        fx.store
            .set(keys::GENERATION_STATUS, &GenerationStatus::Loading)
            .unwrap();
        fx.store.set(keys::LAST_GENERATED_AT, &stale).unwrap();

        assert_eq!(coord.reconcile().await.unwrap(), GenerationStatus::Idle);
        assert_eq!(stored_status(&fx.store), GenerationStatus::Idle);
    }

    #[tokio::test]
    async fn fresh_loading_is_left_alone() {
        let fx = fixture();
        let coord = coordinator(&fx, Arc::new(InstantBackend));

        let recent = (Utc::now() - ChronoDuration::minutes(5)).to_rfc3339();
        fx.store
            .set(keys::GENERATION_STATUS, &GenerationStatus::Loading)
            .unwrap();
        fx.store.set(keys::LAST_GENERATED_AT, &recent).unwrap();

        assert_eq!(coord.reconcile().await.unwrap(), GenerationStatus::Loading);
    }

    #[tokio::test]
    async fn loading_without_a_timestamp_is_stale() {
        let fx = fixture();
        let coord = coordinator(&fx, Arc::new(InstantBackend));
        fx.store
            .set(keys::GENERATION_STATUS, &GenerationStatus::Loading)
            .unwrap();

        assert_eq!(coord.reconcile().await.unwrap(), GenerationStatus::Idle);
    }

    #[tokio::test]
    async fn job_location_used_when_opted_in() {
        let mut profile = complete_profile();
        profile.use_job_location = true;
        let mut d = details();
        d.job_location = "Remote, EU".to_string();
        assert_eq!(select_location(&profile, &d), "Remote, EU");

        d.job_location = UNKNOWN_LOCATION.to_string();
        assert_eq!(select_location(&profile, &d), "Berlin");
    }
}
