use std::sync::Arc;

use crate::config::Config;
use crate::generation::coordinator::Coordinator;
use crate::store::Store;
use crate::surfaces::Notifier;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub coordinator: Arc<Coordinator>,
    pub notifier: Notifier,
    /// Runtime configuration, kept for handlers that need paths or intervals.
    #[allow(dead_code)]
    pub config: Config,
}
