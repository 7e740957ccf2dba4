//! Best-effort push channel to live surfaces.
//!
//! Surfaces subscribe over SSE and may vanish at any moment; a push with
//! nobody listening is not an error, it is silently dropped. Delivery
//! results are logged by callers and never escalated.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::history::ledger::HistoryMatch;
use crate::state::AppState;

const CHANNEL_CAPACITY: usize = 32;

/// Pushed when a job the user already applied to is on screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorUpdate {
    pub job_id: String,
    pub job_history: HistoryMatch,
}

#[derive(Debug)]
pub enum Delivery {
    Delivered(usize),
    NoRecipient,
    Failed(String),
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<String>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Serializes and fans out an update. Never blocks, never fails the
    /// caller; the result is informational.
    pub fn push(&self, update: &IndicatorUpdate) -> Delivery {
        let payload = match serde_json::to_string(update) {
            Ok(payload) => payload,
            Err(e) => return Delivery::Failed(e.to_string()),
        };
        match self.tx.send(payload) {
            Ok(receivers) => Delivery::Delivered(receivers),
            Err(_) => Delivery::NoRecipient,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /api/v1/events — the `pushIndicator` stream.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notifier.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().event("indicator").data(payload))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            // A slow surface missed updates; it will catch up from the store.
            warn!("SSE subscriber lagged, {skipped} updates dropped");
            None
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_update() -> IndicatorUpdate {
        IndicatorUpdate {
            job_id: "123".to_string(),
            job_history: HistoryMatch {
                job_title: "Dev".to_string(),
                company_name: "Acme".to_string(),
                filename: "a.pdf".to_string(),
                application_date: "2026-01-01 00:00:00 UTC".to_string(),
                job_post_url: String::new(),
            },
        }
    }

    #[tokio::test]
    async fn push_without_subscribers_reports_no_recipient() {
        let notifier = Notifier::new();
        assert!(matches!(
            notifier.push(&sample_update()),
            Delivery::NoRecipient
        ));
    }

    #[tokio::test]
    async fn push_reaches_live_subscribers() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        assert!(matches!(
            notifier.push(&sample_update()),
            Delivery::Delivered(1)
        ));
        let payload = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["jobId"], "123");
        assert_eq!(value["jobHistory"]["companyName"], "Acme");
    }
}
