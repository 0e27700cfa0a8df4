//! Per-document polling state machine and its supervisor.
//!
//! A `StatusPoller` brings one processing document to a terminal state
//! by querying the service on a fixed interval, bounded by a wall-clock
//! budget. The machine itself is timer-free: `tick` performs exactly one
//! query and one transition, so tests can drive it without real time.
//! `PollerSet` adds the timers and guarantees at most one live poller
//! per document id.
//!
//! Pollers never touch shared state. A settled poll emits the fetched
//! record on a channel and the session applies it to the registry, so
//! concurrent pollers for different ids cannot race each other's
//! updates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::adapters::PortalApi;
use crate::domain::{Document, DocumentId, DocumentStatus};

/// Timing for the polling loop
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Delay between status queries
    pub interval: Duration,

    /// Wall-clock budget before giving up on a document
    pub budget: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            budget: Duration::from_secs(300),
        }
    }
}

/// Lifecycle of a single document's poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Created for a processing document, no query issued yet
    Idle,

    /// Issuing status queries on the interval
    Polling,

    /// Terminal status fetched and reported
    Settled(DocumentStatus),

    /// Budget exhausted without a terminal status; the document keeps
    /// its last-known state
    TimedOut,
}

/// Result of advancing the machine by one tick
#[derive(Debug)]
pub enum Tick {
    /// Still processing; query again after the interval
    Pending,

    /// Terminal snapshot fetched; the poll is over
    Settled(Box<Document>),

    /// Transport failure; stop quietly, report nothing
    Aborted,

    /// Budget exhausted before a terminal status
    TimedOut,
}

/// Terminal notification emitted when a poll settles
#[derive(Debug)]
pub struct Settlement {
    /// The freshly fetched terminal record
    pub document: Document,
}

impl Settlement {
    pub fn id(&self) -> &DocumentId {
        &self.document.id
    }

    /// True for `analyzed`, false for `error`
    pub fn is_success(&self) -> bool {
        self.document.status == DocumentStatus::Analyzed
    }
}

/// Polling state machine for one document id
pub struct StatusPoller {
    id: DocumentId,
    state: PollState,
    /// Armed at creation; no query is issued at or past this point
    deadline: Instant,
}

impl StatusPoller {
    /// Create an idle machine for a document currently processing
    pub fn new(id: DocumentId, config: PollerConfig) -> Self {
        Self {
            id,
            state: PollState::Idle,
            deadline: Instant::now() + config.budget,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Settled or timed out; no further ticks will do anything
    pub fn is_finished(&self) -> bool {
        matches!(self.state, PollState::Settled(_) | PollState::TimedOut)
    }

    /// Issue one status query and advance the machine.
    ///
    /// The budget is checked before the query, so a machine past its
    /// deadline performs no network call at all.
    pub async fn tick(&mut self, api: &dyn PortalApi) -> Tick {
        if self.is_finished() {
            return Tick::Aborted;
        }

        if Instant::now() >= self.deadline {
            self.state = PollState::TimedOut;
            return Tick::TimedOut;
        }

        self.state = PollState::Polling;

        match api.fetch_document(&self.id).await {
            Ok(document) if document.status == DocumentStatus::Processing => Tick::Pending,
            Ok(document) => {
                self.state = PollState::Settled(document.status);
                Tick::Settled(Box::new(document))
            }
            Err(err) => {
                warn!(id = %self.id, error = %err, "status query failed, stopping poll");
                Tick::Aborted
            }
        }
    }
}

/// Drive a poller to completion on the configured interval
async fn run_poller(
    api: Arc<dyn PortalApi>,
    id: DocumentId,
    config: PollerConfig,
    settle_tx: mpsc::Sender<Settlement>,
) {
    let mut poller = StatusPoller::new(id, config);

    loop {
        time::sleep(config.interval).await;

        match poller.tick(api.as_ref()).await {
            Tick::Pending => continue,
            Tick::Settled(document) => {
                info!(id = %document.id, status = %document.status, "document settled");
                if settle_tx.send(Settlement { document: *document }).await.is_err() {
                    debug!("settlement receiver dropped");
                }
                break;
            }
            Tick::Aborted => break,
            Tick::TimedOut => {
                warn!(id = %poller.id(), budget = ?config.budget,
                    "no terminal status within budget, giving up");
                break;
            }
        }
    }
}

/// Supervises at most one active poller per document id.
///
/// Settlements from all pollers arrive on the single receiver returned
/// by `new`. Prefer `shutdown` for teardown; `Drop` aborts what it can
/// reach as a last resort.
pub struct PollerSet {
    api: Arc<dyn PortalApi>,
    config: PollerConfig,
    settle_tx: mpsc::Sender<Settlement>,
    active: Arc<Mutex<HashMap<DocumentId, tokio::task::AbortHandle>>>,
}

impl PollerSet {
    pub fn new(api: Arc<dyn PortalApi>, config: PollerConfig) -> (Self, mpsc::Receiver<Settlement>) {
        let (settle_tx, settle_rx) = mpsc::channel(32);

        (
            Self {
                api,
                config,
                settle_tx,
                active: Arc::new(Mutex::new(HashMap::new())),
            },
            settle_rx,
        )
    }

    /// Start polling a document.
    ///
    /// Idempotent per id: if a poller for this id is already live the
    /// call is a no-op and returns false, leaving the existing timer
    /// untouched.
    pub async fn watch(&self, id: DocumentId) -> bool {
        let mut active = self.active.lock().await;
        if active.contains_key(&id) {
            debug!(%id, "poller already active");
            return false;
        }

        let api = Arc::clone(&self.api);
        let config = self.config;
        let settle_tx = self.settle_tx.clone();
        let registry = Arc::clone(&self.active);
        let task_id = id.clone();

        let handle = tokio::spawn(async move {
            run_poller(api, task_id.clone(), config, settle_tx).await;
            registry.lock().await.remove(&task_id);
        });

        active.insert(id, handle.abort_handle());
        true
    }

    /// Cancel the poller for one id, if live
    pub async fn stop(&self, id: &DocumentId) {
        if let Some(handle) = self.active.lock().await.remove(id) {
            handle.abort();
            debug!(%id, "poller cancelled");
        }
    }

    /// Cancel every live poller; nothing fires afterwards
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        for (id, handle) in active.drain() {
            handle.abort();
            debug!(%id, "poller cancelled at shutdown");
        }
    }

    pub async fn is_active(&self, id: &DocumentId) -> bool {
        self.active.lock().await.contains_key(id)
    }

    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }
}

impl Drop for PollerSet {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.try_lock() {
            for (_, handle) in active.drain() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::adapters::{ApiError, UploadFile};
    use crate::domain::{AnalysisResult, UserProfile};

    fn doc(id: &str, status: DocumentStatus) -> Document {
        Document {
            id: DocumentId::from(id),
            file_name: format!("{id}.pdf"),
            upload_date: Utc::now(),
            status,
            classification: None,
            confidence: None,
            key_terms: None,
            summary: None,
            important_dates: None,
            parties_involved: None,
            jargon_analysis: None,
        }
    }

    /// Transport returning a scripted sequence of status snapshots
    struct ScriptedApi {
        responses: Mutex<VecDeque<Result<Document, ApiError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<Document, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PortalApi for ScriptedApi {
        async fn upload_document(&self, _file: &UploadFile) -> Result<Document, ApiError> {
            unimplemented!()
        }

        async fn fetch_document(&self, id: &DocumentId) -> Result<Document, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(doc(id.as_str(), DocumentStatus::Processing)))
        }

        async fn fetch_documents(&self) -> Result<Vec<Document>, ApiError> {
            unimplemented!()
        }

        async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
            unimplemented!()
        }

        async fn simplify_text(&self, _text: &str) -> Result<AnalysisResult, ApiError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_processing_response_keeps_polling() {
        let api = ScriptedApi::new(vec![
            Ok(doc("d1", DocumentStatus::Processing)),
            Ok(doc("d1", DocumentStatus::Processing)),
        ]);
        let mut poller = StatusPoller::new(DocumentId::from("d1"), PollerConfig::default());

        assert_eq!(*poller.state(), PollState::Idle);

        assert!(matches!(poller.tick(&api).await, Tick::Pending));
        assert_eq!(*poller.state(), PollState::Polling);

        assert!(matches!(poller.tick(&api).await, Tick::Pending));
        assert!(!poller.is_finished());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_terminal_response_settles() {
        let api = ScriptedApi::new(vec![
            Ok(doc("d1", DocumentStatus::Processing)),
            Ok(doc("d1", DocumentStatus::Analyzed)),
        ]);
        let mut poller = StatusPoller::new(DocumentId::from("d1"), PollerConfig::default());

        assert!(matches!(poller.tick(&api).await, Tick::Pending));
        match poller.tick(&api).await {
            Tick::Settled(document) => assert_eq!(document.status, DocumentStatus::Analyzed),
            other => panic!("expected Settled, got {other:?}"),
        }

        assert_eq!(*poller.state(), PollState::Settled(DocumentStatus::Analyzed));
        assert!(poller.is_finished());
    }

    #[tokio::test]
    async fn test_error_status_is_a_terminal_settlement() {
        let api = ScriptedApi::new(vec![Ok(doc("d1", DocumentStatus::Error))]);
        let mut poller = StatusPoller::new(DocumentId::from("d1"), PollerConfig::default());

        match poller.tick(&api).await {
            Tick::Settled(document) => assert_eq!(document.status, DocumentStatus::Error),
            other => panic!("expected Settled, got {other:?}"),
        }
        assert_eq!(*poller.state(), PollState::Settled(DocumentStatus::Error));
    }

    #[tokio::test]
    async fn test_transport_error_aborts_without_settling() {
        let api = ScriptedApi::new(vec![Err(ApiError::Service {
            status: 500,
            message: "boom".to_string(),
        })]);
        let mut poller = StatusPoller::new(DocumentId::from("d1"), PollerConfig::default());

        assert!(matches!(poller.tick(&api).await, Tick::Aborted));
        // A soft stop is not a settlement and not a timeout
        assert_eq!(*poller.state(), PollState::Polling);
    }

    #[tokio::test]
    async fn test_exhausted_budget_stops_before_querying() {
        let api = ScriptedApi::new(vec![]);
        let config = PollerConfig {
            interval: Duration::from_secs(3),
            budget: Duration::ZERO,
        };
        let mut poller = StatusPoller::new(DocumentId::from("d1"), config);

        assert!(matches!(poller.tick(&api).await, Tick::TimedOut));
        assert_eq!(*poller.state(), PollState::TimedOut);
        assert_eq!(api.calls(), 0, "no query may be issued past the deadline");
    }

    #[tokio::test]
    async fn test_settlement_outcome_classification() {
        let ok = Settlement {
            document: doc("d1", DocumentStatus::Analyzed),
        };
        let failed = Settlement {
            document: doc("d2", DocumentStatus::Error),
        };

        assert!(ok.is_success());
        assert!(!failed.is_success());
        assert_eq!(ok.id().as_str(), "d1");
    }
}
