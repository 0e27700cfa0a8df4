//! Authenticated session over the analysis service.
//!
//! The session is the single owner of the document registry. Pollers
//! report settlements over a channel and the session applies them, so
//! every registry mutation happens on the session's thread of control.
//!
//! Lifecycle: created by `open` on a working credential, destroyed by
//! `close` (or drop) — a rejected credential means no session exists
//! and the caller falls back to the authentication flow.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, instrument};

use crate::adapters::{ApiError, PortalApi, UploadFile};
use crate::domain::{Document, DocumentId, DocumentStatus, UserProfile};

use super::poller::{PollerConfig, PollerSet, Settlement};
use super::registry::{DashboardStats, DocumentRegistry};
use super::upload::{UploadError, UploadSubmitter};

/// Errors raised while opening or refreshing a session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The credential was missing or rejected; there is no session
    #[error("not authenticated")]
    Unauthorized,

    /// The service or network failed; the operation was abandoned
    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized | ApiError::MissingCredential => Self::Unauthorized,
            other => Self::Api(other),
        }
    }
}

/// An authenticated view of the user's documents
pub struct PortalSession {
    api: Arc<dyn PortalApi>,
    profile: UserProfile,
    registry: DocumentRegistry,
    submitter: UploadSubmitter,
    pollers: PollerSet,
    settlements: mpsc::Receiver<Settlement>,
}

impl PortalSession {
    /// Open a session with the reference polling cadence.
    pub async fn open(api: Arc<dyn PortalApi>) -> Result<Self, SessionError> {
        Self::open_with_config(api, PollerConfig::default()).await
    }

    /// Open a session: fetch the owner's profile and document list,
    /// then resume polling for anything still processing.
    #[instrument(skip_all)]
    pub async fn open_with_config(
        api: Arc<dyn PortalApi>,
        poller_config: PollerConfig,
    ) -> Result<Self, SessionError> {
        let profile = api.fetch_profile().await?;
        let documents = api.fetch_documents().await?;

        let mut registry = DocumentRegistry::new();
        registry.reset(documents);

        let (pollers, settlements) = PollerSet::new(Arc::clone(&api), poller_config);
        let submitter = UploadSubmitter::new(Arc::clone(&api));

        let session = Self {
            api,
            profile,
            registry,
            submitter,
            pollers,
            settlements,
        };

        for id in session.registry.processing_ids() {
            session.pollers.watch(id).await;
        }

        info!(
            user = %session.profile.email,
            documents = session.registry.len(),
            "session opened"
        );

        Ok(session)
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Current registry snapshot, newest first
    pub fn documents(&self) -> &[Document] {
        self.registry.documents()
    }

    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.registry.get(id)
    }

    /// Counters as of the last registry mutation
    pub fn stats(&self) -> DashboardStats {
        self.registry.stats()
    }

    /// Upload a PDF from disk.
    ///
    /// On success the new document is prepended to the registry and, if
    /// the service is still processing it, a poller is started for it.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn upload(&mut self, path: &Path) -> Result<Document, UploadError> {
        let file = UploadFile::from_path(path).await?;
        let document = self.submitter.submit(&file).await?;

        self.registry.insert(document.clone());

        if document.status == DocumentStatus::Processing {
            self.pollers.watch(document.id.clone()).await;
        }

        Ok(document)
    }

    /// Start polling an already-listed processing document.
    ///
    /// Idempotent per id; returns false if the document is unknown, not
    /// processing, or already being polled.
    pub async fn watch(&self, id: &DocumentId) -> bool {
        match self.registry.get(id) {
            Some(doc) if doc.status == DocumentStatus::Processing => {
                self.pollers.watch(id.clone()).await
            }
            _ => false,
        }
    }

    /// Apply any settlements that have already arrived, in arrival
    /// order, each as a whole-record replacement. Returns what was
    /// applied so callers can report outcomes.
    pub fn apply_settlements(&mut self) -> Vec<Settlement> {
        let mut applied = Vec::new();
        while let Ok(settlement) = self.settlements.try_recv() {
            self.registry.replace(settlement.document.clone());
            applied.push(settlement);
        }
        applied
    }

    /// Wait for the next settlement and apply it.
    pub async fn next_settlement(&mut self) -> Option<Settlement> {
        let settlement = self.settlements.recv().await?;
        self.registry.replace(settlement.document.clone());
        Some(settlement)
    }

    /// Re-fetch the document list and resume polling for anything
    /// still processing.
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        let documents = self.api.fetch_documents().await?;
        self.registry.reset(documents);

        for id in self.registry.processing_ids() {
            self.pollers.watch(id).await;
        }

        Ok(())
    }

    /// Number of documents currently being polled
    pub async fn active_polls(&self) -> usize {
        self.pollers.active_count().await
    }

    /// Tear the session down, cancelling every live poller.
    pub async fn close(self) {
        self.pollers.shutdown().await;
    }
}
