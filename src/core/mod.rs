//! Core workflow logic.
//!
//! This module contains:
//! - DocumentRegistry: the session's ordered document collection
//! - UploadSubmitter: local validation and single-flight submission
//! - StatusPoller / PollerSet: per-document polling state machines
//! - PortalSession: the owning coordinator

pub mod poller;
pub mod registry;
pub mod session;
pub mod upload;

// Re-export commonly used types
pub use poller::{PollState, PollerConfig, PollerSet, Settlement, StatusPoller, Tick};
pub use registry::{DashboardStats, DocumentRegistry, InsertOutcome};
pub use session::{PortalSession, SessionError};
pub use upload::{validate, UploadError, UploadSubmitter, MAX_UPLOAD_BYTES, PDF_MIME};
