//! legalens - client for the LegaLens document-analysis service
//!
//! A Rust client for the asynchronous legal-document analysis workflow:
//! upload a PDF, track its processing state without a persistent
//! connection, and reconcile results into a consistent document list.
//!
//! # Architecture
//!
//! The workflow is built around a single owner of mutable state:
//! - The session owns the document registry and is the only mutator
//! - Per-document pollers report terminal states over a channel
//! - Registry updates are whole-record replacements, never field patches
//!
//! # Modules
//!
//! - `adapters`: Remote-service integration (`PortalApi`, HTTP client)
//! - `core`: Workflow logic (registry, upload, poller, session)
//! - `domain`: Data structures (Document, AnalysisResult, UserProfile)
//! - `ingest`: Inbox directory auto-uploader
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Upload a contract and wait for the analysis
//! legalens upload contract.pdf --watch
//!
//! # Check a document's status
//! legalens status <document-id>
//!
//! # Simplify legal text from stdin
//! cat clause.txt | legalens simplify
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;

// Re-export main types at crate root for convenience
pub use adapters::{ApiError, PortalApi, PortalClient, UploadFile};
pub use crate::core::{
    DashboardStats, DocumentRegistry, PollState, PollerConfig, PollerSet, PortalSession,
    SessionError, Settlement, StatusPoller, UploadError, UploadSubmitter,
};
pub use domain::{
    AnalysisResult, ComplexityAnalysis, Document, DocumentId, DocumentStatus, JargonInfo,
    SeverityTier, UserProfile,
};

// Inbox auto-uploader
pub use ingest::{InboxConfig, InboxWatcher, PdfFileEvent};
