//! Document records and their processing lifecycle.
//!
//! A Document is owned by the remote analysis service; the client only
//! ever replaces whole records with fresher snapshots, never patches
//! individual fields.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisResult;

/// Opaque identifier assigned by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Processing state of a document on the service side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Received by the service, analysis not yet started
    Uploaded,

    /// Analysis in progress
    Processing,

    /// Analysis finished successfully
    Analyzed,

    /// Analysis failed on the service side
    Error,
}

impl DocumentStatus {
    /// Terminal states: a poller will not see this status change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Analyzed | Self::Error)
    }

    /// Whether moving from `self` to `next` goes forward in the
    /// lifecycle. `Uploaded` may skip straight to `Analyzed` when the
    /// service completes synchronously.
    pub fn can_transition_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    fn rank(self) -> u8 {
        match self {
            Self::Uploaded => 0,
            Self::Processing => 1,
            Self::Analyzed | Self::Error => 2,
        }
    }

    /// Human-readable status label
    pub fn label(self) -> &'static str {
        match self {
            Self::Uploaded => "Uploaded",
            Self::Processing => "Processing...",
            Self::Analyzed => "Analyzed",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A dated milestone extracted from a document (deadline, renewal, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportantDate {
    /// What kind of date this is (e.g. "Termination deadline")
    #[serde(rename = "type")]
    pub kind: String,

    /// The date as reported by the service
    pub date: String,
}

/// A document owned by the current session.
///
/// The analysis fields are populated by the service only once `status`
/// is `Analyzed`; until then they are absent and must not be treated as
/// authoritative. `jargon_analysis` can be absent even on an analyzed
/// document and consumers degrade to a "not available" presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Service-assigned identifier, immutable
    #[serde(rename = "_id")]
    pub id: DocumentId,

    /// Display name, immutable
    pub file_name: String,

    /// When the document was uploaded, immutable
    pub upload_date: DateTime<Utc>,

    /// Current processing state
    pub status: DocumentStatus,

    /// Contract type classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,

    /// Classification confidence, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Key terms and conditions, in document order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_terms: Option<Vec<String>>,

    /// Plain-language document summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Dates and deadlines extracted from the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub important_dates: Option<Vec<ImportantDate>>,

    /// Parties named in the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parties_involved: Option<Vec<String>>,

    /// Jargon/complexity analysis, when the service produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jargon_analysis: Option<AnalysisResult>,
}

impl Document {
    /// Whether the document has reached a state the poller stops at.
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }

    /// Classification confidence as a whole percentage, for display.
    pub fn confidence_percent(&self) -> Option<u32> {
        self.confidence.map(|c| (c * 100.0).round() as u32)
    }
}
