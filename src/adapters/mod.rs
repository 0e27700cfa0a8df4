//! Remote-service integration.
//!
//! The portal consumes one opaque analysis service. `PortalApi` is the
//! seam components program against; `PortalClient` is the HTTP
//! implementation. Tests substitute scripted implementations.

pub mod http;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

// Re-export the HTTP client
pub use http::PortalClient;

use crate::domain::{AnalysisResult, Document, DocumentId, UserProfile};

/// Errors surfaced by the transport layer
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer credential available; the client cannot operate
    #[error("no credential configured; set LEGALENS_TOKEN")]
    MissingCredential,

    /// The service rejected the credential
    #[error("credential rejected by the service")]
    Unauthorized,

    /// The service reported a failure of its own
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// Network-level failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A file payload ready for submission
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Display name sent to the service
    pub file_name: String,

    /// Declared media type of the payload
    pub mime_type: String,

    /// Raw file content
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Read a file from disk, deriving the media type from its extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;

        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let mime_type = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
            _ => "application/octet-stream",
        }
        .to_string();

        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    /// Payload size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Consumed contract of the analysis service.
///
/// Every request carries the session's bearer credential; a rejected
/// credential surfaces as `ApiError::Unauthorized` so callers can tear
/// the session down.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Submit a document for analysis. Returns the initial record; its
    /// status is `Processing`, or `Analyzed` if the service completed
    /// synchronously.
    async fn upload_document(&self, file: &UploadFile) -> Result<Document, ApiError>;

    /// Fetch the current snapshot of a single document.
    async fn fetch_document(&self, id: &DocumentId) -> Result<Document, ApiError>;

    /// Fetch the session's full document list, service order.
    async fn fetch_documents(&self) -> Result<Vec<Document>, ApiError>;

    /// Fetch the profile of the credential's owner.
    async fn fetch_profile(&self) -> Result<UserProfile, ApiError>;

    /// Run the jargon simplifier over a free-standing text.
    async fn simplify_text(&self, text: &str) -> Result<AnalysisResult, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_upload_file_from_path_detects_pdf() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("contract.pdf");
        tokio::fs::write(&path, b"%PDF-1.7 fake").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();

        assert_eq!(file.file_name, "contract.pdf");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.size(), 13);
    }

    #[tokio::test]
    async fn test_upload_file_from_path_other_extension() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        tokio::fs::write(&path, b"plain text").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();

        assert_eq!(file.mime_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_upload_file_missing_path() {
        let missing = PathBuf::from("/definitely/not/here.pdf");
        assert!(UploadFile::from_path(&missing).await.is_err());
    }
}
