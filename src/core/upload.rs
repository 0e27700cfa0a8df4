//! Upload validation and submission.
//!
//! Files are checked locally (type and size) before any network
//! traffic, and only one upload may be outstanding at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{ApiError, PortalApi, UploadFile};
use crate::domain::Document;

/// Largest accepted payload: 10 MiB
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// The only media type the service analyzes
pub const PDF_MIME: &str = "application/pdf";

/// Errors raised while submitting a document
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("only PDF files are accepted (got {found})")]
    NotPdf { found: String },

    #[error("file is {size} bytes, over the {limit}-byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("an upload is already in progress")]
    InFlight,

    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl UploadError {
    /// Whether the file was rejected before any network call
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::NotPdf { .. } | Self::TooLarge { .. })
    }
}

/// Check type and size locally. A failure here means no request is made
/// and no state changes.
pub fn validate(file: &UploadFile) -> Result<(), UploadError> {
    if file.mime_type != PDF_MIME {
        return Err(UploadError::NotPdf {
            found: file.mime_type.clone(),
        });
    }

    if file.size() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size: file.size(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(())
}

/// Submits validated files to the service, one at a time.
///
/// The in-flight flag plays the role of a disabled upload button: a
/// second submission while one is outstanding is rejected, and the flag
/// clears on every outcome (success, service failure, or local
/// rejection).
pub struct UploadSubmitter {
    api: Arc<dyn PortalApi>,
    in_flight: AtomicBool,
}

impl UploadSubmitter {
    pub fn new(api: Arc<dyn PortalApi>) -> Self {
        Self {
            api,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is currently outstanding
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Validate and transmit a file, returning the service's initial
    /// Document record.
    pub async fn submit(&self, file: &UploadFile) -> Result<Document, UploadError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(UploadError::InFlight);
        }

        let result = self.checked_submit(file).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn checked_submit(&self, file: &UploadFile) -> Result<Document, UploadError> {
        validate(file)?;

        match self.api.upload_document(file).await {
            Ok(document) => {
                info!(id = %document.id, file = %file.file_name, status = %document.status,
                    "document uploaded");
                Ok(document)
            }
            Err(err) => {
                warn!(file = %file.file_name, error = %err, "upload failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use crate::domain::{AnalysisResult, DocumentId, DocumentStatus, UserProfile};

    fn pdf(size: usize) -> UploadFile {
        UploadFile {
            file_name: "contract.pdf".to_string(),
            mime_type: PDF_MIME.to_string(),
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn test_validate_accepts_small_pdf() {
        assert!(validate(&pdf(1024)).is_ok());
    }

    #[test]
    fn test_validate_rejects_non_pdf() {
        let mut file = pdf(1024);
        file.mime_type = "image/png".to_string();

        match validate(&file) {
            Err(UploadError::NotPdf { found }) => assert_eq!(found, "image/png"),
            other => panic!("expected NotPdf, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_oversized_file() {
        // 12 MiB is over the 10 MiB limit
        let file = pdf(12 * 1024 * 1024);

        match validate(&file) {
            Err(UploadError::TooLarge { size, limit }) => {
                assert_eq!(size, 12 * 1024 * 1024);
                assert_eq!(limit, MAX_UPLOAD_BYTES);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_exactly_at_limit() {
        assert!(validate(&pdf(MAX_UPLOAD_BYTES as usize)).is_ok());
    }

    /// Transport that blocks uploads until released, so tests can hold a
    /// submission open.
    struct StalledApi {
        release: Notify,
    }

    #[async_trait]
    impl PortalApi for StalledApi {
        async fn upload_document(&self, file: &UploadFile) -> Result<Document, ApiError> {
            self.release.notified().await;
            Ok(Document {
                id: DocumentId::from("doc-1"),
                file_name: file.file_name.clone(),
                upload_date: Utc::now(),
                status: DocumentStatus::Processing,
                classification: None,
                confidence: None,
                key_terms: None,
                summary: None,
                important_dates: None,
                parties_involved: None,
                jargon_analysis: None,
            })
        }

        async fn fetch_document(&self, _id: &DocumentId) -> Result<Document, ApiError> {
            unimplemented!()
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
    async fn test_second_submit_rejected_while_first_outstanding() {
        let api = Arc::new(StalledApi {
            release: Notify::new(),
        });
        let submitter = Arc::new(UploadSubmitter::new(api.clone()));

        let first = {
            let submitter = submitter.clone();
            tokio::spawn(async move { submitter.submit(&pdf(64)).await })
        };

        // Let the first submission take the flag and stall in transport
        tokio::task::yield_now().await;
        assert!(submitter.is_in_flight());

        let second = submitter.submit(&pdf(64)).await;
        assert!(matches!(second, Err(UploadError::InFlight)));

        api.release.notify_one();
        let first = first.await.unwrap();
        assert!(first.is_ok());

        // Flag released on completion; a new submission may start
        assert!(!submitter.is_in_flight());
    }

    #[tokio::test]
    async fn test_flag_released_after_validation_rejection() {
        let api = Arc::new(StalledApi {
            release: Notify::new(),
        });
        let submitter = UploadSubmitter::new(api);

        let mut file = pdf(64);
        file.mime_type = "text/plain".to_string();

        let result = submitter.submit(&file).await;
        assert!(matches!(result, Err(UploadError::NotPdf { .. })));
        assert!(!submitter.is_in_flight());
    }
}
