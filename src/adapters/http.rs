//! HTTP implementation of the analysis-service contract.
//!
//! All endpoints require a bearer credential. Failure envelopes are
//! `{message}`; the upload endpoint wraps its payload in `{document}`
//! and the simplifier reports success through an explicit flag.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{AnalysisResult, ComplexityAnalysis, Document, DocumentId, JargonInfo, UserProfile};

use super::{ApiError, PortalApi, UploadFile};

/// HTTP client for the analysis service
pub struct PortalClient {
    /// Service root, no trailing slash
    base_url: String,
    /// Bearer credential
    token: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Failure envelope returned by the service
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

/// Success envelope of the upload endpoint
#[derive(Debug, Deserialize)]
struct UploadEnvelope {
    document: Document,
}

/// Response of the simplifier endpoint (snake_case, unlike documents)
#[derive(Debug, Deserialize)]
struct SimplifyEnvelope {
    success: bool,
    message: Option<String>,
    simplified_text: Option<String>,
    jargons_found: Option<HashMap<String, JargonInfo>>,
    total_jargons: Option<u32>,
    complexity_analysis: Option<ComplexityAnalysis>,
    jargon_summary: Option<String>,
}

impl PortalClient {
    /// Create a client for the given service root and credential
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            base_url,
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build a full endpoint URL
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a response, mapping the service's failure conventions.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| "request failed".to_string());

            return Err(ApiError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }
}

#[async_trait]
impl PortalApi for PortalClient {
    async fn upload_document(&self, file: &UploadFile) -> Result<Document, ApiError> {
        debug!(file = %file.file_name, size = file.size(), "uploading document");

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new().part("document", part);

        let response = self
            .client
            .post(self.endpoint("/upload"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        let envelope: UploadEnvelope = Self::decode(response).await?;
        Ok(envelope.document)
    }

    async fn fetch_document(&self, id: &DocumentId) -> Result<Document, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("/documents/{}", id)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn fetch_documents(&self) -> Result<Vec<Document>, ApiError> {
        let response = self
            .client
            .get(self.endpoint("/documents"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let response = self
            .client
            .get(self.endpoint("/profile"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn simplify_text(&self, text: &str) -> Result<AnalysisResult, ApiError> {
        debug!(chars = text.len(), "submitting text for simplification");

        let response = self
            .client
            .post(self.endpoint("/simplify-jargons"))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let envelope: SimplifyEnvelope = Self::decode(response).await?;

        if !envelope.success {
            return Err(ApiError::Service {
                status,
                message: envelope
                    .message
                    .unwrap_or_else(|| "failed to analyze text".to_string()),
            });
        }

        Ok(AnalysisResult {
            jargons_found: envelope.jargons_found.unwrap_or_default(),
            total_jargons: envelope.total_jargons.unwrap_or_default(),
            simplified_text: envelope.simplified_text,
            jargon_summary: envelope.jargon_summary,
            complexity_analysis: envelope.complexity_analysis,
        })
    }
}
