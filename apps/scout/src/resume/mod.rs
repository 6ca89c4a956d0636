//! Resume: file handling, the `ResumeApi` port with its HTTP adapter, and the workflow.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use crate::errors::ClientError;
use crate::gateway::{Gateway, MultipartFile, RequestOptions};
use crate::schema::resume::{AnalysisReport, AnalysisRequest, UploadResponse};
use crate::schema::validate;

pub mod workflow;

pub use workflow::{FlowState, ResumeWorkflowController};

pub const UPLOAD_ENDPOINT: &str = "/resume/upload";
pub const ANALYZE_ENDPOINT: &str = "/resume/analyze-auto";

/// Advisory upload ceiling. Larger files are sent anyway; the backend has the final word.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const PDF_MIME: &str = "application/pdf";

/// A resume ready for upload. Only PDFs are accepted.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    file_name: String,
    bytes: Bytes,
}

impl ResumeFile {
    pub fn new(file_name: impl Into<String>, bytes: Bytes) -> Result<Self, ClientError> {
        let file_name = file_name.into();
        if !file_name.to_lowercase().ends_with(".pdf") {
            return Err(ClientError::precondition("Only PDF files are allowed."));
        }
        if bytes.is_empty() {
            return Err(ClientError::precondition("The selected file is empty."));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            warn!(
                "{} is {} bytes, above the {} byte advisory limit",
                file_name,
                bytes.len(),
                MAX_UPLOAD_BYTES
            );
        }
        Ok(Self { file_name, bytes })
    }

    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::precondition(format!("Not a file: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ClientError::precondition(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::new(file_name, Bytes::from(bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    fn to_multipart(&self) -> MultipartFile {
        MultipartFile {
            field: "file".to_string(),
            file_name: self.file_name.clone(),
            mime: PDF_MIME.to_string(),
            bytes: self.bytes.clone(),
        }
    }
}

/// Backend resume capability. Carried by the workflow as `Arc<dyn ResumeApi>`.
#[async_trait]
pub trait ResumeApi: Send + Sync {
    async fn upload(&self, file: &ResumeFile) -> Result<UploadResponse, ClientError>;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, ClientError>;
}

/// `ResumeApi` over the authenticated gateway.
pub struct HttpResumeApi {
    gateway: Arc<Gateway>,
}

impl HttpResumeApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ResumeApi for HttpResumeApi {
    async fn upload(&self, file: &ResumeFile) -> Result<UploadResponse, ClientError> {
        let raw = self
            .gateway
            .call(UPLOAD_ENDPOINT, RequestOptions::post_multipart(file.to_multipart()))
            .await?;
        Ok(validate::<UploadResponse>(&raw)?)
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, ClientError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::precondition(format!("Unserializable request: {e}")))?;
        let raw = self
            .gateway
            .call(ANALYZE_ENDPOINT, RequestOptions::post_json(body))
            .await?;
        Ok(validate::<AnalysisReport>(&raw)?)
    }
}
