//! Resume upload and analysis shapes.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::errors::ClientError;
use crate::schema::{Fields, Schema, SchemaViolation};

/// Receipt from `POST /resume/upload`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub message: String,
}

impl Schema for UploadResponse {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            file_id: fields.uuid_string("file_id")?,
            message: fields.string("message")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordAnalysis {
    #[serde(rename = "matched_keywords")]
    pub matched: Vec<String>,
    #[serde(rename = "missing_keywords")]
    pub missing: Vec<String>,
}

impl Schema for KeywordAnalysis {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            matched: fields.string_array("matched_keywords")?,
            missing: fields.string_array("missing_keywords")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceMatch {
    pub job_requirement: String,
    pub resume_evidence: String,
    pub is_match: bool,
}

impl Schema for ExperienceMatch {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            job_requirement: fields.string("job_requirement")?,
            resume_evidence: fields.string("resume_evidence")?,
            is_match: fields.boolean("is_match")?,
        })
    }
}

/// Result of `POST /resume/analyze-auto`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub match_score: f64,
    pub summary: String,
    pub keyword_analysis: KeywordAnalysis,
    pub experience_match: Vec<ExperienceMatch>,
    pub suggestions: Vec<String>,
}

impl Schema for AnalysisReport {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            match_score: fields.number("match_score")?,
            summary: fields.string("summary")?,
            keyword_analysis: fields.object("keyword_analysis")?,
            experience_match: fields.array("experience_match")?,
            suggestions: fields.string_array("suggestions")?,
        })
    }
}

/// Body of `POST /resume/analyze-auto`. Construction enforces the analysis preconditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    file_id: String,
    job_url: Url,
}

impl AnalysisRequest {
    pub fn new(file_id: impl Into<String>, job_url: &str) -> Result<Self, ClientError> {
        let file_id = file_id.into();
        if file_id.trim().is_empty() {
            return Err(ClientError::precondition(
                "A resume must be uploaded before analysis.",
            ));
        }
        let job_url = Url::parse(job_url.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
            .ok_or_else(|| ClientError::precondition("Please enter a valid URL."))?;
        Ok(Self { file_id, job_url })
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn job_url(&self) -> &Url {
        &self.job_url
    }
}
