//! Search request and response shapes for `POST /search/linkedin`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::errors::ClientError;
use crate::schema::{one_of, Fields, Schema, SchemaViolation};

pub const QUERY_MIN_CHARS: usize = 3;
pub const QUERY_MAX_CHARS: usize = 500;
pub const LIMIT_MIN: u32 = 1;
pub const LIMIT_MAX: u32 = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchCategory {
    #[default]
    #[serde(rename = "linkedin profile")]
    LinkedinProfile,
    #[serde(rename = "company")]
    Company,
    #[serde(rename = "job offers")]
    JobOffers,
    #[serde(rename = "pages")]
    Pages,
}

impl SearchCategory {
    pub const ALL: [&'static str; 4] = ["linkedin profile", "company", "job offers", "pages"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchCategory::LinkedinProfile => "linkedin profile",
            SearchCategory::Company => "company",
            SearchCategory::JobOffers => "job offers",
            SearchCategory::Pages => "pages",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchCategory {
    type Err = String;

    /// Accepts the wire value or its kebab-case spelling (`linkedin-profile`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', " ").as_str() {
            "linkedin profile" => Ok(SearchCategory::LinkedinProfile),
            "company" => Ok(SearchCategory::Company),
            "job offers" => Ok(SearchCategory::JobOffers),
            "pages" => Ok(SearchCategory::Pages),
            _ => Err(format!(
                "unknown category '{s}', expected one of: {}",
                SearchCategory::ALL.join(", ")
            )),
        }
    }
}

impl Schema for SearchCategory {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let text = one_of(value, path, &SearchCategory::ALL)?;
        text.parse()
            .map_err(|e: String| SchemaViolation::new(path, "search category", e))
    }
}

/// A validated search request. Built fresh for every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    query: String,
    category: SearchCategory,
    limit: u32,
}

impl SearchQuery {
    pub fn new(
        query: impl Into<String>,
        category: SearchCategory,
        limit: u32,
    ) -> Result<Self, ClientError> {
        let query = query.into();
        let chars = query.chars().count();
        if chars < QUERY_MIN_CHARS {
            return Err(ClientError::precondition(format!(
                "Query must be at least {QUERY_MIN_CHARS} characters long."
            )));
        }
        if chars > QUERY_MAX_CHARS {
            return Err(ClientError::precondition(format!(
                "Query must be at most {QUERY_MAX_CHARS} characters long."
            )));
        }
        if !(LIMIT_MIN..=LIMIT_MAX).contains(&limit) {
            return Err(ClientError::precondition(format!(
                "Limit must be between {LIMIT_MIN} and {LIMIT_MAX}."
            )));
        }
        Ok(Self {
            query,
            category,
            limit,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn category(&self) -> SearchCategory {
        self.category
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Response
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkExperienceItem {
    pub title: Option<String>,
    pub company: Option<String>,
    pub duration: Option<String>,
    pub location: Option<String>,
}

impl Schema for WorkExperienceItem {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            title: fields.nullable_string("title")?,
            company: fields.nullable_string("company")?,
            duration: fields.nullable_string("duration")?,
            location: fields.nullable_string("location")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationItem {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
}

impl Schema for EducationItem {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            institution: fields.nullable_string("institution")?,
            degree: fields.nullable_string("degree")?,
            field_of_study: fields.nullable_string("field_of_study")?,
        })
    }
}

/// One profile returned by search. Every descriptive field may legitimately be null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonResult {
    pub id: String,
    pub url: Url,
    pub title: Option<String>,
    pub author: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub image: Option<Url>,
    pub work_experience: Vec<WorkExperienceItem>,
    pub education: Vec<EducationItem>,
    pub skills: Vec<String>,
}

impl Schema for PersonResult {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            id: fields.string("id")?,
            url: fields.url("url")?,
            title: fields.nullable_string("title")?,
            author: fields.nullable_string("author")?,
            location: fields.nullable_string("location")?,
            summary: fields.nullable_string("summary")?,
            image: fields.nullable_url("image")?,
            work_experience: fields.array("work_experience")?,
            education: fields.array("education")?,
            skills: fields.string_array("skills")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMetadata {
    pub total_results: u64,
    pub search_time_ms: f64,
    pub enhanced_query: Option<String>,
}

impl Schema for SearchMetadata {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            total_results: fields.count("total_results")?,
            search_time_ms: fields.number("search_time_ms")?,
            enhanced_query: fields.nullable_string("enhanced_query")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<PersonResult>,
    pub metadata: SearchMetadata,
}

impl Schema for SearchResponse {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation> {
        let fields = Fields::of(value, path)?;
        Ok(Self {
            results: fields.array("results")?,
            metadata: fields.object("metadata")?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::validate;
    use serde_json::json;

    pub(crate) fn person_json(id: &str) -> Value {
        json!({
            "id": id,
            "url": format!("https://www.linkedin.com/in/{id}"),
            "title": "Machine Learning Engineer",
            "author": "Ada Lovelace",
            "location": null,
            "summary": null,
            "image": null,
            "work_experience": [
                {"title": "ML Engineer", "company": "Acme", "duration": null, "location": "Berlin"}
            ],
            "education": [
                {"institution": "TU Berlin", "degree": null, "field_of_study": "CS"}
            ],
            "skills": ["rust", "pytorch"]
        })
    }

    #[test]
    fn test_person_with_null_image_is_accepted() {
        let person: PersonResult = validate(&person_json("ada")).unwrap();
        assert!(person.image.is_none());
        assert_eq!(person.skills, vec!["rust", "pytorch"]);
        assert_eq!(person.work_experience[0].company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_person_missing_image_key_is_rejected() {
        let mut raw = person_json("ada");
        raw.as_object_mut().unwrap().remove("image");
        let err = validate::<PersonResult>(&raw).err().unwrap();
        assert_eq!(err.path, "$.image");
        assert_eq!(err.actual, "missing key");
    }

    #[test]
    fn test_person_with_malformed_image_url_is_rejected() {
        let mut raw = person_json("ada");
        raw["image"] = json!("avatar.png");
        let err = validate::<PersonResult>(&raw).err().unwrap();
        assert_eq!(err.path, "$.image");
        assert_eq!(err.expected, "URL string or null");
    }

    #[test]
    fn test_person_with_non_string_image_is_rejected() {
        let mut raw = person_json("ada");
        raw["image"] = json!(42);
        let err = validate::<PersonResult>(&raw).err().unwrap();
        assert_eq!(err.path, "$.image");
        assert_eq!(err.expected, "URL string or null");
        assert_eq!(err.actual, "number");
    }

    #[test]
    fn test_search_response_reports_nested_path() {
        let mut second = person_json("bob");
        second["education"][0]["degree"] = json!(7);
        let raw = json!({
            "results": [person_json("ada"), second],
            "metadata": {"total_results": 2, "search_time_ms": 12.5, "enhanced_query": null}
        });
        let err = validate::<SearchResponse>(&raw).err().unwrap();
        assert_eq!(err.path, "$.results[1].education[0].degree");
    }

    #[test]
    fn test_search_response_accepts_valid_payload() {
        let raw = json!({
            "results": [person_json("ada"), person_json("bob")],
            "metadata": {
                "total_results": 2,
                "search_time_ms": 0.0,
                "enhanced_query": "ai engineer berlin"
            }
        });
        let response: SearchResponse = validate(&raw).unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.metadata.total_results, 2);
        assert_eq!(
            response.metadata.enhanced_query.as_deref(),
            Some("ai engineer berlin")
        );
    }

    #[test]
    fn test_metadata_missing_enhanced_query_is_rejected() {
        let raw = json!({
            "results": [],
            "metadata": {"total_results": 0, "search_time_ms": 0.0}
        });
        let err = validate::<SearchResponse>(&raw).err().unwrap();
        assert_eq!(err.path, "$.metadata.enhanced_query");
    }

    #[test]
    fn test_category_from_json_rejects_unknown_value() {
        let err = validate::<SearchCategory>(&json!("people")).err().unwrap();
        assert!(err.expected.starts_with("one of"));
        assert_eq!(
            validate::<SearchCategory>(&json!("job offers")).unwrap(),
            SearchCategory::JobOffers
        );
    }

    #[test]
    fn test_category_parses_kebab_case() {
        assert_eq!(
            "linkedin-profile".parse::<SearchCategory>().unwrap(),
            SearchCategory::LinkedinProfile
        );
        assert!("people".parse::<SearchCategory>().is_err());
    }

    #[test]
    fn test_search_query_serializes_wire_category() {
        let query = SearchQuery::new("ai engineer", SearchCategory::LinkedinProfile, 10).unwrap();
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"query": "ai engineer", "category": "linkedin profile", "limit": 10})
        );
    }

    #[test]
    fn test_search_query_enforces_bounds() {
        assert!(SearchQuery::new("ai", SearchCategory::Company, 10).is_err());
        assert!(SearchQuery::new("x".repeat(501), SearchCategory::Company, 10).is_err());
        assert!(SearchQuery::new("rust", SearchCategory::Company, 0).is_err());
        assert!(SearchQuery::new("rust", SearchCategory::Company, 51).is_err());
        assert!(SearchQuery::new("rust", SearchCategory::Company, 50).is_ok());
    }
}
