//! Search: the `SearchApi` port, its HTTP adapter, and the query controller.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ClientError;
use crate::gateway::{Gateway, RequestOptions};
use crate::schema::search::{SearchQuery, SearchResponse};
use crate::schema::validate;

pub mod controller;

pub use controller::SearchController;

pub const SEARCH_ENDPOINT: &str = "/search/linkedin";

/// Backend search capability. Carried by the controller as `Arc<dyn SearchApi>`.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ClientError>;
}

/// `SearchApi` over the authenticated gateway.
pub struct HttpSearchApi {
    gateway: Arc<Gateway>,
}

impl HttpSearchApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ClientError> {
        let body = serde_json::to_value(query)
            .map_err(|e| ClientError::precondition(format!("Unserializable query: {e}")))?;
        let raw = self
            .gateway
            .call(SEARCH_ENDPOINT, RequestOptions::post_json(body))
            .await?;
        Ok(validate::<SearchResponse>(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::search::tests::person_json;
    use crate::schema::search::SearchCategory;
    use crate::session::tests::FakeSession;
    use httpmock::prelude::*;
    use serde_json::json;

    fn api(server: &MockServer) -> HttpSearchApi {
        let session = Arc::new(FakeSession::valid("t"));
        let gateway = Gateway::with_client(reqwest::Client::new(), &server.base_url(), session);
        HttpSearchApi::new(Arc::new(gateway))
    }

    #[tokio::test]
    async fn test_search_posts_query_and_validates_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(SEARCH_ENDPOINT).json_body(json!({
                    "query": "ai engineer",
                    "category": "linkedin profile",
                    "limit": 10
                }));
                then.status(200).json_body(json!({
                    "results": [person_json("ada")],
                    "metadata": {"total_results": 1, "search_time_ms": 3.0, "enhanced_query": null}
                }));
            })
            .await;

        let query = SearchQuery::new("ai engineer", SearchCategory::LinkedinProfile, 10).unwrap();
        let response = api(&server).search(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.results[0].id, "ada");
    }

    #[tokio::test]
    async fn test_search_rejects_payload_with_missing_key() {
        let server = MockServer::start_async().await;
        let mut person = person_json("ada");
        person.as_object_mut().unwrap().remove("image");
        server
            .mock_async(|when, then| {
                when.path(SEARCH_ENDPOINT);
                then.status(200).json_body(json!({
                    "results": [person],
                    "metadata": {"total_results": 1, "search_time_ms": 3.0, "enhanced_query": null}
                }));
            })
            .await;

        let query = SearchQuery::new("ai engineer", SearchCategory::LinkedinProfile, 10).unwrap();
        let err = api(&server).search(&query).await.unwrap_err();

        match err {
            ClientError::SchemaViolation(v) => assert_eq!(v.path, "$.results[0].image"),
            other => panic!("expected schema violation, got {other:?}"),
        }
    }
}
