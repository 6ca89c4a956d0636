//! Supabase-compatible session provider (GoTrue REST endpoints).

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::{AuthEvent, Credential, SessionError, SessionProvider};

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    /// Unix seconds. Older GoTrue versions omit it and only send `expires_in`.
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GoTrueError {
    #[serde(alias = "msg", alias = "message")]
    error_description: Option<String>,
}

pub struct SupabaseSessionProvider {
    http: Client,
    auth_url: String,
    anon_key: String,
    current: RwLock<Option<Credential>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseSessionProvider {
    pub fn new(http: Client, supabase_url: &str, anon_key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            http,
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
            current: RwLock::new(None),
            events,
        }
    }

    /// Installs a credential obtained out of band (e.g. from configuration).
    pub async fn sign_in(&self, credential: Credential) {
        debug!("Session installed, expires at {}", credential.expires_at);
        *self.current.write().await = Some(credential);
        let _ = self.events.send(AuthEvent::SignedIn);
    }

    fn credential_from(&self, token: TokenResponse) -> Result<Credential, SessionError> {
        let mut credential = match token.expires_at.and_then(|s| Utc.timestamp_opt(s, 0).single()) {
            Some(expires_at) => Credential::new(token.access_token, expires_at),
            None => Credential::from_access_token(token.access_token)?,
        };
        credential.refresh_token = token.refresh_token;
        Ok(credential)
    }
}

#[async_trait]
impl SessionProvider for SupabaseSessionProvider {
    async fn get_session(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    async fn refresh_session(&self) -> Result<Credential, SessionError> {
        let refresh_token = self
            .current
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
            .ok_or(SessionError::NoRefreshToken)?;

        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoTrueError>(&body)
                .ok()
                .and_then(|e| e.error_description)
                .unwrap_or(body);
            warn!("Session refresh rejected ({}): {}", status, message);
            return Err(SessionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response.json().await?;
        let mut credential = self.credential_from(token)?;
        if credential.refresh_token.is_none() {
            credential.refresh_token = Some(refresh_token);
        }

        *self.current.write().await = Some(credential.clone());
        let _ = self.events.send(AuthEvent::TokenRefreshed);
        info!("Session refreshed, expires at {}", credential.expires_at);

        Ok(credential)
    }

    async fn sign_out(&self) {
        let previous = self.current.write().await.take();

        if let Some(credential) = previous {
            let result = self
                .http
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&credential.access_token)
                .send()
                .await;
            match result {
                Ok(r) if r.status().is_success() => debug!("Remote session revoked"),
                Ok(r) => warn!("Sign-out returned {}; local session cleared anyway", r.status()),
                Err(e) => warn!("Sign-out request failed: {e}; local session cleared anyway"),
            }
        }

        let _ = self.events.send(AuthEvent::SignedOut);
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::jwt;
    use chrono::Duration;
    use httpmock::prelude::*;
    use serde_json::json;

    fn expired_with_refresh(refresh: &str) -> Credential {
        Credential::new("stale", Utc::now() - Duration::minutes(5)).with_refresh_token(refresh)
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_token_and_stores_result() {
        let server = MockServer::start_async().await;
        let exp = Utc::now().timestamp() + 3600;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/v1/token")
                    .query_param("grant_type", "refresh_token")
                    .header("apikey", "anon")
                    .json_body(json!({"refresh_token": "rt-1"}));
                then.status(200).json_body(json!({
                    "access_token": "fresh",
                    "refresh_token": "rt-2",
                    "expires_at": exp,
                    "token_type": "bearer"
                }));
            })
            .await;

        let provider = SupabaseSessionProvider::new(Client::new(), &server.base_url(), "anon");
        provider.sign_in(expired_with_refresh("rt-1")).await;
        let mut events = provider.subscribe();

        let credential = provider.refresh_session().await.unwrap();

        mock.assert_async().await;
        assert_eq!(credential.access_token, "fresh");
        assert_eq!(credential.refresh_token.as_deref(), Some("rt-2"));
        assert_eq!(credential.expires_at.timestamp(), exp);
        assert_eq!(provider.get_session().await, Some(credential));
        assert_eq!(events.recv().await.unwrap(), AuthEvent::TokenRefreshed);
    }

    #[tokio::test]
    async fn test_refresh_decodes_expiry_from_token_when_absent() {
        let server = MockServer::start_async().await;
        let token = jwt(2_000_000_000, "user-1");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/token");
                then.status(200).json_body(json!({"access_token": token}));
            })
            .await;

        let provider = SupabaseSessionProvider::new(Client::new(), &server.base_url(), "anon");
        provider.sign_in(expired_with_refresh("rt-1")).await;

        let credential = provider.refresh_session().await.unwrap();
        assert_eq!(credential.expires_at.timestamp(), 2_000_000_000);
        assert_eq!(credential.refresh_token.as_deref(), Some("rt-1"));
    }

    #[tokio::test]
    async fn test_refresh_surfaces_rejection_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/token");
                then.status(400).json_body(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid Refresh Token: Already Used"
                }));
            })
            .await;

        let provider = SupabaseSessionProvider::new(Client::new(), &server.base_url(), "anon");
        provider.sign_in(expired_with_refresh("rt-1")).await;

        match provider.refresh_session().await {
            Err(SessionError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid Refresh Token: Already Used");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_fast() {
        let provider = SupabaseSessionProvider::new(Client::new(), "http://127.0.0.1:9", "anon");
        provider
            .sign_in(Credential::new("t", Utc::now() - Duration::minutes(1)))
            .await;
        assert!(matches!(
            provider.refresh_session().await,
            Err(SessionError::NoRefreshToken)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_and_notifies() {
        let server = MockServer::start_async().await;
        let logout = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/v1/logout")
                    .header("authorization", "Bearer live");
                then.status(204);
            })
            .await;

        let provider = SupabaseSessionProvider::new(Client::new(), &server.base_url(), "anon");
        provider
            .sign_in(Credential::new("live", Utc::now() + Duration::hours(1)))
            .await;
        let mut events = provider.subscribe();

        provider.sign_out().await;

        logout.assert_async().await;
        assert!(provider.get_session().await.is_none());
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
    }
}
