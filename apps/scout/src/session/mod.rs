//! Session Provider: the identity collaborator the gateway authenticates through.
//!
//! The provider owns the process-wide credential. Callers only read it and may ask for a
//! refresh; they never hold it as the source of truth.

use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

pub mod supabase;

pub use supabase::SupabaseSessionProvider;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Malformed access token: {0}")]
    MalformedToken(String),

    #[error("Refresh rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Auth-state change broadcast to subscribers (e.g. a shell redirecting on sign-out).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

/// Bearer token plus the instant it stops being accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at,
        }
    }

    /// Builds a credential from a JWT access token, reading expiry from its `exp` claim.
    pub fn from_access_token(access_token: impl Into<String>) -> Result<Self, SessionError> {
        let access_token = access_token.into();
        let claims = decode_claims(&access_token)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| {
                SessionError::MalformedToken(format!("exp out of range: {}", claims.exp))
            })?;
        debug!(
            "Access token for {} expires at {}",
            claims.sub.as_deref().unwrap_or("<no subject>"),
            expires_at
        );
        Ok(Self::new(access_token, expires_at))
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The subset of JWT claims the client inspects.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
}

/// Decodes the (unverified) payload segment of a JWT.
pub fn decode_claims(token: &str) -> Result<TokenClaims, SessionError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| {
            SessionError::MalformedToken("expected three dot-separated segments".into())
        })?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::MalformedToken(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SessionError::MalformedToken(format!("payload is not a claims object: {e}")))
}

/// Identity collaborator consumed by the gateway.
///
/// Implementations are shared as `Arc<dyn SessionProvider>` and must synchronize internally;
/// any caller may trigger a refresh.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self) -> Option<Credential>;

    async fn refresh_session(&self) -> Result<Credential, SessionError>;

    async fn sign_out(&self);

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
