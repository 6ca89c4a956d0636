use anyhow::{Context, Result};

/// Client configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Clone)]
pub struct Config {
    pub api_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub request_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_url: require_env("SCOUT_API_URL")?,
            supabase_url: require_env("SUPABASE_URL")?,
            supabase_anon_key: require_env("SUPABASE_ANON_KEY")?,
            access_token: optional_env("SCOUT_ACCESS_TOKEN"),
            refresh_token: optional_env("SCOUT_REFRESH_TOKEN"),
            request_timeout_secs: std::env::var("SCOUT_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("SCOUT_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("supabase_url", &self.supabase_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<set>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<set>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("rust_log", &self.rust_log)
            .finish_non_exhaustive()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
