use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::config::Config;
use crate::gateway::Gateway;
use crate::resume::{HttpResumeApi, ResumeWorkflowController};
use crate::search::{HttpSearchApi, SearchController};
use crate::session::{AuthEvent, Credential, SessionProvider, SupabaseSessionProvider};

/// Everything a command needs, wired once at startup.
pub struct ClientState {
    pub config: Config,
    pub session: Arc<dyn SessionProvider>,
    pub search: SearchController,
    pub resume: ResumeWorkflowController,
}

impl ClientState {
    pub async fn from_config(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let provider = SupabaseSessionProvider::new(
            http.clone(),
            &config.supabase_url,
            &config.supabase_anon_key,
        );
        // Subscribe before installing the credential so SignedIn is logged too
        tokio::spawn(log_auth_events(provider.subscribe()));
        if let Some(credential) = initial_credential(&config)? {
            provider.sign_in(credential).await;
            info!("Session loaded from environment");
        }
        let session: Arc<dyn SessionProvider> = Arc::new(provider);

        let gateway = Arc::new(Gateway::with_client(http, &config.api_url, session.clone()));
        let search = SearchController::new(Arc::new(HttpSearchApi::new(gateway.clone())));
        let resume = ResumeWorkflowController::new(Arc::new(HttpResumeApi::new(gateway)));

        Ok(Self {
            config,
            session,
            search,
            resume,
        })
    }
}

async fn log_auth_events(mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => info!("Auth event: {event:?}"),
            Err(RecvError::Lagged(n)) => warn!("Missed {n} auth events"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn initial_credential(config: &Config) -> Result<Option<Credential>> {
    let Some(access_token) = config.access_token.clone() else {
        return Ok(None);
    };
    let mut credential = Credential::from_access_token(access_token)
        .context("SCOUT_ACCESS_TOKEN is not a decodable JWT")?;
    if let Some(refresh_token) = &config.refresh_token {
        credential = credential.with_refresh_token(refresh_token.clone());
    }
    Ok(Some(credential))
}
