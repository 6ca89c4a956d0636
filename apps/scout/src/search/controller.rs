#![allow(dead_code)]
//! Search Query Controller: single-request idle/loading/success/error model.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::schema::search::{PersonResult, SearchMetadata, SearchQuery};
use crate::search::SearchApi;

const DEFAULT_ERROR: &str = "An unknown error occurred.";

/// Observable search state. `results` and `metadata` are always set together.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub is_loading: bool,
    pub results: Vec<PersonResult>,
    pub metadata: Option<SearchMetadata>,
    pub error: Option<String>,
}

pub struct SearchController {
    api: Arc<dyn SearchApi>,
    state: watch::Sender<SearchState>,
    latest: AtomicU64,
}

impl SearchController {
    pub fn new(api: Arc<dyn SearchApi>) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            api,
            state,
            latest: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Runs one search. Prior results and errors are cleared before the request goes out.
    ///
    /// Only the most recently issued call may settle the state; an older response that
    /// arrives late is dropped.
    pub async fn fetch_results(&self, query: SearchQuery) {
        let mut ticket = 0;
        self.state.send_modify(|s| {
            ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            *s = SearchState {
                is_loading: true,
                ..SearchState::default()
            };
        });
        debug!(
            "Search #{ticket} started: '{}' ({}, limit {})",
            query.query(),
            query.category(),
            query.limit()
        );

        let outcome = self.api.search(&query).await;

        self.state.send_if_modified(|s| {
            if self.latest.load(Ordering::SeqCst) != ticket {
                debug!("Search #{ticket} superseded, dropping its response");
                return false;
            }
            s.is_loading = false;
            match outcome {
                Ok(response) => {
                    info!(
                        "Search #{ticket} returned {} results",
                        response.results.len()
                    );
                    s.results = response.results;
                    s.metadata = Some(response.metadata);
                }
                Err(e) => {
                    warn!("Search #{ticket} failed: {e}");
                    s.error = Some(e.user_message(DEFAULT_ERROR));
                }
            }
            true
        });
    }
}
