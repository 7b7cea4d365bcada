//! Detail page fetching
//!
//! Fetches one posting page and turns the response into a `DetailOutcome`.
//! Extraction itself is delegated to the pure functions in `extract`.

use super::fetcher::{fetch_url, FetchResult};
use super::governor::DelayGovernor;
use crate::extract::{parse_detail_page, ExtractSettings};
use crate::model::{SitemapEntry, Tombstone};
use crate::state::DetailOutcome;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches and extracts detail pages
#[derive(Clone)]
pub struct DetailFetcher {
    client: Client,
    governor: Arc<DelayGovernor>,
    settings: ExtractSettings,
}

impl DetailFetcher {
    pub fn new(client: Client, governor: Arc<DelayGovernor>, settings: ExtractSettings) -> Self {
        Self {
            client,
            governor,
            settings,
        }
    }

    /// Fetches one entry, waiting for the governor first
    ///
    /// Never fails: network and extraction problems come back as
    /// `DetailOutcome::Failed`, a 404 as `DetailOutcome::Removed`.
    pub async fn fetch(&self, entry: &SitemapEntry) -> DetailOutcome {
        self.governor.wait().await;

        match fetch_url(&self.client, &entry.url).await {
            FetchResult::Success { body, .. } => {
                match parse_detail_page(entry, &body, &self.settings, Utc::now()) {
                    Ok(posting) => {
                        debug!(
                            "Extracted {} via {}",
                            entry.id,
                            posting.extraction.to_db_string()
                        );
                        DetailOutcome::Posting(Box::new(posting))
                    }
                    Err(e) => {
                        warn!("Failed to extract {}: {}", entry.url, e);
                        DetailOutcome::Failed {
                            id: entry.id.clone(),
                            reason: e.to_string(),
                        }
                    }
                }
            }
            FetchResult::NotFound => {
                debug!("Posting {} is gone (404)", entry.id);
                DetailOutcome::Removed(Tombstone::new(entry.id.clone()))
            }
            failure => {
                let reason = failure
                    .failure_reason()
                    .unwrap_or_else(|| "unknown failure".to_string());
                warn!("Failed to fetch {}: {}", entry.url, reason);
                DetailOutcome::Failed {
                    id: entry.id.clone(),
                    reason,
                }
            }
        }
    }
}
