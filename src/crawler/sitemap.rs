//! Sitemap discovery
//!
//! The source publishes a sitemap index pointing at per-category sitemaps.
//! Only the category sitemaps whose URL carries the configured marker are
//! walked; inside them only `/recruitment/<id>` URLs are kept.

use super::fetcher::{fetch_url, FetchResult};
use super::governor::DelayGovernor;
use crate::config::SourceConfig;
use crate::extract::parse_timestamp;
use crate::model::SitemapEntry;
use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// One `<url>` or `<sitemap>` element
#[derive(Debug, Default)]
struct Location {
    loc: String,
    last_modified: Option<String>,
}

enum Field {
    Loc,
    LastMod,
}

/// Reads every `<loc>`/`<lastmod>` pair in a sitemap or sitemap index
///
/// Only unprefixed elements that are direct children of `<url>` or
/// `<sitemap>` count, so extension elements such as `<image:loc>` are skipped.
fn read_locations(xml: &str) -> std::result::Result<Vec<Location>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locations = Vec::new();
    let mut current: Option<Location> = None;
    let mut entry_depth: Option<usize> = None;
    let mut depth = 0usize;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                match (entry_depth, e.name().as_ref()) {
                    (None, b"url" | b"sitemap") => {
                        current = Some(Location::default());
                        entry_depth = Some(depth);
                    }
                    (Some(entry), b"loc") if depth == entry + 1 => {
                        field = Some(Field::Loc);
                        text.clear();
                    }
                    (Some(entry), b"lastmod") if depth == entry + 1 => {
                        field = Some(Field::LastMod);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if field.is_some() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                match entry_depth {
                    Some(entry) if depth == entry + 1 => {
                        if let (Some(f), Some(location)) = (field.take(), current.as_mut()) {
                            let value = text.trim().to_string();
                            match f {
                                Field::Loc => location.loc = value,
                                Field::LastMod => location.last_modified = Some(value),
                            }
                        }
                    }
                    Some(entry) if depth == entry => {
                        entry_depth = None;
                        if let Some(location) = current.take() {
                            if !location.loc.is_empty() {
                                locations.push(location);
                            }
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(locations)
}

/// Category sitemap URLs listed in an index whose path contains `marker`
pub fn parse_sitemap_index(
    xml: &str,
    marker: &str,
) -> std::result::Result<Vec<String>, quick_xml::Error> {
    let mut seen = HashSet::new();
    Ok(read_locations(xml)?
        .into_iter()
        .map(|location| location.loc)
        .filter(|loc| path_has_marker(loc, marker))
        .filter(|loc| seen.insert(loc.clone()))
        .collect())
}

fn path_has_marker(loc: &str, marker: &str) -> bool {
    Url::parse(loc)
        .map(|url| url.path().contains(marker))
        .unwrap_or(false)
}

/// Posting entries in a category sitemap, one per id
pub fn parse_url_set(xml: &str) -> std::result::Result<Vec<SitemapEntry>, quick_xml::Error> {
    let mut seen = HashSet::new();
    Ok(read_locations(xml)?
        .into_iter()
        .filter_map(|location| {
            let last_modified = location
                .last_modified
                .as_deref()
                .and_then(parse_timestamp);
            SitemapEntry::from_url(&location.loc, last_modified)
        })
        .filter(|entry| seen.insert(entry.id.clone()))
        .collect())
}

/// Keeps entries modified after `since`
///
/// With no cutoff every entry is kept. With a cutoff, entries without a
/// `lastmod` are dropped.
pub fn filter_since(entries: Vec<SitemapEntry>, since: Option<DateTime<Utc>>) -> Vec<SitemapEntry> {
    match since {
        None => entries,
        Some(cutoff) => entries
            .into_iter()
            .filter(|entry| entry.last_modified.map(|lm| lm > cutoff).unwrap_or(false))
            .collect(),
    }
}

/// Walks the sitemap index and its category sitemaps
pub struct SitemapWalker {
    client: Client,
    governor: Arc<DelayGovernor>,
    index_url: String,
    category_marker: String,
}

impl SitemapWalker {
    pub fn new(source: &SourceConfig, client: Client, governor: Arc<DelayGovernor>) -> Self {
        Self {
            client,
            governor,
            index_url: source.sitemap_index_url(),
            category_marker: source.category_marker.clone(),
        }
    }

    async fn fetch_document(&self, url: &str) -> Result<String> {
        self.governor.wait().await;

        match fetch_url(&self.client, url).await {
            FetchResult::Success { body, .. } => Ok(body),
            FetchResult::NotFound => Err(SyncError::HttpStatus {
                url: url.to_string(),
                status_code: 404,
            }),
            FetchResult::HttpError { status_code } => Err(SyncError::HttpStatus {
                url: url.to_string(),
                status_code,
            }),
            FetchResult::NetworkError { error } => Err(SyncError::Network {
                url: url.to_string(),
                message: error,
            }),
        }
    }

    /// Fetches the index and returns the relevant category sitemap URLs
    pub async fn fetch_index(&self) -> Result<Vec<String>> {
        let body = self.fetch_document(&self.index_url).await?;
        let urls = parse_sitemap_index(&body, &self.category_marker).map_err(|e| {
            SyncError::SitemapParse {
                url: self.index_url.clone(),
                message: e.to_string(),
            }
        })?;

        debug!(
            "Sitemap index lists {} category sitemap(s) matching '{}'",
            urls.len(),
            self.category_marker
        );
        Ok(urls)
    }

    /// Fetches one category sitemap
    pub async fn fetch_entries(&self, url: &str) -> Result<Vec<SitemapEntry>> {
        let body = self.fetch_document(url).await?;
        parse_url_set(&body).map_err(|e| SyncError::SitemapParse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetches every category sitemap and merges the entries
    ///
    /// Ids are unique across sitemaps; the first occurrence wins. Any failed
    /// fetch aborts the walk.
    pub async fn fetch_all(&self, since: Option<DateTime<Utc>>) -> Result<Vec<SitemapEntry>> {
        let sitemap_urls = self.fetch_index().await?;

        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for url in &sitemap_urls {
            let batch = self.fetch_entries(url).await?;
            let before = entries.len();
            entries.extend(batch.into_iter().filter(|e| seen.insert(e.id.clone())));
            debug!("{}: {} new entries", url, entries.len() - before);
        }

        info!(
            "Discovered {} postings across {} sitemap(s)",
            entries.len(),
            sitemap_urls.len()
        );

        Ok(filter_since(entries, since))
    }
}
