//! Sitemap entries and posting URL recognition

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Path segment that identifies a posting URL
pub const POSTING_PATH_SEGMENT: &str = "recruitment";

/// One posting URL listed in a category sitemap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub id: String,
    pub url: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl SitemapEntry {
    /// Builds an entry if `url` has the shape `/recruitment/<id>`
    pub fn from_url(url: &str, last_modified: Option<DateTime<Utc>>) -> Option<Self> {
        let id = posting_id_from_url(url)?;
        Some(Self {
            id,
            url: url.to_string(),
            last_modified,
        })
    }

    /// Builds an entry for a bare identifier
    pub fn from_id(base_url: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: format!(
                "{}/{}/{}",
                base_url.trim_end_matches('/'),
                POSTING_PATH_SEGMENT,
                id
            ),
            last_modified: None,
        }
    }
}

fn posting_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://[^/]+/recruitment/([^/?#]+)/?(?:[?#].*)?$")
            .expect("posting path pattern is valid")
    })
}

/// Extracts the opaque posting id from a detail URL
pub fn posting_id_from_url(url: &str) -> Option<String> {
    posting_path_regex()
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
