//! Detail page to canonical posting
//!
//! Tries the embedded payload first and falls back to linked data. No I/O
//! happens here; the crawler hands in the page body.

use super::embedded::{extract_embedded_object, EmbeddedError};
use super::fields::{number, text, text_at, text_list};
use super::linked_data::{find_job_posting, posting_from_linked_data, read_page_meta, PageMeta};
use super::normalize::{extract_education, map_employment_types, parse_date, parse_timestamp};
use super::sections::classify_sections;
use crate::config::SourceConfig;
use crate::model::{ExtractionPath, JobPosting, SitemapEntry};
use chrono::{DateTime, Utc};
use scraper::Html;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Deadline types that mean the posting has no closing date
const OPEN_ENDED_DEADLINES: &[&str] = &["ALWAYS", "ROLLING", "UNTIL_FILLED", "상시", "채용시"];

/// Neither extraction strategy found anything on the page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no structured data ({embedded}) and no linked-data job posting")]
    NoStructuredData { embedded: EmbeddedError },
}

/// Source-specific knobs the extractor needs
#[derive(Debug, Clone)]
pub struct ExtractSettings {
    pub anchor_key: String,
    pub source_tag: String,
}

impl ExtractSettings {
    pub fn from_source(source: &SourceConfig) -> Self {
        Self {
            anchor_key: source.embedded_anchor_key.clone(),
            source_tag: source.source_tag.clone(),
        }
    }
}

/// Extracts a posting from a detail page body
pub fn parse_detail_page(
    entry: &SitemapEntry,
    html: &str,
    settings: &ExtractSettings,
    crawled_at: DateTime<Utc>,
) -> Result<JobPosting, ExtractError> {
    let document = Html::parse_document(html);
    let meta = read_page_meta(&document);

    match extract_embedded_object(html, &settings.anchor_key) {
        Ok(object) => Ok(posting_from_embedded(
            entry,
            &object,
            &meta,
            &settings.source_tag,
            crawled_at,
        )),
        Err(embedded) => {
            debug!("Embedded payload unusable for {}: {}", entry.id, embedded);
            find_job_posting(&document)
                .map(|job| {
                    posting_from_linked_data(entry, &job, &meta, &settings.source_tag, crawled_at)
                })
                .ok_or(ExtractError::NoStructuredData { embedded })
        }
    }
}

/// Maps the carved payload object onto a posting
pub fn posting_from_embedded(
    entry: &SitemapEntry,
    object: &Value,
    meta: &PageMeta,
    source_tag: &str,
    crawled_at: DateTime<Utc>,
) -> JobPosting {
    let company_name = text(object, &["companyName"])
        .or_else(|| text_at(object, &["company", "name"]))
        .unwrap_or_default();

    let company_logo = text(object, &["companyImage", "companyLogo"])
        .or_else(|| text_at(object, &["company", "image"]))
        .or_else(|| text_at(object, &["company", "logo"]))
        .or_else(|| meta.image.clone());

    let title = text(object, &["title"])
        .or_else(|| meta.title.clone())
        .unwrap_or_default();

    let content = text(object, &["content", "description"]).unwrap_or_default();
    let sections = classify_sections(&content);

    let education = extract_education(
        &text_list(object, "educations"),
        text(object, &["education"]).as_deref(),
        &sections.raw_content,
    );

    let regions = text_list(object, "regions");
    let location = text(object, &["location", "address"]).or_else(|| regions.first().cloned());

    let deadline_type = text(object, &["deadlineType"]);
    let deadline = if deadline_type.as_deref().map(is_open_ended).unwrap_or(false) {
        None
    } else {
        text(object, &["endDate", "deadline"]).and_then(|d| parse_date(&d))
    };

    let last_modified = entry
        .last_modified
        .or_else(|| text(object, &["updatedAt"]).and_then(|t| parse_timestamp(&t)));

    JobPosting {
        id: entry.id.clone(),
        source: source_tag.to_string(),
        url: entry.url.clone(),
        company_name,
        company_logo,
        title,
        regions,
        location,
        career_min: career_years(object, "careerMin"),
        career_max: career_years(object, "careerMax"),
        employment_types: map_employment_types(text_list(object, "employeeTypes")),
        depth_ones: text_list(object, "depthOnes"),
        depth_twos: text_list(object, "depthTwos"),
        keywords: text_list(object, "keywords"),
        view_count: number(object, &["viewCount", "views"]),
        sections,
        education,
        posted_at: text(object, &["createdAt", "startDate"]).and_then(|t| parse_timestamp(&t)),
        last_modified,
        deadline,
        deadline_type,
        crawled_at,
        extraction: ExtractionPath::Embedded,
        is_active: true,
    }
}

fn career_years(object: &Value, key: &str) -> Option<u32> {
    number(object, &[key]).and_then(|years| u32::try_from(years).ok())
}

fn is_open_ended(deadline_type: &str) -> bool {
    let upper = deadline_type.trim().to_uppercase();
    OPEN_ENDED_DEADLINES.iter().any(|kind| upper == *kind)
}
