//! Canonical posting record

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive text of a posting split into canonical sections
///
/// `raw_content` is the text the other six fields were derived from; running
/// the classifier over it again reproduces them exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailSections {
    pub intro: String,
    pub main_tasks: String,
    pub requirements: String,
    pub preferred_points: String,
    pub benefits: String,
    pub work_conditions: String,
    pub raw_content: String,
}

impl DetailSections {
    /// Sections for a page where only a summary is available
    ///
    /// The summary lands in `main_tasks`; everything else stays empty.
    pub fn summary_only(summary: &str) -> Self {
        let summary = summary.trim().to_string();
        Self {
            main_tasks: summary.clone(),
            raw_content: summary,
            ..Self::default()
        }
    }
}

/// Which extraction strategy produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    /// Structured object carved out of the streamed page payload
    Embedded,
    /// `application/ld+json` block plus social-preview meta tags
    LinkedData,
}

impl ExtractionPath {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::LinkedData => "linked_data",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "embedded" => Some(Self::Embedded),
            "linked_data" => Some(Self::LinkedData),
            _ => None,
        }
    }
}

/// A job posting in canonical form
///
/// `id` comes from the posting's URL path segment and is the upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub source: String,
    pub url: String,
    pub company_name: String,
    pub company_logo: Option<String>,
    pub title: String,
    pub regions: Vec<String>,
    pub location: Option<String>,
    pub career_min: Option<u32>,
    pub career_max: Option<u32>,
    pub employment_types: Vec<String>,
    /// First-level category tags
    pub depth_ones: Vec<String>,
    /// Second-level category tags
    pub depth_twos: Vec<String>,
    pub keywords: Vec<String>,
    pub view_count: Option<u64>,
    pub sections: DetailSections,
    pub education: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
    pub deadline_type: Option<String>,
    pub crawled_at: DateTime<Utc>,
    pub extraction: ExtractionPath,
    pub is_active: bool,
}

/// Marker for a posting the source no longer serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub id: String,
    pub active: bool,
}

impl Tombstone {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: false,
        }
    }
}
