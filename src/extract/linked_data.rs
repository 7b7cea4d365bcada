//! Fallback extraction from `application/ld+json` and social-preview meta tags
//!
//! Used when the streamed payload is missing or unreadable. The data here is
//! coarser: no career range, no sub-categories, and only a summary for the
//! descriptive text.

use super::fields::{as_text, dedup_preserving_order, text, text_list};
use super::normalize::{extract_education, map_employment_types, parse_date, parse_timestamp};
use crate::model::{DetailSections, ExtractionPath, JobPosting, SitemapEntry};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

const JOB_POSTING_TYPE: &str = "JobPosting";

static CATEGORY_RE: OnceLock<Regex> = OnceLock::new();

/// Open Graph values read from the page head
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Reads `og:title`, `og:description` and `og:image`
pub fn read_page_meta(document: &Html) -> PageMeta {
    PageMeta {
        title: meta_content(document, "og:title"),
        description: meta_content(document, "og:description"),
        image: meta_content(document, "og:image"),
    }
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[property='{}']", property)).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

/// Finds the first ld+json value whose `@type` is `JobPosting`
///
/// Blocks may hold a single object, an array, or an object with `@graph`.
/// Blocks that are not valid JSON are skipped.
pub fn find_job_posting(document: &Html) -> Option<Value> {
    let selector = Selector::parse("script[type='application/ld+json']").ok()?;

    document.select(&selector).find_map(|script| {
        let body = script.text().collect::<String>();
        let value: Value = serde_json::from_str(body.trim()).ok()?;
        find_in_value(&value).cloned()
    })
}

fn find_in_value(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_in_value),
        Value::Object(map) => {
            if is_job_posting_type(map.get("@type")) {
                Some(value)
            } else {
                map.get("@graph").and_then(find_in_value)
            }
        }
        _ => None,
    }
}

fn is_job_posting_type(type_value: Option<&Value>) -> bool {
    match type_value {
        Some(Value::String(s)) => s == JOB_POSTING_TYPE,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(JOB_POSTING_TYPE)),
        _ => false,
    }
}

/// Coarse category from the bracketed segment of a title, e.g. `[개발] ...`
pub fn category_from_title(title: &str) -> Option<String> {
    let re = CATEGORY_RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").unwrap());
    re.captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Builds a posting from a ld+json `JobPosting` value and the page meta
pub fn posting_from_linked_data(
    entry: &SitemapEntry,
    job: &Value,
    meta: &PageMeta,
    source_tag: &str,
    crawled_at: DateTime<Utc>,
) -> JobPosting {
    let organization = job.get("hiringOrganization");
    let company_name = organization
        .and_then(|org| match org {
            Value::Object(_) => text(org, &["name"]),
            other => as_text(other),
        })
        .unwrap_or_default();

    let company_logo = organization
        .and_then(|org| org.get("logo"))
        .and_then(|logo| match logo {
            Value::Object(_) => text(logo, &["url", "contentUrl"]),
            other => as_text(other),
        })
        .or_else(|| meta.image.clone());

    let title = text(job, &["title", "name"])
        .or_else(|| meta.title.clone())
        .unwrap_or_default();

    let (regions, street) = job_locations(job.get("jobLocation"));
    let location = street.or_else(|| regions.first().cloned());

    let summary = meta
        .description
        .clone()
        .or_else(|| text(job, &["description"]).map(|d| html_to_text(&d)))
        .unwrap_or_default();

    let single_education = job.get("educationRequirements").and_then(|req| match req {
        Value::Object(_) => text(req, &["credentialCategory", "name"]),
        other => as_text(other),
    });
    let education = extract_education(&[], single_education.as_deref(), &summary);

    let depth_ones = meta
        .title
        .as_deref()
        .and_then(category_from_title)
        .into_iter()
        .collect();

    JobPosting {
        id: entry.id.clone(),
        source: source_tag.to_string(),
        url: entry.url.clone(),
        company_name,
        company_logo,
        title,
        regions,
        location,
        career_min: None,
        career_max: None,
        employment_types: map_employment_types(text_list(job, "employmentType")),
        depth_ones,
        depth_twos: Vec::new(),
        keywords: Vec::new(),
        view_count: None,
        sections: DetailSections::summary_only(&summary),
        education,
        posted_at: text(job, &["datePosted"]).and_then(|d| parse_timestamp(&d)),
        last_modified: entry.last_modified,
        deadline: text(job, &["validThrough"]).and_then(|d| parse_date(&d)),
        deadline_type: None,
        crawled_at,
        extraction: ExtractionPath::LinkedData,
        is_active: true,
    }
}

/// Region labels and the first street address from `jobLocation`
fn job_locations(job_location: Option<&Value>) -> (Vec<String>, Option<String>) {
    let places: Vec<&Value> = match job_location {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(place @ Value::Object(_)) => vec![place],
        _ => Vec::new(),
    };

    let mut regions = Vec::new();
    let mut street = None;

    for place in places {
        match place.get("address") {
            Some(address @ Value::Object(_)) => {
                let parts: Vec<String> = ["addressRegion", "addressLocality"]
                    .iter()
                    .filter_map(|key| text(address, &[*key]))
                    .collect();
                if !parts.is_empty() {
                    regions.push(parts.join(" "));
                }
                if street.is_none() {
                    street = text(address, &["streetAddress"]);
                }
            }
            Some(other) => {
                if let Some(address) = as_text(other) {
                    regions.push(address);
                }
            }
            None => {}
        }
    }

    (dedup_preserving_order(regions), street)
}

/// Flattens an HTML snippet to its text, one text node per line
fn html_to_text(snippet: &str) -> String {
    if !snippet.contains('<') {
        return snippet.trim().to_string();
    }

    let fragment = Html::parse_fragment(snippet);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PAGE: &str = r#"<html><head>
<meta property="og:title" content="[개발] 백엔드 엔지니어 - 직행">
<meta property="og:description" content="결제 플랫폼 백엔드를 개발합니다. 학사 이상">
<meta property="og:image" content="https://cdn.example.com/og.png">
<script type="application/ld+json">{"@context":"https://schema.org","@type":"Organization","name":"x"}</script>
<script type="application/ld+json">
{"@context":"https://schema.org","@graph":[{"@type":"WebPage"},{
  "@type":"JobPosting",
  "title":"백엔드 엔지니어",
  "datePosted":"2024-05-01T09:00:00+09:00",
  "validThrough":"2024-06-30",
  "employmentType":["FULL_TIME","FULL_TIME","INTERN"],
  "hiringOrganization":{"@type":"Organization","name":"직행컴퍼니"},
  "jobLocation":[
    {"@type":"Place","address":{"addressRegion":"서울","addressLocality":"강남구","streetAddress":"테헤란로 1"}},
    {"@type":"Place","address":{"addressRegion":"서울","addressLocality":"강남구"}}
  ]
}]}
</script>
</head><body></body></html>"#;

    fn entry() -> SitemapEntry {
        SitemapEntry::from_id("https://zighang.com", "abc-123")
    }

    #[test]
    fn test_read_page_meta() {
        let document = Html::parse_document(PAGE);
        let meta = read_page_meta(&document);
        assert_eq!(meta.title.as_deref(), Some("[개발] 백엔드 엔지니어 - 직행"));
        assert_eq!(meta.image.as_deref(), Some("https://cdn.example.com/og.png"));
    }

    #[test]
    fn test_find_job_posting_in_graph() {
        let document = Html::parse_document(PAGE);
        let job = find_job_posting(&document).unwrap();
        assert_eq!(job["title"], "백엔드 엔지니어");
    }

    #[test]
    fn test_find_job_posting_missing() {
        let document = Html::parse_document(
            r#"<script type="application/ld+json">{"@type":"Organization"}</script>
<script type="application/ld+json">{not json</script>"#,
        );
        assert!(find_job_posting(&document).is_none());
    }

    #[test]
    fn test_type_array_and_top_level_array() {
        let document = Html::parse_document(
            r#"<script type="application/ld+json">[{"@type":"Thing"},{"@type":["JobPosting"],"title":"t"}]</script>"#,
        );
        assert_eq!(find_job_posting(&document).unwrap()["title"], "t");
    }

    #[test]
    fn test_category_from_title() {
        assert_eq!(category_from_title("[개발] 백엔드").as_deref(), Some("개발"));
        assert_eq!(category_from_title("백엔드"), None);
        assert_eq!(category_from_title("[ ] 백엔드"), None);
    }

    #[test]
    fn test_posting_from_linked_data() {
        let document = Html::parse_document(PAGE);
        let meta = read_page_meta(&document);
        let job = find_job_posting(&document).unwrap();
        let crawled_at = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        let posting = posting_from_linked_data(&entry(), &job, &meta, "zighang", crawled_at);

        assert_eq!(posting.id, "abc-123");
        assert_eq!(posting.company_name, "직행컴퍼니");
        assert_eq!(posting.company_logo.as_deref(), Some("https://cdn.example.com/og.png"));
        assert_eq!(posting.title, "백엔드 엔지니어");
        assert_eq!(posting.regions, vec!["서울 강남구"]);
        assert_eq!(posting.location.as_deref(), Some("테헤란로 1"));
        assert_eq!(posting.employment_types, vec!["정규직", "인턴"]);
        assert_eq!(posting.depth_ones, vec!["개발"]);
        assert!(posting.depth_twos.is_empty());
        assert_eq!(posting.career_min, None);
        assert_eq!(posting.education.as_deref(), Some("학사"));
        assert_eq!(
            posting.sections.main_tasks,
            "결제 플랫폼 백엔드를 개발합니다. 학사 이상"
        );
        assert_eq!(posting.sections.raw_content, posting.sections.main_tasks);
        assert!(posting.sections.intro.is_empty());
        assert_eq!(
            posting.posted_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(posting.deadline, chrono::NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(posting.extraction, ExtractionPath::LinkedData);
    }

    #[test]
    fn test_description_fallback_strips_markup() {
        let job = serde_json::json!({
            "@type": "JobPosting",
            "title": "t",
            "description": "<p>첫 줄</p><ul><li>둘째 줄</li></ul>",
            "hiringOrganization": {"name": "c", "logo": {"url": "https://cdn.example.com/logo.png"}}
        });
        let posting =
            posting_from_linked_data(&entry(), &job, &PageMeta::default(), "zighang", Utc::now());
        assert_eq!(posting.sections.main_tasks, "첫 줄\n둘째 줄");
        assert_eq!(
            posting.company_logo.as_deref(),
            Some("https://cdn.example.com/logo.png")
        );
    }
}
