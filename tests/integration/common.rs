//! Shared fixtures for the integration tests

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zighang_sync::config::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};
use zighang_sync::extract::escape_fragment;
use zighang_sync::model::{DetailSections, ExtractionPath, JobPosting};

/// Creates a test configuration pointing at a mock server
pub fn create_test_config(base_url: &str, db_path: &str) -> Config {
    Config {
        source: SourceConfig {
            base_url: base_url.to_string(),
            sitemap_index_path: "/sitemap.xml".to_string(),
            category_marker: "recruitment".to_string(),
            embedded_anchor_key: "employeeTypes".to_string(),
            source_tag: "zighang".to_string(),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            backfill_delay_ms: 0,
            batch_size: 2,
            progress_every: 1,
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

/// Sitemap index listing `{base}{path}` for each path
pub fn sitemap_index(base_url: &str, paths: &[&str]) -> String {
    let items: String = paths
        .iter()
        .map(|p| format!("<sitemap><loc>{}{}</loc></sitemap>", base_url, p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        items
    )
}

/// Category sitemap with posting ids and optional lastmod values
pub fn url_set(base_url: &str, entries: &[(&str, Option<&str>)]) -> String {
    let items: String = entries
        .iter()
        .map(|(id, lastmod)| match lastmod {
            Some(lastmod) => format!(
                "<url><loc>{}/recruitment/{}</loc><lastmod>{}</lastmod></url>",
                base_url, id, lastmod
            ),
            None => format!("<url><loc>{}/recruitment/{}</loc></url>", base_url, id),
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        items
    )
}

/// Detail page whose posting lives in the streamed payload, split over two pushes
pub fn embedded_page(id: &str, title: &str, end_date: Option<&str>, education: Option<&str>) -> String {
    let object = json!({
        "id": id,
        "title": title,
        "companyName": "직행컴퍼니",
        "employeeTypes": ["FULL_TIME"],
        "regions": ["서울 강남구"],
        "depthOnes": ["개발"],
        "depthTwos": ["백엔드"],
        "educations": education.map(|e| vec![e]).unwrap_or_default(),
        "deadlineType": "DATE",
        "endDate": end_date,
        "content": "주요업무\n- API 개발\n우대사항\n- Rust 경험"
    });
    let payload = format!("0:[\"$\",\"div\"]\n7:{{\"recruitment\":{}}}\n", object);

    let mid = payload.find("\"title\"").unwrap_or(payload.len() / 2);
    format!(
        "<html><head><title>{}</title></head><body>\
<script>self.__next_f.push([1,\"{}\"])</script>\
<script>self.__next_f.push([1,\"{}\"])</script></body></html>",
        title,
        escape_fragment(&payload[..mid]),
        escape_fragment(&payload[mid..])
    )
}

/// Detail page with only linked data and preview meta tags
pub fn linked_data_page(title: &str) -> String {
    format!(
        r#"<html><head>
<meta property="og:title" content="[디자인] {title}">
<meta property="og:description" content="브랜드 디자인을 담당합니다. 학력무관">
<script type="application/ld+json">{{
  "@context":"https://schema.org",
  "@type":"JobPosting",
  "title":"{title}",
  "datePosted":"2024-05-01",
  "employmentType":"INTERN",
  "hiringOrganization":{{"@type":"Organization","name":"디자인랩"}},
  "jobLocation":{{"@type":"Place","address":{{"addressRegion":"경기","addressLocality":"성남시"}}}}
}}</script>
</head><body></body></html>"#
    )
}

/// A stored posting as a previous sync would have written it
pub fn stored_posting(id: &str, education: Option<&str>) -> JobPosting {
    JobPosting {
        id: id.to_string(),
        source: "zighang".to_string(),
        url: format!("https://zighang.com/recruitment/{}", id),
        company_name: "직행컴퍼니".to_string(),
        company_logo: None,
        title: "기존 공고".to_string(),
        regions: vec![],
        location: None,
        career_min: None,
        career_max: None,
        employment_types: vec![],
        depth_ones: vec!["개발".to_string()],
        depth_twos: vec![],
        keywords: vec![],
        view_count: None,
        sections: DetailSections::default(),
        education: education.map(str::to_string),
        posted_at: None,
        last_modified: None,
        deadline: None,
        deadline_type: None,
        crawled_at: Utc::now(),
        extraction: ExtractionPath::Embedded,
        is_active: true,
    }
}

pub async fn mount_body(server: &MockServer, at: &str, body: String, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", content_type),
        )
        .mount(server)
        .await;
}

pub async fn mount_xml(server: &MockServer, at: &str, body: String) {
    mount_body(server, at, body, "application/xml").await;
}

pub async fn mount_html(server: &MockServer, at: &str, body: String) {
    mount_body(server, at, body, "text/html; charset=utf-8").await;
}

pub async fn mount_status(server: &MockServer, at: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
