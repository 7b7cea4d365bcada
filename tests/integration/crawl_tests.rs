//! Integration tests for discovery and the crawl loop
//!
//! The orchestrator runs against a mock server and hands its batches to a
//! recording sink, so no database is involved here.

use crate::common::*;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;
use zighang_sync::crawler::{build_http_client, BatchSink, CrawlOrchestrator, DelayGovernor, SitemapWalker};
use zighang_sync::model::{CrawlProgress, ExtractionPath, RecordBatch};
use zighang_sync::state::DetailOutcome;

/// Keeps every batch and progress report it receives
#[derive(Default)]
struct RecordingSink {
    batches: Vec<RecordBatch>,
    progress: Vec<CrawlProgress>,
}

impl BatchSink for RecordingSink {
    fn on_batch(&mut self, batch: RecordBatch) -> zighang_sync::Result<()> {
        self.batches.push(batch);
        Ok(())
    }

    fn on_progress(&mut self, progress: &CrawlProgress) {
        self.progress.push(*progress);
    }
}

#[tokio::test]
async fn test_only_category_sitemaps_are_walked() {
    let server = MockServer::start().await;
    let base = server.uri();

    // company.xml is not mounted; fetching it would fail the walk
    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&base, &["/sitemaps/recruitment-1.xml", "/sitemaps/company.xml"]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemaps/recruitment-1.xml",
        url_set(&base, &[("job-1", Some("2024-05-02T10:00:00+09:00"))]),
    )
    .await;

    let config = create_test_config(&base, "unused.db");
    let walker = SitemapWalker::new(
        &config.source,
        build_http_client(&config).unwrap(),
        Arc::new(DelayGovernor::new(Duration::ZERO)),
    );

    let entries = walker.fetch_all(None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "job-1");
    assert_eq!(entries[0].url, format!("{}/recruitment/job-1", base));
    assert!(entries[0].last_modified.is_some());
}

#[tokio::test]
async fn test_ids_are_unique_across_sitemaps() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&base, &["/sitemaps/recruitment-1.xml", "/sitemaps/recruitment-2.xml"]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemaps/recruitment-1.xml",
        url_set(&base, &[("a", None), ("b", None), ("a", None)]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemaps/recruitment-2.xml",
        url_set(&base, &[("b", None), ("c", None)]),
    )
    .await;

    let config = create_test_config(&base, "unused.db");
    let walker = SitemapWalker::new(
        &config.source,
        build_http_client(&config).unwrap(),
        Arc::new(DelayGovernor::new(Duration::ZERO)),
    );

    let ids: Vec<String> = walker
        .fetch_all(None)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_missing_sitemap_aborts_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&base, &["/sitemaps/recruitment-1.xml"]),
    )
    .await;
    mount_status(&server, "/sitemaps/recruitment-1.xml", 500).await;

    let orchestrator = CrawlOrchestrator::new(&create_test_config(&base, "unused.db")).unwrap();
    let mut sink = RecordingSink::default();

    assert!(orchestrator.run(None, &mut sink).await.is_err());
    assert!(sink.batches.is_empty());
}

#[tokio::test]
async fn test_removed_posting_yields_deactivation_batch() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&base, &["/sitemaps/recruitment-1.xml"]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemaps/recruitment-1.xml",
        url_set(&base, &[("gone-1", None)]),
    )
    .await;
    mount_status(&server, "/recruitment/gone-1", 404).await;

    let orchestrator = CrawlOrchestrator::new(&create_test_config(&base, "unused.db")).unwrap();
    let mut sink = RecordingSink::default();

    let result = orchestrator.run(None, &mut sink).await.unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.deleted, 1);
    assert_eq!(sink.batches.len(), 1);
    match &sink.batches[0] {
        RecordBatch::Deactivate(tombstones) => {
            assert_eq!(tombstones.len(), 1);
            assert_eq!(tombstones[0].id, "gone-1");
            assert!(!tombstones[0].active);
        }
        other => panic!("expected a deactivation batch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mixed_crawl_batches_and_progress() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&base, &["/sitemaps/recruitment-1.xml"]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemaps/recruitment-1.xml",
        url_set(
            &base,
            &[
                ("emb-1", None),
                ("ld-1", None),
                ("gone-1", None),
                ("broken-1", None),
                ("emb-2", None),
            ],
        ),
    )
    .await;
    mount_html(
        &server,
        "/recruitment/emb-1",
        embedded_page("emb-1", "백엔드 엔지니어", Some("2099-12-31"), Some("BACHELOR")),
    )
    .await;
    mount_html(&server, "/recruitment/ld-1", linked_data_page("브랜드 디자이너")).await;
    mount_status(&server, "/recruitment/gone-1", 404).await;
    mount_html(
        &server,
        "/recruitment/broken-1",
        "<html><body>maintenance</body></html>".to_string(),
    )
    .await;
    mount_html(
        &server,
        "/recruitment/emb-2",
        embedded_page("emb-2", "데이터 엔지니어", None, None),
    )
    .await;

    let orchestrator = CrawlOrchestrator::new(&create_test_config(&base, "unused.db")).unwrap();
    let mut sink = RecordingSink::default();

    let result = orchestrator.run(None, &mut sink).await.unwrap();

    assert_eq!(result.total, 5);
    assert_eq!(result.succeeded, 3);
    assert_eq!(result.deleted, 1);
    assert_eq!(result.failed, 1);
    assert!(result.is_consistent());
    assert_eq!(result.all_source_ids.len(), 5);

    // batch size 2: [emb-1, ld-1] when full, then the final flush
    let kinds: Vec<(&str, usize)> = sink
        .batches
        .iter()
        .map(|b| match b {
            RecordBatch::Upsert(p) => ("upsert", p.len()),
            RecordBatch::Deactivate(t) => ("deactivate", t.len()),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![("upsert", 2), ("upsert", 1), ("deactivate", 1)]
    );

    let postings: Vec<_> = sink
        .batches
        .iter()
        .filter_map(|b| match b {
            RecordBatch::Upsert(p) => Some(p.iter()),
            _ => None,
        })
        .flatten()
        .collect();

    let embedded = postings.iter().find(|p| p.id == "emb-1").unwrap();
    assert_eq!(embedded.extraction, ExtractionPath::Embedded);
    assert_eq!(embedded.company_name, "직행컴퍼니");
    assert_eq!(embedded.education.as_deref(), Some("학사"));
    assert_eq!(embedded.sections.main_tasks, "주요업무\n- API 개발");
    assert_eq!(embedded.sections.preferred_points, "우대사항\n- Rust 경험");

    let fallback = postings.iter().find(|p| p.id == "ld-1").unwrap();
    assert_eq!(fallback.extraction, ExtractionPath::LinkedData);
    assert_eq!(fallback.company_name, "디자인랩");
    assert_eq!(fallback.title, "브랜드 디자이너");
    assert_eq!(fallback.depth_ones, vec!["디자인"]);
    assert_eq!(fallback.regions, vec!["경기 성남시"]);
    assert_eq!(fallback.education.as_deref(), Some("무관"));

    // progress every entry, never twice for the same count
    let processed: Vec<usize> = sink.progress.iter().map(|p| p.processed).collect();
    assert_eq!(processed, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_incremental_filter_keeps_full_id_set() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&base, &["/sitemaps/recruitment-1.xml"]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemaps/recruitment-1.xml",
        url_set(
            &base,
            &[
                ("old-1", Some("2024-01-01T00:00:00+09:00")),
                ("new-1", Some("2024-06-01T00:00:00+09:00")),
                ("undated", None),
            ],
        ),
    )
    .await;
    mount_html(
        &server,
        "/recruitment/new-1",
        embedded_page("new-1", "신규 공고", None, None),
    )
    .await;

    let orchestrator = CrawlOrchestrator::new(&create_test_config(&base, "unused.db")).unwrap();
    let mut sink = RecordingSink::default();
    let since = chrono::DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    let result = orchestrator.run(Some(since), &mut sink).await.unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.all_source_ids.len(), 3);
}

#[tokio::test]
async fn test_crawl_single_fetches_by_id() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/recruitment/emb-1",
        embedded_page("emb-1", "백엔드 엔지니어", None, None),
    )
    .await;

    let orchestrator = CrawlOrchestrator::new(&create_test_config(&base, "unused.db")).unwrap();

    match orchestrator.crawl_single("emb-1").await {
        DetailOutcome::Posting(posting) => {
            assert_eq!(posting.id, "emb-1");
            assert_eq!(posting.title, "백엔드 엔지니어");
        }
        other => panic!("expected a posting, got {:?}", other),
    }
}
