//! Integration tests for the sync driver
//!
//! Each test runs against a mock server and a SQLite file in a temporary
//! directory, then inspects the stored postings and run records.

use crate::common::*;
use std::io::Write;
use tempfile::TempDir;
use wiremock::MockServer;
use zighang_sync::config::load_config_with_hash;
use zighang_sync::crawler::{run_sync, run_sync_with_store};
use zighang_sync::storage::{open_storage, PostingStore, RunMode, RunStatus, SqliteStorage};

fn temp_store(dir: &TempDir) -> (String, SqliteStorage) {
    let db_path = dir.path().join("zighang.db");
    let store = open_storage(&db_path).expect("Failed to open database");
    (db_path.to_string_lossy().to_string(), store)
}

async fn mount_single_sitemap(server: &MockServer, entries: &[(&str, Option<&str>)]) {
    let base = server.uri();
    mount_xml(
        server,
        "/sitemap.xml",
        sitemap_index(&base, &["/sitemaps/recruitment-1.xml"]),
    )
    .await;
    mount_xml(server, "/sitemaps/recruitment-1.xml", url_set(&base, entries)).await;
}

#[tokio::test]
async fn test_full_sync_from_config_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // State left behind by an earlier sync
    let (db_path, mut store) = temp_store(&dir);
    store
        .upsert_postings(&[stored_posting("stale-1", None), stored_posting("gone-1", None)])
        .unwrap();
    drop(store);

    mount_single_sitemap(&server, &[("emb-1", None), ("ld-1", None), ("gone-1", None)]).await;
    mount_html(
        &server,
        "/recruitment/emb-1",
        embedded_page("emb-1", "백엔드 엔지니어", Some("2020-01-01"), Some("BACHELOR")),
    )
    .await;
    mount_html(&server, "/recruitment/ld-1", linked_data_page("브랜드 디자이너")).await;
    mount_status(&server, "/recruitment/gone-1", 404).await;

    let config_path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"
[source]
base-url = "{}"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[crawler]
request-delay-ms = 0

[output]
database-path = "{}"
"#,
        server.uri(),
        db_path
    )
    .unwrap();
    drop(file);

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    let report = run_sync(&config, &hash, RunMode::Full).await.unwrap();

    let crawl = report.crawl.unwrap();
    assert_eq!(crawl.total, 3);
    assert_eq!(crawl.succeeded, 2);
    assert_eq!(crawl.deleted, 1);
    assert_eq!(crawl.failed, 0);

    let reconcile = report.reconcile.unwrap();
    assert_eq!(reconcile.missing, 1);
    assert_eq!(reconcile.expired, 1);

    let store = open_storage(std::path::Path::new(&db_path)).unwrap();
    assert!(store.get_posting("ld-1").unwrap().unwrap().is_active);
    assert!(!store.get_posting("emb-1").unwrap().unwrap().is_active);
    assert!(!store.get_posting("gone-1").unwrap().unwrap().is_active);
    assert!(!store.get_posting("stale-1").unwrap().unwrap().is_active);

    let run = store.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.mode, RunMode::Full);
    assert_eq!(run.config_hash, hash);
    assert_eq!(run.stats.deleted, 1);
    assert_eq!(run.stats.deactivated, 2);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_incremental_sync_fetches_only_newer_entries() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (db_path, mut store) = temp_store(&dir);
    let config = create_test_config(&server.uri(), &db_path);

    mount_single_sitemap(
        &server,
        &[
            ("old-1", Some("2020-01-01T00:00:00+09:00")),
            ("new-1", Some("2099-01-01T00:00:00+09:00")),
        ],
    )
    .await;
    mount_html(
        &server,
        "/recruitment/old-1",
        embedded_page("old-1", "기존 공고", None, None),
    )
    .await;
    mount_html(
        &server,
        "/recruitment/new-1",
        embedded_page("new-1", "신규 공고", None, None),
    )
    .await;

    // Without a completed crawl on record, incremental fetches everything
    let first = run_sync_with_store(&mut store, &config, "hash", RunMode::Incremental)
        .await
        .unwrap();
    assert_eq!(first.crawl.unwrap().total, 2);
    assert!(store.last_successful_crawl().unwrap().is_some());

    let second = run_sync_with_store(&mut store, &config, "hash", RunMode::Incremental)
        .await
        .unwrap();
    let crawl = second.crawl.unwrap();
    assert_eq!(crawl.total, 1);
    assert_eq!(crawl.all_source_ids.len(), 2);
    assert_eq!(second.reconcile.unwrap().missing, 0);

    // Skipped by the filter but still listed, so still active
    assert!(store.get_posting("old-1").unwrap().unwrap().is_active);
    assert_eq!(store.recent_runs(10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_recrawl_keeps_known_education() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (db_path, mut store) = temp_store(&dir);
    let config = create_test_config(&server.uri(), &db_path);

    store
        .upsert_postings(&[stored_posting("emb-1", Some("박사"))])
        .unwrap();

    mount_single_sitemap(&server, &[("emb-1", None)]).await;
    mount_html(
        &server,
        "/recruitment/emb-1",
        embedded_page("emb-1", "새 제목", None, None),
    )
    .await;

    run_sync_with_store(&mut store, &config, "hash", RunMode::Full)
        .await
        .unwrap();

    let posting = store.get_posting("emb-1").unwrap().unwrap();
    assert_eq!(posting.title, "새 제목");
    assert_eq!(posting.education.as_deref(), Some("박사"));
    assert!(posting.is_active);
}

#[tokio::test]
async fn test_failed_sync_is_recorded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (db_path, mut store) = temp_store(&dir);
    let config = create_test_config(&server.uri(), &db_path);

    store.upsert_postings(&[stored_posting("keep-1", None)]).unwrap();
    mount_status(&server, "/sitemap.xml", 503).await;

    let result = run_sync_with_store(&mut store, &config, "hash", RunMode::Full).await;
    assert!(result.is_err());

    let runs = store.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].error_message.as_deref().unwrap().contains("503"));

    // A failed discovery never deactivates anything
    assert!(store.get_posting("keep-1").unwrap().unwrap().is_active);
    assert!(store.last_successful_crawl().unwrap().is_none());
}

#[tokio::test]
async fn test_education_backfill() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (db_path, mut store) = temp_store(&dir);
    let config = create_test_config(&server.uri(), &db_path);

    store
        .upsert_postings(&[
            stored_posting("needs-1", None),
            stored_posting("plain-1", None),
            stored_posting("gone-1", None),
            stored_posting("has-1", Some("학사")),
        ])
        .unwrap();

    mount_html(
        &server,
        "/recruitment/needs-1",
        embedded_page("needs-1", "연구원", None, Some("MASTER")),
    )
    .await;
    mount_html(
        &server,
        "/recruitment/plain-1",
        embedded_page("plain-1", "매니저", None, None),
    )
    .await;
    mount_status(&server, "/recruitment/gone-1", 404).await;

    let report = run_sync_with_store(&mut store, &config, "hash", RunMode::Backfill)
        .await
        .unwrap();

    assert!(report.crawl.is_none());
    let backfill = report.backfill.unwrap();
    assert_eq!(backfill.candidates, 3);
    assert_eq!(backfill.updated, 1);
    assert_eq!(backfill.unchanged, 1);
    assert_eq!(backfill.deactivated, 1);
    assert_eq!(backfill.failed, 0);

    assert_eq!(
        store.get_posting("needs-1").unwrap().unwrap().education.as_deref(),
        Some("석사")
    );
    assert!(!store.get_posting("gone-1").unwrap().unwrap().is_active);
    assert!(store.ids_missing_education().unwrap() == vec!["plain-1".to_string()]);

    let run = store.get_run(report.run_id).unwrap();
    assert_eq!(run.mode, RunMode::Backfill);
    assert_eq!(run.status, RunStatus::Completed);

    // A backfill is not a crawl
    assert!(store.last_successful_crawl().unwrap().is_none());
}
