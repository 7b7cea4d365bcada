//! Integration tests for the sync pipeline
//!
//! These tests use wiremock to serve sitemaps and detail pages and run the
//! crawl, reconciliation and backfill against a temporary SQLite database.

mod common;
mod crawl_tests;
mod sync_tests;
