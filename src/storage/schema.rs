//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Zighang-Sync database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track sync runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    mode TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    total INTEGER NOT NULL DEFAULT 0,
    succeeded INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0,
    deactivated INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

-- Canonical postings; list fields are JSON arrays
CREATE TABLE IF NOT EXISTS postings (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    url TEXT NOT NULL,
    company_name TEXT NOT NULL,
    company_logo TEXT,
    title TEXT NOT NULL,
    regions TEXT NOT NULL DEFAULT '[]',
    location TEXT,
    career_min INTEGER,
    career_max INTEGER,
    employment_types TEXT NOT NULL DEFAULT '[]',
    depth_ones TEXT NOT NULL DEFAULT '[]',
    depth_twos TEXT NOT NULL DEFAULT '[]',
    keywords TEXT NOT NULL DEFAULT '[]',
    view_count INTEGER,
    intro TEXT NOT NULL DEFAULT '',
    main_tasks TEXT NOT NULL DEFAULT '',
    requirements TEXT NOT NULL DEFAULT '',
    preferred_points TEXT NOT NULL DEFAULT '',
    benefits TEXT NOT NULL DEFAULT '',
    work_conditions TEXT NOT NULL DEFAULT '',
    raw_content TEXT NOT NULL DEFAULT '',
    education TEXT,
    posted_at TEXT,
    last_modified TEXT,
    deadline TEXT,
    deadline_type TEXT,
    crawled_at TEXT NOT NULL,
    extraction TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    first_seen_at TEXT NOT NULL,
    deactivated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_postings_active ON postings(is_active);
CREATE INDEX IF NOT EXISTS idx_postings_deadline ON postings(deadline);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
