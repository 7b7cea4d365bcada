//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PostingStore trait.

use crate::model::{DetailSections, ExtractionPath, JobPosting};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PostingStore, StorageError, StorageResult};
use crate::storage::{PostingCounts, RunMode, RunRecord, RunStats, RunStatus};
use crate::SyncError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

const RUN_COLUMNS: &str = "id, started_at, finished_at, mode, config_hash, status,
     total, succeeded, failed, deleted, deactivated, error_message";

const POSTING_COLUMNS: &str = "id, source, url, company_name, company_logo, title,
     regions, location, career_min, career_max, employment_types, depth_ones, depth_twos,
     keywords, view_count, intro, main_tasks, requirements, preferred_points, benefits,
     work_conditions, raw_content, education, posted_at, last_modified, deadline,
     deadline_type, crawled_at, extraction, is_active";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, SyncError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn to_json(values: &[String]) -> StorageResult<String> {
    serde_json::to_string(values).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_json(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn parse_datetime(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        mode: RunMode::from_db_string(&row.get::<_, String>(3)?).unwrap_or(RunMode::Full),
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        stats: RunStats {
            total: row.get::<_, i64>(6)?.max(0) as u64,
            succeeded: row.get::<_, i64>(7)?.max(0) as u64,
            failed: row.get::<_, i64>(8)?.max(0) as u64,
            deleted: row.get::<_, i64>(9)?.max(0) as u64,
            deactivated: row.get::<_, i64>(10)?.max(0) as u64,
        },
        error_message: row.get(11)?,
    })
}

fn row_to_posting(row: &Row<'_>) -> rusqlite::Result<JobPosting> {
    Ok(JobPosting {
        id: row.get(0)?,
        source: row.get(1)?,
        url: row.get(2)?,
        company_name: row.get(3)?,
        company_logo: row.get(4)?,
        title: row.get(5)?,
        regions: from_json(&row.get::<_, String>(6)?),
        location: row.get(7)?,
        career_min: row.get(8)?,
        career_max: row.get(9)?,
        employment_types: from_json(&row.get::<_, String>(10)?),
        depth_ones: from_json(&row.get::<_, String>(11)?),
        depth_twos: from_json(&row.get::<_, String>(12)?),
        keywords: from_json(&row.get::<_, String>(13)?),
        view_count: row.get::<_, Option<i64>>(14)?.map(|v| v.max(0) as u64),
        sections: DetailSections {
            intro: row.get(15)?,
            main_tasks: row.get(16)?,
            requirements: row.get(17)?,
            preferred_points: row.get(18)?,
            benefits: row.get(19)?,
            work_conditions: row.get(20)?,
            raw_content: row.get(21)?,
        },
        education: row.get(22)?,
        posted_at: parse_datetime(row.get(23)?),
        last_modified: parse_datetime(row.get(24)?),
        deadline: row
            .get::<_, Option<String>>(25)?
            .and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        deadline_type: row.get(26)?,
        crawled_at: parse_datetime(row.get(27)?).unwrap_or_default(),
        extraction: ExtractionPath::from_db_string(&row.get::<_, String>(28)?)
            .unwrap_or(ExtractionPath::Embedded),
        is_active: row.get::<_, i64>(29)? != 0,
    })
}

impl PostingStore for SqliteStorage {
    // ===== Run Management =====

    fn begin_run(&mut self, mode: RunMode, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, mode, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                mode.to_db_string(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, stats: &RunStats) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, total = ?3, succeeded = ?4,
             failed = ?5, deleted = ?6, deactivated = ?7 WHERE id = ?8",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                stats.total as i64,
                stats.succeeded as i64,
                stats.failed as i64,
                stats.deleted as i64,
                stats.deactivated as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], row_to_run)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT ?1", RUN_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![limit as i64], row_to_run)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    fn last_successful_crawl(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let started_at: Option<String> = self
            .conn
            .query_row(
                "SELECT started_at FROM runs
                 WHERE status = ?1 AND mode IN (?2, ?3)
                 ORDER BY id DESC LIMIT 1",
                params![
                    RunStatus::Completed.to_db_string(),
                    RunMode::Full.to_db_string(),
                    RunMode::Incremental.to_db_string()
                ],
                |row| row.get(0),
            )
            .optional()?;

        Ok(parse_datetime(started_at))
    }

    // ===== Postings =====

    fn upsert_postings(&mut self, postings: &[JobPosting]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO postings (
                    id, source, url, company_name, company_logo, title, regions, location,
                    career_min, career_max, employment_types, depth_ones, depth_twos, keywords,
                    view_count, intro, main_tasks, requirements, preferred_points, benefits,
                    work_conditions, raw_content, education, posted_at, last_modified, deadline,
                    deadline_type, crawled_at, extraction, is_active, first_seen_at, deactivated_at
                 ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, 1, ?30, NULL
                 )
                 ON CONFLICT(id) DO UPDATE SET
                    source = excluded.source,
                    url = excluded.url,
                    company_name = excluded.company_name,
                    company_logo = excluded.company_logo,
                    title = excluded.title,
                    regions = excluded.regions,
                    location = excluded.location,
                    career_min = excluded.career_min,
                    career_max = excluded.career_max,
                    employment_types = excluded.employment_types,
                    depth_ones = excluded.depth_ones,
                    depth_twos = excluded.depth_twos,
                    keywords = excluded.keywords,
                    view_count = excluded.view_count,
                    intro = excluded.intro,
                    main_tasks = excluded.main_tasks,
                    requirements = excluded.requirements,
                    preferred_points = excluded.preferred_points,
                    benefits = excluded.benefits,
                    work_conditions = excluded.work_conditions,
                    raw_content = excluded.raw_content,
                    education = COALESCE(excluded.education, postings.education),
                    posted_at = excluded.posted_at,
                    last_modified = excluded.last_modified,
                    deadline = excluded.deadline,
                    deadline_type = excluded.deadline_type,
                    crawled_at = excluded.crawled_at,
                    extraction = excluded.extraction,
                    is_active = 1,
                    deactivated_at = NULL",
            )?;

            for posting in postings {
                stmt.execute(params![
                    posting.id,
                    posting.source,
                    posting.url,
                    posting.company_name,
                    posting.company_logo,
                    posting.title,
                    to_json(&posting.regions)?,
                    posting.location,
                    posting.career_min,
                    posting.career_max,
                    to_json(&posting.employment_types)?,
                    to_json(&posting.depth_ones)?,
                    to_json(&posting.depth_twos)?,
                    to_json(&posting.keywords)?,
                    posting.view_count.map(|v| v.min(i64::MAX as u64) as i64),
                    posting.sections.intro,
                    posting.sections.main_tasks,
                    posting.sections.requirements,
                    posting.sections.preferred_points,
                    posting.sections.benefits,
                    posting.sections.work_conditions,
                    posting.sections.raw_content,
                    posting.education,
                    posting.posted_at.map(|t| t.to_rfc3339()),
                    posting.last_modified.map(|t| t.to_rfc3339()),
                    posting.deadline.map(|d| d.format(DATE_FORMAT).to_string()),
                    posting.deadline_type,
                    posting.crawled_at.to_rfc3339(),
                    posting.extraction.to_db_string(),
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(postings.len())
    }

    fn deactivate_ids(&mut self, ids: &[String]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE postings SET is_active = 0, deactivated_at = ?1
                 WHERE id = ?2 AND is_active = 1",
            )?;
            for id in ids {
                changed += stmt.execute(params![now, id])?;
            }
        }
        tx.commit()?;

        Ok(changed)
    }

    fn deactivate_missing(&mut self, live_ids: &HashSet<String>) -> StorageResult<usize> {
        let missing: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id FROM postings WHERE is_active = 1")?;
            let active = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            active
                .into_iter()
                .filter(|id| !live_ids.contains(id))
                .collect()
        };

        self.deactivate_ids(&missing)
    }

    fn deactivate_expired(&mut self, today: NaiveDate) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE postings SET is_active = 0, deactivated_at = ?1
             WHERE is_active = 1 AND deadline IS NOT NULL AND deadline < ?2",
            params![now, today.format(DATE_FORMAT).to_string()],
        )?;
        Ok(changed)
    }

    fn get_posting(&self, id: &str) -> StorageResult<Option<JobPosting>> {
        let sql = format!("SELECT {} FROM postings WHERE id = ?1", POSTING_COLUMNS);
        let posting = self
            .conn
            .query_row(&sql, params![id], row_to_posting)
            .optional()?;
        Ok(posting)
    }

    // ===== Backfill =====

    fn ids_missing_education(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM postings
             WHERE is_active = 1 AND (education IS NULL OR TRIM(education) = '')
             ORDER BY id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn update_education(&mut self, id: &str, education: &str) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE postings SET education = ?1 WHERE id = ?2",
            params![education, id],
        )?;
        Ok(changed > 0)
    }

    // ===== Statistics =====

    fn count_postings(&self) -> StorageResult<PostingCounts> {
        let counts = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_active), 0),
                    COALESCE(SUM(CASE WHEN is_active = 1
                        AND (education IS NULL OR TRIM(education) = '') THEN 1 ELSE 0 END), 0)
             FROM postings",
            [],
            |row| {
                Ok(PostingCounts {
                    total: row.get::<_, i64>(0)?.max(0) as u64,
                    active: row.get::<_, i64>(1)?.max(0) as u64,
                    missing_education: row.get::<_, i64>(2)?.max(0) as u64,
                })
            },
        )?;
        Ok(counts)
    }

    fn count_by_extraction(&self) -> StorageResult<Vec<(ExtractionPath, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT extraction, COUNT(*) FROM postings WHERE is_active = 1
             GROUP BY extraction ORDER BY extraction",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(path, count)| {
                ExtractionPath::from_db_string(&path).map(|p| (p, count.max(0) as u64))
            })
            .collect())
    }

    fn top_categories(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category.value, COUNT(*) AS n
             FROM postings, json_each(postings.depth_ones) AS category
             WHERE postings.is_active = 1
             GROUP BY category.value
             ORDER BY n DESC, category.value
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
