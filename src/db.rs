use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::record::{BasicInfo, ExperienceEntry, ProfileRecord};

pub const DEFAULT_DB_PATH: &str = "data/profiles.sqlite";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_visited ON pages(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            id           INTEGER PRIMARY KEY,
            page_id      INTEGER NOT NULL REFERENCES pages(id),
            url          TEXT NOT NULL,
            html         TEXT,
            status       INTEGER,
            error        TEXT,
            latency_ms   INTEGER,
            parse_error  TEXT,
            processed_at TEXT,
            scraped_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_url ON page_data(url);

        -- One row per processed profile per task
        CREATE TABLE IF NOT EXISTS li_person (
            id              INTEGER PRIMARY KEY,
            task_id         TEXT NOT NULL,
            profile_url     TEXT NOT NULL,
            name            TEXT NOT NULL,
            headline        TEXT NOT NULL,
            connections     TEXT NOT NULL,
            followers       TEXT NOT NULL,
            about           TEXT NOT NULL,
            last_activity   TEXT NOT NULL,
            job_title       TEXT NOT NULL,
            company_name    TEXT NOT NULL,
            company_link    TEXT NOT NULL,
            work_mode       TEXT NOT NULL,
            location        TEXT NOT NULL,
            total_duration  TEXT NOT NULL,
            job_type        TEXT NOT NULL,
            duration        TEXT NOT NULL,
            tenurity        TEXT NOT NULL,
            experience_json TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_person_task ON li_person(task_id);

        -- Latest state per profile
        CREATE TABLE IF NOT EXISTS li_person_master (
            profile_url     TEXT PRIMARY KEY,
            task_id         TEXT NOT NULL,
            name            TEXT NOT NULL,
            headline        TEXT NOT NULL,
            connections     TEXT NOT NULL,
            followers       TEXT NOT NULL,
            about           TEXT NOT NULL,
            last_activity   TEXT NOT NULL,
            job_title       TEXT NOT NULL,
            company_name    TEXT NOT NULL,
            company_link    TEXT NOT NULL,
            work_mode       TEXT NOT NULL,
            location        TEXT NOT NULL,
            total_duration  TEXT NOT NULL,
            job_type        TEXT NOT NULL,
            duration        TEXT NOT NULL,
            tenurity        TEXT NOT NULL,
            experience_json TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_master_company ON li_person_master(company_name);
        ",
    )?;
    Ok(())
}

// ── Fetching ──

pub fn insert_pages(conn: &Connection, urls: &[String]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO pages (url) VALUES (?1)")?;
        for url in urls {
            count += stmt.execute(rusqlite::params![url])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_unvisited(conn: &Connection, limit: Option<usize>) -> Result<Vec<(i64, String)>> {
    let sql = match limit {
        Some(n) => format!(
            "SELECT id, url FROM pages WHERE visited = 0 ORDER BY id LIMIT {}",
            n
        ),
        None => "SELECT id, url FROM pages WHERE visited = 0 ORDER BY id".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct FetchRow {
    pub page_id: i64,
    pub url: String,
    pub html: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

/// Record one fetch result and mark its page visited.
pub fn save_fetch(conn: &Connection, row: &FetchRow) -> Result<()> {
    let mut insert = conn.prepare_cached(
        "INSERT INTO page_data (page_id, url, html, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut update = conn.prepare_cached(
        "UPDATE pages SET visited = 1, visited_at = datetime('now') WHERE id = ?1",
    )?;
    insert.execute(rusqlite::params![
        row.page_id, row.url, row.html, row.status, row.error, row.latency_ms,
    ])?;
    update.execute(rusqlite::params![row.page_id])?;
    Ok(())
}

// ── Processing ──

pub struct FetchedPage {
    pub page_data_id: i64,
    pub url: String,
    pub html: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<FetchedPage>> {
    let sql = format!(
        "SELECT id, url, html
         FROM page_data
         WHERE html IS NOT NULL AND processed_at IS NULL
         ORDER BY id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FetchedPage {
                page_data_id: row.get(0)?,
                url: row.get(1)?,
                html: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Flat row for the person tables: basic info, the most recent experience
/// entry spread over columns, and the full experience list as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRow {
    pub profile_url: String,
    pub basic: BasicInfo,
    pub latest: ExperienceEntry,
    pub experience_json: String,
}

impl PersonRow {
    pub fn from_record(profile_url: &str, record: &ProfileRecord) -> Result<Self> {
        Ok(Self {
            profile_url: profile_url.to_string(),
            basic: record.basic_info.clone(),
            latest: record.experience.first().cloned().unwrap_or_default(),
            experience_json: serde_json::to_string(&record.experience)?,
        })
    }

    pub fn to_record(&self) -> Result<ProfileRecord> {
        let experience = serde_json::from_str(&self.experience_json)
            .with_context(|| format!("Bad experience_json for {}", self.profile_url))?;
        Ok(ProfileRecord {
            basic_info: self.basic.clone(),
            experience,
        })
    }
}

const PERSON_COLUMNS: &str = "task_id, profile_url, name, headline, connections, followers, about,
     last_activity, job_title, company_name, company_link, work_mode, location, total_duration,
     job_type, duration, tenurity, experience_json";

fn insert_person(stmt: &mut rusqlite::CachedStatement, task_id: &str, p: &PersonRow) -> Result<()> {
    let (b, e) = (&p.basic, &p.latest);
    stmt.execute(rusqlite::params![
        task_id, p.profile_url, b.name, b.head_line, b.connections, b.followers, b.about,
        b.last_activity, e.job_title, e.company_name, e.company_link, e.work_mode, e.location,
        e.total_duration, e.job_type, e.duration, e.tenurity, p.experience_json,
    ])?;
    Ok(())
}

/// Append every row to `li_person` under `task_id` and upsert it into
/// `li_person_master`, in one transaction.
pub fn save_people(conn: &Connection, task_id: &str, rows: &[PersonRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut log_stmt = tx.prepare_cached(&format!(
            "INSERT INTO li_person ({PERSON_COLUMNS})
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)"
        ))?;
        let mut master_stmt = tx.prepare_cached(&format!(
            "INSERT INTO li_person_master ({PERSON_COLUMNS})
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)
             ON CONFLICT(profile_url) DO UPDATE SET
                task_id = excluded.task_id,
                name = excluded.name,
                headline = excluded.headline,
                connections = excluded.connections,
                followers = excluded.followers,
                about = excluded.about,
                last_activity = excluded.last_activity,
                job_title = excluded.job_title,
                company_name = excluded.company_name,
                company_link = excluded.company_link,
                work_mode = excluded.work_mode,
                location = excluded.location,
                total_duration = excluded.total_duration,
                job_type = excluded.job_type,
                duration = excluded.duration,
                tenurity = excluded.tenurity,
                experience_json = excluded.experience_json,
                updated_at = datetime('now')"
        ))?;
        for row in rows {
            insert_person(&mut log_stmt, task_id, row)?;
            insert_person(&mut master_stmt, task_id, row)?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Close out processed pages; `error` is set for pages that failed assembly.
pub fn mark_processed(conn: &Connection, outcomes: &[(i64, Option<String>)]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "UPDATE page_data SET processed_at = datetime('now'), parse_error = ?2 WHERE id = ?1",
        )?;
        for (id, error) in outcomes {
            stmt.execute(rusqlite::params![id, error])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn fetch_people(conn: &Connection) -> Result<Vec<PersonRow>> {
    let mut stmt = conn.prepare(
        "SELECT profile_url, name, headline, connections, followers, about, last_activity,
                job_title, company_name, company_link, work_mode, location, total_duration,
                job_type, duration, tenurity, experience_json
         FROM li_person_master
         ORDER BY profile_url",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PersonRow {
                profile_url: row.get(0)?,
                basic: BasicInfo {
                    name: row.get(1)?,
                    head_line: row.get(2)?,
                    connections: row.get(3)?,
                    followers: row.get(4)?,
                    about: row.get(5)?,
                    last_activity: row.get(6)?,
                },
                latest: ExperienceEntry {
                    job_title: row.get(7)?,
                    company_name: row.get(8)?,
                    company_link: row.get(9)?,
                    work_mode: row.get(10)?,
                    location: row.get(11)?,
                    total_duration: row.get(12)?,
                    job_type: row.get(13)?,
                    duration: row.get(14)?,
                    tenurity: row.get(15)?,
                },
                experience_json: row.get(16)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Overview ──

pub struct OverviewRow {
    pub name: String,
    pub headline: String,
    pub job_title: String,
    pub company_name: String,
    pub location: String,
    pub roles: usize,
    pub updated_at: String,
}

pub fn fetch_overview(
    conn: &Connection,
    company: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let (where_clause, params): (&str, Vec<String>) = match company {
        Some(c) => (" WHERE company_name LIKE ?1", vec![format!("%{}%", c)]),
        None => ("", Vec::new()),
    };
    let sql = format!(
        "SELECT name, headline, job_title, company_name, location,
                json_array_length(experience_json), updated_at
         FROM li_person_master{}
         ORDER BY updated_at DESC, name
         LIMIT {}",
        where_clause, limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(OverviewRow {
                name: row.get(0)?,
                headline: row.get(1)?,
                job_title: row.get(2)?,
                company_name: row.get(3)?,
                location: row.get(4)?,
                roles: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub fetched: usize,
    pub errors: usize,
    pub processed: usize,
    pub failed: usize,
    pub people: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    let total = count("SELECT COUNT(*) FROM pages")?;
    let visited = count("SELECT COUNT(*) FROM pages WHERE visited = 1")?;
    Ok(Stats {
        total,
        visited,
        unvisited: total - visited,
        fetched: count("SELECT COUNT(*) FROM page_data")?,
        errors: count("SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL")?,
        processed: count("SELECT COUNT(*) FROM page_data WHERE processed_at IS NOT NULL")?,
        failed: count("SELECT COUNT(*) FROM page_data WHERE parse_error IS NOT NULL")?,
        people: count("SELECT COUNT(*) FROM li_person_master")?,
    })
}

// ── Tests ──
