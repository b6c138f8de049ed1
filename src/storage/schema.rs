//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Starwatch database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track batch runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    processed_count INTEGER NOT NULL DEFAULT 0,
    saved_count INTEGER NOT NULL DEFAULT 0,
    total_count INTEGER NOT NULL DEFAULT 0
);

-- Tracked fictions, keyed by the site's fiction id
CREATE TABLE IF NOT EXISTS fictions (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    author_name TEXT NOT NULL DEFAULT '',
    author_id INTEGER NOT NULL DEFAULT 0,
    author_avatar TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    image TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    fiction_type TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',
    warnings TEXT NOT NULL DEFAULT '[]',
    first_seen_at TEXT NOT NULL,
    last_scraped_at TEXT
);

-- Append-only detail metrics, one row per successful fiction fetch
CREATE TABLE IF NOT EXISTS fiction_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fiction_id INTEGER NOT NULL REFERENCES fictions(id),
    captured_at TEXT NOT NULL,
    pages INTEGER NOT NULL,
    ratings INTEGER NOT NULL,
    followers INTEGER NOT NULL,
    favorites INTEGER NOT NULL,
    views INTEGER NOT NULL,
    total_views INTEGER NOT NULL,
    average_views INTEGER NOT NULL,
    overall_score REAL NOT NULL,
    style_score REAL NOT NULL,
    story_score REAL NOT NULL,
    grammar_score REAL NOT NULL,
    character_score REAL NOT NULL,
    score REAL NOT NULL,
    UNIQUE(fiction_id, captured_at)
);

CREATE INDEX IF NOT EXISTS idx_history_fiction ON fiction_history(fiction_id, captured_at);

-- Append-only Rising Stars positions
CREATE TABLE IF NOT EXISTS rank_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fiction_id INTEGER NOT NULL REFERENCES fictions(id),
    genre TEXT NOT NULL,
    position INTEGER NOT NULL,
    captured_at TEXT NOT NULL,
    UNIQUE(fiction_id, genre, captured_at)
);

CREATE INDEX IF NOT EXISTS idx_snapshots_genre ON rank_snapshots(genre, captured_at);

-- Outcome of every fetch, used to space out retries
CREATE TABLE IF NOT EXISTS scrape_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target TEXT NOT NULL,
    key TEXT NOT NULL,
    state TEXT NOT NULL,
    status_code INTEGER,
    error_message TEXT,
    attempted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attempts_key ON scrape_attempts(target, key, attempted_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
