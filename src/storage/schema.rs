//! Database schema definitions
//!
//! The tables mirror a property graph: `pages` holds `Page` nodes keyed by
//! URL and `links_to` holds `LINKS_TO` relationships keyed by the ordered
//! pair of URLs.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Page nodes
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    title TEXT,
    content TEXT,
    level INTEGER,
    last_scanned_at TEXT,
    error INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_pages_level ON pages(level);

-- LINKS_TO relationships
CREATE TABLE IF NOT EXISTS links_to (
    source_url TEXT NOT NULL REFERENCES pages(url) ON DELETE CASCADE,
    target_url TEXT NOT NULL REFERENCES pages(url) ON DELETE CASCADE,
    PRIMARY KEY (source_url, target_url)
);

CREATE INDEX IF NOT EXISTS idx_links_to_target ON links_to(target_url);

-- Crawl run history
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed_url TEXT NOT NULL,
    max_depth INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    nodes_scanned INTEGER NOT NULL DEFAULT 0,
    config_hash TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
