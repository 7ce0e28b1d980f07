//! SQL migration definitions for the LeadMatrix session database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: single-slot session",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Last successful scan. At most one row per slot; the app uses one slot.
CREATE TABLE IF NOT EXISTS session (
    slot       TEXT PRIMARY KEY,
    query_json TEXT NOT NULL,
    leads_json TEXT NOT NULL,
    lead_count INTEGER NOT NULL,
    saved_at   TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
