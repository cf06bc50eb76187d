//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: cards and review event log",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Session records",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "Card versioning for optimistic concurrency, composite indexes",
        up: MIGRATION_V3_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    course_id TEXT NOT NULL DEFAULT '',
    lesson_id TEXT NOT NULL DEFAULT '',
    step_index INTEGER NOT NULL DEFAULT 0,

    front TEXT NOT NULL,
    content TEXT NOT NULL,                     -- JSON: tagged exercise payload
    card_kind TEXT NOT NULL DEFAULT 'flashcard',
    concept_ids TEXT NOT NULL DEFAULT '[]',    -- JSON array of concept ids

    -- Memory model state
    stability REAL NOT NULL DEFAULT 1.0,
    difficulty REAL NOT NULL DEFAULT 0.3,
    scheduled_days INTEGER NOT NULL DEFAULT 0,
    reps INTEGER NOT NULL DEFAULT 0,
    lapses INTEGER NOT NULL DEFAULT 0,
    state TEXT NOT NULL DEFAULT 'new',         -- 'new', 'learning', 'review', 'relearning'

    due_at TEXT NOT NULL,
    last_reviewed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_owner_due ON cards(owner_id, due_at);
CREATE INDEX IF NOT EXISTS idx_cards_owner_state ON cards(owner_id, state);

-- Append-only log, one row per submitted review
CREATE TABLE IF NOT EXISTS review_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    card_id TEXT NOT NULL REFERENCES cards(id),
    rating INTEGER NOT NULL,                   -- 1=again, 2=hard, 3=good, 4=easy
    reviewed_at TEXT NOT NULL,
    duration_ms INTEGER
);

CREATE INDEX IF NOT EXISTS idx_events_card ON review_events(card_id);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Session records
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    session_type TEXT NOT NULL DEFAULT 'daily',     -- 'daily', 'targeted', 'gap_fix', 'custom'
    status TEXT NOT NULL DEFAULT 'in_progress',     -- 'in_progress', 'completed', 'abandoned'

    -- Pool counts fixed at composition time
    card_total INTEGER NOT NULL DEFAULT 0,
    due_count INTEGER NOT NULL DEFAULT 0,
    gap_count INTEGER NOT NULL DEFAULT 0,
    reinforcement_count INTEGER NOT NULL DEFAULT 0,
    new_count INTEGER NOT NULL DEFAULT 0,

    -- Progress counters
    completed_cards INTEGER NOT NULL DEFAULT 0,
    correct_cards INTEGER NOT NULL DEFAULT 0,

    target_concepts TEXT NOT NULL DEFAULT '[]',     -- JSON array of concept ids
    gaps_addressed TEXT NOT NULL DEFAULT '[]',      -- JSON array of concept ids

    started_at TEXT NOT NULL,
    ended_at TEXT,
    duration_ms INTEGER
);

CREATE INDEX IF NOT EXISTS idx_sessions_owner_started ON sessions(owner_id, started_at);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// V3: Optimistic concurrency for card updates
/// Review submissions guard on the version column so concurrent writers
/// cannot silently overwrite each other's scheduling state.
const MIGRATION_V3_UP: &str = r#"
ALTER TABLE cards ADD COLUMN version INTEGER NOT NULL DEFAULT 1;

CREATE INDEX IF NOT EXISTS idx_cards_owner_state_due ON cards(owner_id, state, due_at);
CREATE INDEX IF NOT EXISTS idx_sessions_owner_status ON sessions(owner_id, status);

UPDATE schema_version SET version = 3, applied_at = datetime('now');
"#;

/// Get current schema version
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // execute_batch handles the multi-statement SQL
            conn.execute_batch(migration.up)?;

            applied += 1;
        }
    }

    Ok(applied)
}
