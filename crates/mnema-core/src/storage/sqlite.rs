//! SQLite Storage Implementation
//!
//! Card store, append-only review event log, and session records behind a
//! reader/writer connection pair. All methods take `&self`, so a host can
//! share one `Arc<Storage>` across threads; review submissions additionally
//! guard on the card version column so concurrent writers cannot overwrite
//! each other's scheduling state.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::card::{CardContent, DeckStats, NewCardInput, ReviewCard};
use crate::oracle::OracleError;
use crate::scheduler::{
    LearningState, Rating, ReviewPreview, ReviewScheduler, SchedulerParameters,
};
use crate::session::{SessionRecord, SessionStats, SessionStatus, SessionType};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Card or session not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Concurrent modification detected
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Rating outside the 1..=4 scale
    #[error("Invalid rating {0}: expected 1 (again) through 4 (easy)")]
    InvalidRating(i32),
    /// Mastery signal provider failed
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// RESULT RECORDS
// ============================================================================

/// What a submitted review did to a card
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    /// The card after the transition
    pub card: ReviewCard,
    /// Lifecycle state the card held before this review
    pub previous_state: LearningState,
    /// When the card comes up next
    pub next_due_at: DateTime<Utc>,
    /// Day-level interval scheduled by this review, 0 while stepping in minutes
    pub scheduled_days: i64,
}

/// One row of the append-only review log
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEventRecord {
    pub id: i64,
    pub card_id: String,
    pub rating: i32,
    pub reviewed_at: DateTime<Utc>,
    pub duration_ms: Option<i64>,
}

// ============================================================================
// STORAGE
// ============================================================================

/// Main storage struct
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self` (not `&mut self`), making Storage `Send + Sync`
/// so a host can use `Arc<Storage>` instead of `Arc<Mutex<Storage>>`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    scheduler: ReviewScheduler,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("MNEMA_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        // Configure SQLite for performance
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA mmap_size = 268435456;
             PRAGMA journal_size_limit = 67108864;
             PRAGMA optimize = 0x10002;",
        )?;

        Ok(())
    }

    /// Create new storage instance with default scheduler parameters
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_parameters(db_path, SchedulerParameters::default())
    }

    /// Create new storage instance with explicit scheduler parameters
    pub fn with_parameters(db_path: Option<PathBuf>, params: SchedulerParameters) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "mnema", "core").ok_or_else(|| {
                    StorageError::Init("Could not determine project directories".to_string())
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("mnema.db")
            }
        };

        // Open writer connection
        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        // Open reader connection to same path
        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            scheduler: ReviewScheduler::with_parameters(params),
        })
    }

    /// The review transition engine this store schedules with
    pub fn scheduler(&self) -> &ReviewScheduler {
        &self.scheduler
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Create a card seeded with unreviewed scheduling state, due immediately
    pub fn create_card(&self, input: NewCardInput) -> Result<ReviewCard> {
        let now = Utc::now();
        let card = ReviewCard::from_input(input, &self.scheduler.new_card(), now);

        let content_json =
            serde_json::to_string(&card.content).unwrap_or_else(|_| "{}".to_string());
        let concepts_json =
            serde_json::to_string(&card.concept_ids).unwrap_or_else(|_| "[]".to_string());

        {
            let writer = self
                .writer
                .lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            writer.execute(
                "INSERT INTO cards (
                    id, owner_id, course_id, lesson_id, step_index,
                    front, content, card_kind, concept_ids,
                    stability, difficulty, scheduled_days, reps, lapses, state,
                    due_at, last_reviewed_at, version, created_at, updated_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9,
                    ?10, ?11, ?12, ?13, ?14, ?15,
                    ?16, ?17, ?18, ?19, ?20
                )",
                params![
                    card.id,
                    card.owner_id,
                    card.course_id,
                    card.lesson_id,
                    card.step_index,
                    card.front,
                    content_json,
                    card.kind().as_str(),
                    concepts_json,
                    card.stability,
                    card.difficulty,
                    card.scheduled_days,
                    card.reps,
                    card.lapses,
                    card.state.as_str(),
                    card.due_at.to_rfc3339(),
                    Option::<String>::None,
                    card.version,
                    card.created_at.to_rfc3339(),
                    card.updated_at.to_rfc3339(),
                ],
            )?;
        }

        self.get_card(&card.id)?
            .ok_or_else(|| StorageError::NotFound(format!("card {}", card.id)))
    }

    /// Fetch a card by id
    pub fn get_card(&self, id: &str) -> Result<Option<ReviewCard>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let mut stmt = reader.prepare("SELECT * FROM cards WHERE id = ?1")?;
        let card = stmt
            .query_row(params![id], |row| Self::row_to_card(row))
            .optional()?;
        Ok(card)
    }

    /// Overdue cards for an owner, most overdue first. Never-reviewed cards
    /// are excluded; they enter sessions through the new-card pool instead.
    pub fn due_cards(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
        limit: i32,
    ) -> Result<Vec<ReviewCard>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let mut stmt = reader.prepare(
            "SELECT * FROM cards
             WHERE owner_id = ?1 AND state != 'new' AND due_at <= ?2
             ORDER BY due_at ASC
             LIMIT ?3",
        )?;
        let cards = stmt
            .query_map(params![owner_id, now.to_rfc3339(), limit], |row| {
                Self::row_to_card(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Reviewed cards not yet due, soonest first. Feeds the concept-matched
    /// session pools.
    pub fn upcoming_cards(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
        limit: i32,
    ) -> Result<Vec<ReviewCard>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let mut stmt = reader.prepare(
            "SELECT * FROM cards
             WHERE owner_id = ?1 AND state != 'new' AND due_at > ?2
             ORDER BY due_at ASC
             LIMIT ?3",
        )?;
        let cards = stmt
            .query_map(params![owner_id, now.to_rfc3339(), limit], |row| {
                Self::row_to_card(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Never-reviewed cards for an owner, oldest first
    pub fn new_cards(&self, owner_id: &str, limit: i32) -> Result<Vec<ReviewCard>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let mut stmt = reader.prepare(
            "SELECT * FROM cards
             WHERE owner_id = ?1 AND state = 'new'
             ORDER BY created_at ASC
             LIMIT ?2",
        )?;
        let cards = stmt
            .query_map(params![owner_id, limit], |row| Self::row_to_card(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Parse RFC3339 timestamp inside a row mapper
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                    )),
                )
            })
    }

    /// Parse RFC3339 timestamp outside a row mapper
    fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| StorageError::InvalidTimestamp(value.to_string()))
    }

    /// Convert a row to ReviewCard
    fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<ReviewCard> {
        let content_json: String = row.get("content")?;
        let content: CardContent = serde_json::from_str(&content_json).unwrap_or_default();

        let concepts_json: String = row.get("concept_ids")?;
        let concept_ids: Vec<String> = serde_json::from_str(&concepts_json).unwrap_or_default();

        let due_at: String = row.get("due_at")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        let last_reviewed_at: Option<String> = row.get("last_reviewed_at")?;

        let due_at = Self::parse_timestamp(&due_at, "due_at")?;
        let created_at = Self::parse_timestamp(&created_at, "created_at")?;
        let updated_at = Self::parse_timestamp(&updated_at, "updated_at")?;
        let last_reviewed_at = last_reviewed_at.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });

        let state: String = row.get("state")?;

        Ok(ReviewCard {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            course_id: row.get("course_id")?,
            lesson_id: row.get("lesson_id")?,
            step_index: row.get("step_index")?,
            front: row.get("front")?,
            content,
            concept_ids,
            stability: row.get("stability")?,
            difficulty: row.get("difficulty")?,
            scheduled_days: row.get("scheduled_days")?,
            reps: row.get("reps")?,
            lapses: row.get("lapses")?,
            state: LearningState::parse_name(&state),
            due_at,
            last_reviewed_at,
            version: row.get("version")?,
            created_at,
            updated_at,
        })
    }

    // ========================================================================
    // REVIEWS
    // ========================================================================

    /// Submit a review and advance the card's scheduling state.
    ///
    /// The card update and the event log insert commit in one transaction.
    /// The update guards on the version read at the start of the call; if a
    /// concurrent review got there first, nothing is written and the caller
    /// gets a [`StorageError::Conflict`] to retry against fresh state.
    pub fn submit_review(
        &self,
        card_id: &str,
        rating: i32,
        duration_ms: Option<i64>,
    ) -> Result<ReviewReceipt> {
        let rating = Rating::from_i32(rating).ok_or(StorageError::InvalidRating(rating))?;

        let card = self
            .get_card(card_id)?
            .ok_or_else(|| StorageError::NotFound(format!("card {card_id}")))?;

        let now = Utc::now();
        let previous_state = card.state;
        let outcome = self.scheduler.review(&card.memory_state(), rating, now);

        {
            let mut writer = self
                .writer
                .lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            let tx = writer.transaction()?;

            let updated_rows = tx.execute(
                "UPDATE cards SET
                    stability = ?1, difficulty = ?2, scheduled_days = ?3,
                    reps = ?4, lapses = ?5, state = ?6,
                    due_at = ?7, last_reviewed_at = ?8, updated_at = ?9,
                    version = version + 1
                 WHERE id = ?10 AND version = ?11",
                params![
                    outcome.state.stability,
                    outcome.state.difficulty,
                    outcome.state.scheduled_days,
                    outcome.state.reps,
                    outcome.state.lapses,
                    outcome.state.state.as_str(),
                    outcome.due_at.to_rfc3339(),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                    card_id,
                    card.version,
                ],
            )?;
            if updated_rows == 0 {
                // Row exists (read above) but the version moved under us.
                return Err(StorageError::Conflict(format!(
                    "card {card_id} changed since version {}",
                    card.version
                )));
            }

            tx.execute(
                "INSERT INTO review_events (card_id, rating, reviewed_at, duration_ms)
                 VALUES (?1, ?2, ?3, ?4)",
                params![card_id, rating.value(), now.to_rfc3339(), duration_ms],
            )?;

            tx.commit()?;
        }

        let mut updated = card;
        updated.apply_outcome(&outcome);

        Ok(ReviewReceipt {
            previous_state,
            next_due_at: updated.due_at,
            scheduled_days: updated.scheduled_days,
            card: updated,
        })
    }

    /// Outcomes for all four ratings without mutating anything
    pub fn preview_review(&self, card_id: &str) -> Result<ReviewPreview> {
        let card = self
            .get_card(card_id)?
            .ok_or_else(|| StorageError::NotFound(format!("card {card_id}")))?;
        Ok(self.scheduler.preview(&card.memory_state(), Utc::now()))
    }

    /// Review log for a card, newest first
    pub fn review_history(&self, card_id: &str, limit: i32) -> Result<Vec<ReviewEventRecord>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let mut stmt = reader.prepare(
            "SELECT * FROM review_events
             WHERE card_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let events = stmt
            .query_map(params![card_id, limit], |row| Self::row_to_event(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Convert a row to ReviewEventRecord
    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<ReviewEventRecord> {
        let reviewed_at: String = row.get("reviewed_at")?;
        let reviewed_at = Self::parse_timestamp(&reviewed_at, "reviewed_at")?;

        Ok(ReviewEventRecord {
            id: row.get("id")?,
            card_id: row.get("card_id")?,
            rating: row.get("rating")?,
            reviewed_at,
            duration_ms: row.get("duration_ms")?,
        })
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    /// Persist a freshly composed session record
    pub fn save_session(&self, record: &SessionRecord) -> Result<()> {
        let targets_json =
            serde_json::to_string(&record.target_concepts).unwrap_or_else(|_| "[]".to_string());
        let gaps_json =
            serde_json::to_string(&record.gaps_addressed).unwrap_or_else(|_| "[]".to_string());

        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO sessions (
                id, owner_id, session_type, status,
                card_total, due_count, gap_count, reinforcement_count, new_count,
                completed_cards, correct_cards,
                target_concepts, gaps_addressed,
                started_at, ended_at, duration_ms
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11,
                ?12, ?13,
                ?14, ?15, ?16
            )",
            params![
                record.id,
                record.owner_id,
                record.session_type.as_str(),
                record.status.as_str(),
                record.card_total,
                record.due_count,
                record.gap_count,
                record.reinforcement_count,
                record.new_count,
                record.completed_cards,
                record.correct_cards,
                targets_json,
                gaps_json,
                record.started_at.to_rfc3339(),
                record.ended_at.map(|dt| dt.to_rfc3339()),
                record.duration_ms,
            ],
        )?;
        Ok(())
    }

    /// Fetch a session record by id
    pub fn get_session(&self, id: &str) -> Result<Option<SessionRecord>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let mut stmt = reader.prepare("SELECT * FROM sessions WHERE id = ?1")?;
        let session = stmt
            .query_row(params![id], |row| Self::row_to_session(row))
            .optional()?;
        Ok(session)
    }

    /// Count one answered card against an in-progress session.
    ///
    /// Finalized sessions reject progress with [`StorageError::Conflict`].
    pub fn record_progress(&self, session_id: &str, correct: bool) -> Result<SessionRecord> {
        let updated_rows = {
            let writer = self
                .writer
                .lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            writer.execute(
                "UPDATE sessions SET
                    completed_cards = completed_cards + 1,
                    correct_cards = correct_cards + ?1
                 WHERE id = ?2 AND status = 'in_progress'",
                params![i64::from(correct), session_id],
            )?
        };

        if updated_rows == 0 {
            return Err(self.missing_or_finalized(session_id)?);
        }

        self.get_session(session_id)?
            .ok_or_else(|| StorageError::NotFound(format!("session {session_id}")))
    }

    /// Finalize a session as completed, recording elapsed time and which gap
    /// concepts were addressed. Exactly one finalization is accepted.
    pub fn complete_session(
        &self,
        session_id: &str,
        gaps_addressed: &[String],
    ) -> Result<SessionRecord> {
        let session = self
            .get_session(session_id)?
            .ok_or_else(|| StorageError::NotFound(format!("session {session_id}")))?;

        let now = Utc::now();
        let duration_ms = (now - session.started_at).num_milliseconds().max(0);
        let gaps_json =
            serde_json::to_string(gaps_addressed).unwrap_or_else(|_| "[]".to_string());

        let updated_rows = {
            let writer = self
                .writer
                .lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            writer.execute(
                "UPDATE sessions SET
                    status = 'completed', ended_at = ?1, duration_ms = ?2,
                    gaps_addressed = ?3
                 WHERE id = ?4 AND status = 'in_progress'",
                params![now.to_rfc3339(), duration_ms, gaps_json, session_id],
            )?
        };

        if updated_rows == 0 {
            return Err(StorageError::Conflict(format!(
                "session {session_id} is already {}",
                session.status
            )));
        }

        self.get_session(session_id)?
            .ok_or_else(|| StorageError::NotFound(format!("session {session_id}")))
    }

    /// Finalize a session as abandoned, stopping the clock without marking
    /// it complete. Exactly one finalization is accepted.
    pub fn abandon_session(&self, session_id: &str) -> Result<SessionRecord> {
        let session = self
            .get_session(session_id)?
            .ok_or_else(|| StorageError::NotFound(format!("session {session_id}")))?;

        let now = Utc::now();
        let duration_ms = (now - session.started_at).num_milliseconds().max(0);

        let updated_rows = {
            let writer = self
                .writer
                .lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            writer.execute(
                "UPDATE sessions SET
                    status = 'abandoned', ended_at = ?1, duration_ms = ?2
                 WHERE id = ?3 AND status = 'in_progress'",
                params![now.to_rfc3339(), duration_ms, session_id],
            )?
        };

        if updated_rows == 0 {
            return Err(StorageError::Conflict(format!(
                "session {session_id} is already {}",
                session.status
            )));
        }

        self.get_session(session_id)?
            .ok_or_else(|| StorageError::NotFound(format!("session {session_id}")))
    }

    /// NotFound for missing sessions, Conflict for finalized ones
    fn missing_or_finalized(&self, session_id: &str) -> Result<StorageError> {
        match self.get_session(session_id)? {
            None => Ok(StorageError::NotFound(format!("session {session_id}"))),
            Some(session) => Ok(StorageError::Conflict(format!(
                "session {session_id} is already {}",
                session.status
            ))),
        }
    }

    /// Latest sessions for an owner, newest first
    pub fn recent_sessions(&self, owner_id: &str, limit: i32) -> Result<Vec<SessionRecord>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let mut stmt = reader.prepare(
            "SELECT * FROM sessions
             WHERE owner_id = ?1
             ORDER BY started_at DESC
             LIMIT ?2",
        )?;
        let sessions = stmt
            .query_map(params![owner_id, limit], |row| Self::row_to_session(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Convert a row to SessionRecord
    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<SessionRecord> {
        let targets_json: String = row.get("target_concepts")?;
        let target_concepts: Vec<String> =
            serde_json::from_str(&targets_json).unwrap_or_default();
        let gaps_json: String = row.get("gaps_addressed")?;
        let gaps_addressed: Vec<String> = serde_json::from_str(&gaps_json).unwrap_or_default();

        let started_at: String = row.get("started_at")?;
        let started_at = Self::parse_timestamp(&started_at, "started_at")?;
        let ended_at: Option<String> = row.get("ended_at")?;
        let ended_at = ended_at.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });

        let session_type: String = row.get("session_type")?;
        let status: String = row.get("status")?;

        Ok(SessionRecord {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            session_type: SessionType::parse_name(&session_type),
            status: SessionStatus::parse_name(&status),
            card_total: row.get("card_total")?,
            due_count: row.get("due_count")?,
            gap_count: row.get("gap_count")?,
            reinforcement_count: row.get("reinforcement_count")?,
            new_count: row.get("new_count")?,
            completed_cards: row.get("completed_cards")?,
            correct_cards: row.get("correct_cards")?,
            target_concepts,
            gaps_addressed,
            started_at,
            ended_at,
            duration_ms: row.get("duration_ms")?,
        })
    }

    // ========================================================================
    // STATS
    // ========================================================================

    /// Aggregate an owner's completed sessions over a trailing window
    pub fn get_session_stats(&self, owner_id: &str, window_days: i64) -> Result<SessionStats> {
        let window_days = window_days.max(0);
        let cutoff = (Utc::now() - Duration::days(window_days)).to_rfc3339();

        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let sessions_completed: i64 = reader.query_row(
            "SELECT COUNT(*) FROM sessions
             WHERE owner_id = ?1 AND started_at >= ?2 AND status = 'completed'",
            params![owner_id, cutoff],
            |row| row.get(0),
        )?;
        let sessions_abandoned: i64 = reader.query_row(
            "SELECT COUNT(*) FROM sessions
             WHERE owner_id = ?1 AND started_at >= ?2 AND status = 'abandoned'",
            params![owner_id, cutoff],
            |row| row.get(0),
        )?;
        let (cards_completed, cards_correct, total_practice_ms): (i64, i64, i64) = reader
            .query_row(
                "SELECT
                    COALESCE(SUM(completed_cards), 0),
                    COALESCE(SUM(correct_cards), 0),
                    COALESCE(SUM(duration_ms), 0)
                 FROM sessions
                 WHERE owner_id = ?1 AND started_at >= ?2 AND status = 'completed'",
                params![owner_id, cutoff],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let accuracy = if cards_completed > 0 {
            cards_correct as f64 / cards_completed as f64
        } else {
            0.0
        };
        let average_session_ms = if sessions_completed > 0 {
            total_practice_ms / sessions_completed
        } else {
            0
        };

        Ok(SessionStats {
            window_days,
            sessions_completed,
            sessions_abandoned,
            cards_completed,
            cards_correct,
            accuracy,
            total_practice_ms,
            average_session_ms,
        })
    }

    /// Aggregate an owner's card store
    pub fn deck_stats(&self, owner_id: &str) -> Result<DeckStats> {
        let now = Utc::now();
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let total_cards: i64 = reader.query_row(
            "SELECT COUNT(*) FROM cards WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        let due_now: i64 = reader.query_row(
            "SELECT COUNT(*) FROM cards
             WHERE owner_id = ?1 AND state != 'new' AND due_at <= ?2",
            params![owner_id, now.to_rfc3339()],
            |row| row.get(0),
        )?;

        let mut stats = DeckStats {
            total_cards,
            due_now,
            ..Default::default()
        };

        let mut stmt = reader.prepare(
            "SELECT state, COUNT(*) FROM cards WHERE owner_id = ?1 GROUP BY state",
        )?;
        let counts = stmt.query_map(params![owner_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for entry in counts {
            let (state, count) = entry?;
            match state.as_str() {
                "new" => stats.new_cards = count,
                "learning" => stats.learning_cards = count,
                "review" => stats.review_cards = count,
                "relearning" => stats.relearning_cards = count,
                _ => {}
            }
        }

        // Averages over reviewed cards only; seed values on new cards are
        // placeholders until the first rating picks the real ones.
        let (average_stability, average_difficulty): (f64, f64) = reader.query_row(
            "SELECT COALESCE(AVG(stability), 0), COALESCE(AVG(difficulty), 0)
             FROM cards
             WHERE owner_id = ?1 AND state != 'new'",
            params![owner_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        stats.average_stability = average_stability;
        stats.average_difficulty = average_difficulty;

        let oldest: Option<String> = reader.query_row(
            "SELECT MIN(created_at) FROM cards WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        let newest: Option<String> = reader.query_row(
            "SELECT MAX(created_at) FROM cards WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        stats.oldest_card = oldest.map(|s| Self::parse_rfc3339(&s)).transpose()?;
        stats.newest_card = newest.map(|s| Self::parse_rfc3339(&s)).transpose()?;

        Ok(stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================
