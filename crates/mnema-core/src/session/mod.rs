//! Practice session model.
//!
//! A session is an ordered, deduplicated queue of cards selected from four
//! pools plus a persistent summary record that tracks progress until the
//! session is completed or abandoned. Composition lives in [`composer`],
//! queue assembly in [`queue`].

pub mod composer;
pub mod queue;

pub use composer::SessionComposer;
pub use queue::{interleave, CardSource, SessionCard, INTERLEAVE_THRESHOLD};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// SESSION ENUMS
// ============================================================================

/// How a session was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Routine practice drawing from all four pools.
    Daily,
    /// Focused on every unresolved gap concept, no new cards.
    Targeted,
    /// Focused on an explicit set of gap concepts, no new cards.
    GapFix,
    /// Caller-supplied options that fit no preset.
    Custom,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Daily => "daily",
            SessionType::Targeted => "targeted",
            SessionType::GapFix => "gap_fix",
            SessionType::Custom => "custom",
        }
    }

    /// Parse a stored name. Unknown names fall back to `Custom`.
    pub fn parse_name(name: &str) -> Self {
        match name {
            "daily" => SessionType::Daily,
            "targeted" => SessionType::Targeted,
            "gap_fix" => SessionType::GapFix,
            _ => SessionType::Custom,
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    /// Parse a stored name. Unknown names fall back to `InProgress`.
    pub fn parse_name(name: &str) -> Self {
        match name {
            "completed" => SessionStatus::Completed,
            "abandoned" => SessionStatus::Abandoned,
            _ => SessionStatus::InProgress,
        }
    }

    /// Completed and abandoned sessions accept no further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SESSION OPTIONS
// ============================================================================

/// Knobs for session composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionOptions {
    /// Hard ceiling on queue length.
    pub max_cards: usize,
    /// Ceiling on never-reviewed cards admitted to the queue.
    pub new_card_limit: usize,
    /// When set, the gap pool draws from these concepts instead of asking
    /// the gap oracle.
    pub target_concept_ids: Option<Vec<String>>,
    pub session_type: SessionType,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_cards: 20,
            new_card_limit: 5,
            target_concept_ids: None,
            session_type: SessionType::Daily,
        }
    }
}

// ============================================================================
// SESSION RECORD
// ============================================================================

/// Persistent summary of one practice session.
///
/// Created at composition time with pool counts filled in, then updated as
/// the learner works through the queue. Exactly one finalization (complete
/// or abandon) is accepted per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub owner_id: String,
    pub session_type: SessionType,
    pub status: SessionStatus,
    /// Queue length at composition time.
    pub card_total: i64,
    pub due_count: i64,
    pub gap_count: i64,
    pub reinforcement_count: i64,
    pub new_count: i64,
    /// Cards the learner has answered so far.
    pub completed_cards: i64,
    /// Answered cards the learner got right.
    pub correct_cards: i64,
    /// Concepts the session was explicitly scoped to, if any.
    pub target_concepts: Vec<String>,
    /// Gap concepts reported as addressed at completion.
    pub gaps_addressed: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

impl SessionRecord {
    /// Fresh in-progress record with zeroed counters.
    pub fn new(owner_id: &str, session_type: SessionType, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            session_type,
            status: SessionStatus::InProgress,
            card_total: 0,
            due_count: 0,
            gap_count: 0,
            reinforcement_count: 0,
            new_count: 0,
            completed_cards: 0,
            correct_cards: 0,
            target_concepts: Vec::new(),
            gaps_addressed: Vec::new(),
            started_at,
            ended_at: None,
            duration_ms: None,
        }
    }

    /// Fraction of answered cards that were correct, 0.0 before any answer.
    pub fn accuracy(&self) -> f64 {
        if self.completed_cards > 0 {
            self.correct_cards as f64 / self.completed_cards as f64
        } else {
            0.0
        }
    }
}

// ============================================================================
// COMPOSED SESSION
// ============================================================================

/// A composed session: the ordered card queue plus its summary record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    pub record: SessionRecord,
    pub cards: Vec<SessionCard>,
}

impl PracticeSession {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Empty sessions are valid: nothing due and nothing to introduce.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

// ============================================================================
// SESSION STATS
// ============================================================================

/// Aggregate over an owner's completed sessions inside a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Width of the trailing window in days.
    pub window_days: i64,
    pub sessions_completed: i64,
    pub sessions_abandoned: i64,
    pub cards_completed: i64,
    pub cards_correct: i64,
    /// cards_correct / cards_completed, 0.0 when nothing was answered.
    pub accuracy: f64,
    /// Total practice time over completed sessions.
    pub total_practice_ms: i64,
    pub average_session_ms: i64,
}
