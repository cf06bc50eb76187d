//! Review Card - The unit of reviewable knowledge
//!
//! Each card binds together:
//! - A prompt and an opaque content payload
//! - The concepts it exercises, for gap and reinforcement targeting
//! - Its memory-model state and schedule
//! - An optimistic-concurrency version token

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::{CardContent, CardKind};
use crate::scheduler::{LearningState, MemoryState, ReviewOutcome};

// ============================================================================
// REVIEW CARD
// ============================================================================

/// A reviewable card owned by one learner.
///
/// Memory-state fields are mutated exclusively by applying a scheduler
/// outcome through the store; content fields are written once at creation.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Learner this card belongs to
    pub owner_id: String,
    /// Course the source lesson belongs to
    pub course_id: String,
    /// Lesson the card was generated from
    pub lesson_id: String,
    /// Position of the source step within the lesson
    pub step_index: i32,

    // ========== Content ==========
    /// Prompt shown to the learner
    pub front: String,
    /// Opaque content payload; never inspected by the scheduler
    pub content: CardContent,
    /// Concepts this card exercises
    pub concept_ids: Vec<String>,

    // ========== Memory State ==========
    /// Memory stability in days
    pub stability: f64,
    /// Relative difficulty in [0.1, 1.0]
    pub difficulty: f64,
    /// Interval scheduled at the last review, in whole days
    pub scheduled_days: i64,
    /// Total reviews recorded
    pub reps: i32,
    /// Total Again ratings recorded
    pub lapses: i32,
    /// Lifecycle state
    pub state: LearningState,

    // ========== Scheduling ==========
    /// When the card next comes due
    pub due_at: DateTime<Utc>,
    /// When the card was last reviewed
    pub last_reviewed_at: Option<DateTime<Utc>>,

    // ========== Concurrency ==========
    /// Optimistic-locking token, incremented on every state write
    pub version: i64,

    // ========== Bookkeeping ==========
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ReviewCard {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            owner_id: String::new(),
            course_id: String::new(),
            lesson_id: String::new(),
            step_index: 0,
            front: String::new(),
            content: CardContent::default(),
            concept_ids: vec![],
            stability: 3.0,
            difficulty: 0.3,
            scheduled_days: 0,
            reps: 0,
            lapses: 0,
            state: LearningState::New,
            due_at: now,
            last_reviewed_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

impl ReviewCard {
    /// Build a card from creation input and a seed memory state. The card is
    /// due immediately so it becomes eligible for the new-card pool.
    pub fn from_input(input: NewCardInput, seed: &MemoryState, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: input.owner_id,
            course_id: input.course_id,
            lesson_id: input.lesson_id,
            step_index: input.step_index,
            front: input.front,
            content: input.content,
            concept_ids: input.concept_ids,
            stability: seed.stability,
            difficulty: seed.difficulty,
            scheduled_days: seed.scheduled_days,
            reps: seed.reps,
            lapses: seed.lapses,
            state: seed.state,
            due_at: now,
            last_reviewed_at: seed.last_reviewed,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Variant tag of the content payload
    pub fn kind(&self) -> CardKind {
        self.content.kind()
    }

    /// True if the card exercises any of the given concepts
    pub fn exercises_any(&self, concepts: &[String]) -> bool {
        self.concept_ids.iter().any(|c| concepts.contains(c))
    }

    /// Memory-model view of this card, detached for the pure scheduler
    pub fn memory_state(&self) -> MemoryState {
        MemoryState {
            stability: self.stability,
            difficulty: self.difficulty,
            reps: self.reps,
            lapses: self.lapses,
            state: self.state,
            last_reviewed: self.last_reviewed_at,
            scheduled_days: self.scheduled_days,
        }
    }

    /// Fold a scheduler outcome back into the card, bumping the version.
    /// The store persists the same transition; this keeps the in-memory copy
    /// aligned with the row it wrote.
    pub fn apply_outcome(&mut self, outcome: &ReviewOutcome) {
        self.stability = outcome.state.stability;
        self.difficulty = outcome.state.difficulty;
        self.reps = outcome.state.reps;
        self.lapses = outcome.state.lapses;
        self.state = outcome.state.state;
        self.scheduled_days = outcome.state.scheduled_days;
        self.last_reviewed_at = outcome.state.last_reviewed;
        self.due_at = outcome.due_at;
        self.version += 1;
        if let Some(reviewed_at) = outcome.state.last_reviewed {
            self.updated_at = reviewed_at;
        }
    }
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for creating a new card.
///
/// Uses `deny_unknown_fields` to prevent field injection attacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCardInput {
    /// Learner the card belongs to
    pub owner_id: String,
    /// Course of the source lesson
    pub course_id: String,
    /// Lesson the card was generated from
    pub lesson_id: String,
    /// Position of the source step within the lesson
    #[serde(default)]
    pub step_index: i32,
    /// Prompt shown to the learner
    pub front: String,
    /// Content payload
    pub content: CardContent,
    /// Concepts this card exercises
    #[serde(default)]
    pub concept_ids: Vec<String>,
}

impl Default for NewCardInput {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            course_id: String::new(),
            lesson_id: String::new(),
            step_index: 0,
            front: String::new(),
            content: CardContent::default(),
            concept_ids: vec![],
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
