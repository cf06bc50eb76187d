//! Review state machine.
//!
//! [`ReviewScheduler`] turns a `(memory state, rating)` pair into the next
//! memory state and due date. It owns no storage and never reads the clock;
//! callers pass `now` explicitly, which keeps every transition replayable.
//!
//! Lifecycle: `new -> learning -> review <-> relearning`. Cards in learning
//! and relearning are stepped in minute offsets and day-level scheduling only
//! applies once a card graduates to review.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::{
    hard_interval, initial_difficulty, initial_stability, next_difficulty, next_forget_stability,
    next_interval, next_recall_stability, step_again_stability, DEFAULT_RETENTION, EASY_BONUS,
    MAX_STABILITY,
};

// ============================================================================
// RATING
// ============================================================================

/// Self-reported recall quality for a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    /// Complete failure to recall
    Again = 1,
    /// Recalled with serious difficulty
    Hard = 2,
    /// Recalled correctly with some effort
    Good = 3,
    /// Recalled effortlessly
    Easy = 4,
}

impl Rating {
    /// Parse the wire value 1-4. Anything else is rejected by the caller.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn value(&self) -> i32 {
        *self as i32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }

    /// Index into the Again/Hard/Good/Easy constant tables
    pub(crate) fn table_index(&self) -> usize {
        (*self as usize) - 1
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Again)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// LEARNING STATE
// ============================================================================

/// Lifecycle position of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningState {
    /// Created but never reviewed
    New,
    /// In minute-offset steps after its first review
    Learning,
    /// Graduated to day-level scheduling
    Review,
    /// Forgotten review card working back through steps
    Relearning,
}

impl LearningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
        }
    }

    /// Parse a stored name, defaulting to `New` for unknown values
    pub fn parse_name(s: &str) -> Self {
        match s {
            "learning" => Self::Learning,
            "review" => Self::Review,
            "relearning" => Self::Relearning,
            _ => Self::New,
        }
    }

    /// True once day-level scheduling applies
    pub fn is_graduated(&self) -> bool {
        matches!(self, Self::Review)
    }
}

impl std::fmt::Display for LearningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// PARAMETERS AND STATE
// ============================================================================

/// Tunable scheduling parameters. Defaults match the shipped model; per-deck
/// overrides go through [`ReviewScheduler::with_parameters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerParameters {
    /// Recall probability targeted at the moment a card comes due
    pub target_retention: f64,
    /// Hard ceiling on scheduled intervals, in days
    pub maximum_interval: i64,
    /// Flat stability multiplier for Easy ratings
    pub easy_bonus: f64,
    /// Interval divisor for Hard ratings on review-state cards
    pub hard_interval_factor: f64,
    /// Minute offset after Again on a learning/relearning step
    pub again_step_minutes: i64,
    /// Minute offset after Hard on a learning/relearning step
    pub hard_step_minutes: i64,
}

impl Default for SchedulerParameters {
    fn default() -> Self {
        Self {
            target_retention: DEFAULT_RETENTION,
            maximum_interval: 365,
            easy_bonus: EASY_BONUS,
            hard_interval_factor: 1.2,
            again_step_minutes: 1,
            hard_step_minutes: 10,
        }
    }
}

/// Memory-model fields of a card, detached from identity and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    /// Days until retrievability decays to ~37% (e^-1)
    pub stability: f64,
    /// Relative difficulty in [0.1, 1.0]
    pub difficulty: f64,
    /// Total reviews recorded against the card
    pub reps: i32,
    /// Total Again ratings recorded against the card
    pub lapses: i32,
    pub state: LearningState,
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Days scheduled at the last review; 0 while stepping in minutes
    pub scheduled_days: i64,
}

impl MemoryState {
    /// Fractional days since the last review, 0.0 for unreviewed cards
    pub fn elapsed_days(&self, now: DateTime<Utc>) -> f64 {
        match self.last_reviewed {
            Some(last) => ((now - last).num_seconds() as f64 / 86_400.0).max(0.0),
            None => 0.0,
        }
    }

    /// Current recall probability under exponential decay
    pub fn retrievability(&self, now: DateTime<Utc>) -> f64 {
        super::algorithm::retrievability(self.stability, self.elapsed_days(now))
    }
}

/// One possible review transition: the state a card would hold afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub state: MemoryState,
    pub due_at: DateTime<Utc>,
    /// Day-level interval, 0 when the card is stepping in minutes
    pub interval_days: i64,
}

/// Outcomes for all four ratings, computed without mutating anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPreview {
    pub again: ReviewOutcome,
    pub hard: ReviewOutcome,
    pub good: ReviewOutcome,
    pub easy: ReviewOutcome,
}

impl ReviewPreview {
    pub fn for_rating(&self, rating: Rating) -> &ReviewOutcome {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Pure review transition engine.
#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler {
    params: SchedulerParameters,
}

impl ReviewScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(params: SchedulerParameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> &SchedulerParameters {
        &self.params
    }

    /// Memory state for a freshly created card. Stability and difficulty are
    /// placeholders until the first review seeds them from the initial
    /// tables; the card is immediately eligible for the new-card pool.
    pub fn new_card(&self) -> MemoryState {
        MemoryState {
            stability: initial_stability(Rating::Good),
            difficulty: initial_difficulty(Rating::Good),
            reps: 0,
            lapses: 0,
            state: LearningState::New,
            last_reviewed: None,
            scheduled_days: 0,
        }
    }

    /// Apply one review. Deterministic in `(state, rating, now)`.
    pub fn review(&self, state: &MemoryState, rating: Rating, now: DateTime<Utc>) -> ReviewOutcome {
        match state.state {
            LearningState::New => self.review_new(state, rating, now),
            LearningState::Learning | LearningState::Relearning => {
                self.review_step(state, rating, now)
            }
            LearningState::Review => self.review_graduated(state, rating, now),
        }
    }

    /// Outcomes for all four ratings without committing any of them
    pub fn preview(&self, state: &MemoryState, now: DateTime<Utc>) -> ReviewPreview {
        ReviewPreview {
            again: self.review(state, Rating::Again, now),
            hard: self.review(state, Rating::Hard, now),
            good: self.review(state, Rating::Good, now),
            easy: self.review(state, Rating::Easy, now),
        }
    }

    /// First review: seed stability and difficulty from the initial tables,
    /// then either enter the learning steps (Again/Hard) or graduate
    /// straight to review (Good/Easy).
    fn review_new(&self, state: &MemoryState, rating: Rating, now: DateTime<Utc>) -> ReviewOutcome {
        let mut next = MemoryState {
            stability: initial_stability(rating),
            difficulty: initial_difficulty(rating),
            reps: state.reps + 1,
            lapses: state.lapses + i32::from(rating == Rating::Again),
            state: LearningState::Learning,
            last_reviewed: Some(now),
            scheduled_days: 0,
        };

        match rating {
            Rating::Again => self.step_outcome(next, self.params.again_step_minutes, now),
            Rating::Hard => self.step_outcome(next, self.params.hard_step_minutes, now),
            Rating::Good | Rating::Easy => {
                next.state = LearningState::Review;
                self.graduated_outcome(next, now)
            }
        }
    }

    /// Learning/relearning step: difficulty moves by the usual deltas but
    /// stability is only lightly perturbed. Good and Easy graduate.
    fn review_step(&self, state: &MemoryState, rating: Rating, now: DateTime<Utc>) -> ReviewOutcome {
        let mut next = MemoryState {
            stability: state.stability,
            difficulty: next_difficulty(state.difficulty, rating),
            reps: state.reps + 1,
            lapses: state.lapses + i32::from(rating == Rating::Again),
            state: state.state,
            last_reviewed: Some(now),
            scheduled_days: 0,
        };

        match rating {
            Rating::Again => {
                next.stability = step_again_stability(state.stability);
                self.step_outcome(next, self.params.again_step_minutes, now)
            }
            Rating::Hard => self.step_outcome(next, self.params.hard_step_minutes, now),
            Rating::Good => {
                next.state = LearningState::Review;
                self.graduated_outcome(next, now)
            }
            Rating::Easy => {
                next.stability = (state.stability * self.params.easy_bonus).min(MAX_STABILITY);
                next.state = LearningState::Review;
                self.graduated_outcome(next, now)
            }
        }
    }

    /// Review-state card: success grows stability along the recall curve,
    /// Again collapses it and demotes the card to relearning.
    fn review_graduated(
        &self,
        state: &MemoryState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> ReviewOutcome {
        let elapsed = state.elapsed_days(now);
        let mut next = MemoryState {
            stability: state.stability,
            difficulty: next_difficulty(state.difficulty, rating),
            reps: state.reps + 1,
            lapses: state.lapses + i32::from(rating == Rating::Again),
            state: LearningState::Review,
            last_reviewed: Some(now),
            scheduled_days: 0,
        };

        match rating {
            Rating::Again => {
                next.stability = next_forget_stability(state.stability);
                next.state = LearningState::Relearning;
                self.step_outcome(next, self.params.again_step_minutes, now)
            }
            Rating::Hard | Rating::Good | Rating::Easy => {
                // Growth reads the pre-review difficulty: the penalty reflects
                // how hard the card was going into this recall.
                next.stability =
                    next_recall_stability(state.stability, state.difficulty, elapsed, rating)
                        .min(self.params.maximum_interval as f64);
                let interval = if rating == Rating::Hard {
                    hard_interval(
                        next.stability,
                        self.params.target_retention,
                        self.params.hard_interval_factor,
                        self.params.maximum_interval,
                    )
                } else {
                    next_interval(
                        next.stability,
                        self.params.target_retention,
                        self.params.maximum_interval,
                    )
                };
                next.scheduled_days = interval;
                ReviewOutcome {
                    due_at: now + Duration::days(interval),
                    interval_days: interval,
                    state: next,
                }
            }
        }
    }

    fn step_outcome(
        &self,
        state: MemoryState,
        step_minutes: i64,
        now: DateTime<Utc>,
    ) -> ReviewOutcome {
        ReviewOutcome {
            due_at: now + Duration::minutes(step_minutes.max(1)),
            interval_days: 0,
            state,
        }
    }

    fn graduated_outcome(&self, mut state: MemoryState, now: DateTime<Utc>) -> ReviewOutcome {
        let interval = next_interval(
            state.stability,
            self.params.target_retention,
            self.params.maximum_interval,
        );
        state.scheduled_days = interval;
        ReviewOutcome {
            due_at: now + Duration::days(interval),
            interval_days: interval,
            state,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
