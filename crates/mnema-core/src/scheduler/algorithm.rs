//! Pure scheduling math.
//!
//! Every function in this file is deterministic and side-effect free: the
//! state machine in [`super::engine`] composes these primitives into full
//! review transitions. Formulas:
//!
//! - Retrievability: `R = exp(-elapsed / stability)`
//! - Interval: `t = round(stability * ln(target) / ln(0.9))`, so an interval
//!   equals the stability exactly at the default 0.9 target retention
//! - Recall growth: `S' = S * growth(rating) * (1 - difficulty/2) * (1 + (1 - R)/2)`
//! - Forget collapse: `S' = max(0.5, S * 0.2)`
//!
//! All outputs are defensively clamped; out-of-range inputs degrade to the
//! nearest legal value instead of failing.

use super::engine::Rating;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Floor for stability across every transition (days)
pub const MIN_STABILITY: f64 = 0.5;

/// Absolute stability ceiling (days); the configured maximum interval caps
/// growth further at review time
pub const MAX_STABILITY: f64 = 36500.0;

/// Floor for per-card difficulty
pub const MIN_DIFFICULTY: f64 = 0.1;

/// Ceiling for per-card difficulty
pub const MAX_DIFFICULTY: f64 = 1.0;

/// Default target retention: recall probability at the moment a card comes due
pub const DEFAULT_RETENTION: f64 = 0.9;

/// Base of the interval curve. `interval == stability` when the target
/// retention equals this value.
const RETENTION_BASE: f64 = 0.9;

/// Defensive bounds for the target-retention input of [`next_interval`]
const MIN_TARGET_RETENTION: f64 = 0.5;
const MAX_TARGET_RETENTION: f64 = 0.995;

/// First-rating stability seeds, indexed Again/Hard/Good/Easy.
/// Good (3 days) and Easy (7 days) anchor the table; a card rated Easy on
/// first exposure starts more durable than one rated Again.
pub const INITIAL_STABILITY: [f64; 4] = [0.5, 1.5, 3.0, 7.0];

/// First-rating difficulty seeds, indexed Again/Hard/Good/Easy
pub const INITIAL_DIFFICULTY: [f64; 4] = [0.9, 0.6, 0.3, 0.1];

/// Per-review difficulty adjustment, indexed Again/Hard/Good/Easy.
/// Positive for failures (card gets harder), negative for successes, with
/// magnitude strictly decreasing as the rating improves.
pub const DIFFICULTY_DELTA: [f64; 4] = [0.20, 0.10, -0.05, -0.03];

/// Stability growth factor on successful review-state recall,
/// indexed Hard/Good/Easy
const RECALL_GROWTH: [f64; 3] = [1.2, 2.5, 3.5];

/// Flat multiplier applied on top of the growth factor when rating = Easy,
/// and to the stability of a card graduating out of learning with Easy
pub const EASY_BONUS: f64 = 1.3;

/// Collapse factor when a review-state card is forgotten (rated Again)
pub const FORGET_STABILITY_FACTOR: f64 = 0.2;

// ============================================================================
// CORE FUNCTIONS
// ============================================================================

/// Instantaneous recall probability after `elapsed_days` without review.
///
/// Returns 1.0 at zero elapsed time for any positive stability; degraded
/// inputs (non-positive stability or elapsed time) also return 1.0 rather
/// than propagating NaN into the growth formula.
pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if elapsed_days <= 0.0 || stability <= 0.0 {
        return 1.0;
    }
    (-elapsed_days / stability).exp()
}

/// Days until predicted retention drops to `target_retention`.
///
/// `round(stability * ln(target) / ln(0.9))`, clamped to
/// `[1, maximum_interval]`. At the default 0.9 target the interval equals the
/// rounded stability.
pub fn next_interval(stability: f64, target_retention: f64, maximum_interval: i64) -> i64 {
    let retention = target_retention.clamp(MIN_TARGET_RETENTION, MAX_TARGET_RETENTION);
    let days = (stability * (retention.ln() / RETENTION_BASE.ln())).round() as i64;
    days.clamp(1, maximum_interval.max(1))
}

/// Interval for a Hard review: the stability-derived interval is divided by
/// `hard_factor` before rounding, shortening it relative to the plain value.
pub fn hard_interval(
    stability: f64,
    target_retention: f64,
    hard_factor: f64,
    maximum_interval: i64,
) -> i64 {
    let retention = target_retention.clamp(MIN_TARGET_RETENTION, MAX_TARGET_RETENTION);
    let raw = stability * (retention.ln() / RETENTION_BASE.ln());
    let days = (raw / hard_factor.max(1.0)).round() as i64;
    days.clamp(1, maximum_interval.max(1))
}

/// First-review stability seed for `rating`
pub fn initial_stability(rating: Rating) -> f64 {
    INITIAL_STABILITY[rating.table_index()]
}

/// First-review difficulty seed for `rating`
pub fn initial_difficulty(rating: Rating) -> f64 {
    INITIAL_DIFFICULTY[rating.table_index()]
}

/// Difficulty after a review: `clamp(old + delta(rating), 0.1, 1.0)`
pub fn next_difficulty(difficulty: f64, rating: Rating) -> f64 {
    (difficulty + DIFFICULTY_DELTA[rating.table_index()]).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Stability after successful recall of a review-state card.
///
/// `S' = S * growth(rating) * difficulty_penalty * review_bonus`, where the
/// penalty slows growth for hard cards and the bonus rewards reviews that
/// land near the edge of forgetting. Easy additionally multiplies by the
/// flat easy bonus. The caller caps the result at the configured maximum
/// interval; this function only enforces the absolute bounds.
pub fn next_recall_stability(
    stability: f64,
    difficulty: f64,
    elapsed_days: f64,
    rating: Rating,
) -> f64 {
    let growth = match rating {
        // Again never reaches the growth path; the collapse factor keeps
        // this function total if it somehow does.
        Rating::Again => FORGET_STABILITY_FACTOR,
        Rating::Hard => RECALL_GROWTH[0],
        Rating::Good => RECALL_GROWTH[1],
        Rating::Easy => RECALL_GROWTH[2],
    };

    let difficulty_penalty = 1.0 - difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY) * 0.5;
    let review_bonus = 1.0 + (1.0 - retrievability(stability, elapsed_days)) * 0.5;
    let easy_multiplier = if rating == Rating::Easy { EASY_BONUS } else { 1.0 };

    (stability * growth * difficulty_penalty * review_bonus * easy_multiplier)
        .clamp(MIN_STABILITY, MAX_STABILITY)
}

/// Stability collapse when a review-state card is forgotten:
/// `max(0.5, stability * 0.2)`
pub fn next_forget_stability(stability: f64) -> f64 {
    (stability * FORGET_STABILITY_FACTOR).max(MIN_STABILITY)
}

/// Stability after rating Again on a learning/relearning step: halved, with
/// the usual floor. Hard leaves step stability untouched.
pub fn step_again_stability(stability: f64) -> f64 {
    (stability * 0.5).max(MIN_STABILITY)
}

// ============================================================================
// TESTS
// ============================================================================
