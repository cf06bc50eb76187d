//! Adaptive review scheduling.
//!
//! Split in two layers: [`algorithm`] holds the pure formulas and constant
//! tables, [`engine`] holds the lifecycle state machine that applies them.
//! Nothing in this module touches storage or the system clock.

pub mod algorithm;
pub mod engine;

pub use algorithm::{
    initial_difficulty, initial_stability, next_difficulty, next_forget_stability, next_interval,
    next_recall_stability, retrievability, DEFAULT_RETENTION, EASY_BONUS, INITIAL_DIFFICULTY,
    INITIAL_STABILITY, MAX_DIFFICULTY, MAX_STABILITY, MIN_DIFFICULTY, MIN_STABILITY,
};
pub use engine::{
    LearningState, MemoryState, Rating, ReviewOutcome, ReviewPreview, ReviewScheduler,
    SchedulerParameters,
};
