//! # Mnema Core
//!
//! Adaptive review scheduler for spaced-repetition learning:
//!
//! - **Memory model**: per-card stability/difficulty with exponential recall
//!   decay, four-step rating scale, and a learning/review/relearning
//!   lifecycle
//! - **Pure transitions**: the scheduler never reads the clock or touches
//!   storage, so every outcome is previewable and testable
//! - **Session composer**: bounded practice queues drawn from four pools
//!   (due, gap repair, reinforcement, new) with round-robin interleaving
//! - **Mastery oracles**: pluggable gap and decay signals feed the composer
//!   without coupling it to any particular course platform
//! - **SQLite persistence**: WAL-mode store with an append-only review log,
//!   optimistic card versioning, and exactly-once session finalization
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mnema_core::{NewCardInput, SessionComposer, SessionOptions, Storage, NoSignals};
//!
//! // Create storage (uses default platform-specific location)
//! let storage = Storage::new(None)?;
//!
//! // Author a card
//! let input = NewCardInput {
//!     owner_id: "learner-1".to_string(),
//!     front: "What does 'ser' express that 'estar' does not?".to_string(),
//!     ..Default::default()
//! };
//! let card = storage.create_card(input)?;
//!
//! // Submit a review: 3 = good
//! let receipt = storage.submit_review(&card.id, 3, Some(4_200))?;
//! println!("next due {}", receipt.next_due_at);
//!
//! // Compose today's practice queue
//! let signals = NoSignals;
//! let composer = SessionComposer::new(&storage, &signals, &signals);
//! let session = composer.compose("learner-1", SessionOptions::default())?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite from source instead of
//!   linking the system library
//! - `encryption`: SQLCipher at-rest encryption, keyed via the
//!   `MNEMA_ENCRYPTION_KEY` environment variable

#![cfg_attr(docsrs, feature(doc_cfg))]
// Only warn about missing docs for public items exported from the crate root
// Internal struct fields and enum variants don't need documentation
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod oracle;
pub mod scheduler;
pub mod session;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Card model
pub use card::{CardContent, CardKind, DeckStats, MatchingPair, NewCardInput, ReviewCard};

// Scheduling engine
pub use scheduler::{
    initial_difficulty,
    initial_stability,
    next_interval,
    // Core functions for advanced usage
    retrievability,
    LearningState,
    MemoryState,
    Rating,
    ReviewOutcome,
    ReviewPreview,
    ReviewScheduler,
    SchedulerParameters,
    DEFAULT_RETENTION,
};

// Mastery signals
pub use oracle::{
    ConceptGap, ConceptMastery, GapOracle, GapSeverity, MasteryOracle, NoSignals, OracleError,
    DEFAULT_DECAY_RATIO,
};

// Session composition
pub use session::{
    interleave, CardSource, PracticeSession, SessionCard, SessionComposer, SessionOptions,
    SessionRecord, SessionStats, SessionStatus, SessionType,
};

// Storage layer
pub use storage::{Result, ReviewEventRecord, ReviewReceipt, Storage, StorageError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        CardContent, GapOracle, MasteryOracle, NewCardInput, NoSignals, PracticeSession, Rating,
        Result, ReviewCard, ReviewReceipt, ReviewScheduler, SessionComposer, SessionOptions,
        Storage, StorageError,
    };
}
