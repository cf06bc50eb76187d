//! Practice queue assembly.
//!
//! Cards selected for a session carry a source tag that records which pool
//! contributed them. The queue is built by draining one FIFO bucket per
//! source in a fixed rotation, so a learner alternates between overdue
//! material, gap repair, reinforcement, and fresh cards instead of grinding
//! through one block at a time.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::card::ReviewCard;

/// Sessions at or below this size keep plain priority order. Alternating
/// sources only helps once there is enough material to alternate between.
pub const INTERLEAVE_THRESHOLD: usize = 5;

// ============================================================================
// CARD SOURCE
// ============================================================================

/// Which selection pool a session card came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSource {
    /// Past its due date.
    Due,
    /// Exercises a concept flagged as an unresolved knowledge gap.
    Gap,
    /// Exercises a concept whose mastery is decaying.
    Reinforcement,
    /// Never reviewed.
    New,
}

impl CardSource {
    /// Fixed drain order for queue assembly, highest priority first.
    pub const ROTATION: [CardSource; 4] = [
        CardSource::Due,
        CardSource::Gap,
        CardSource::Reinforcement,
        CardSource::New,
    ];

    /// Priority rank, 1 = highest.
    pub fn priority(&self) -> u8 {
        match self {
            CardSource::Due => 1,
            CardSource::Gap => 2,
            CardSource::Reinforcement => 3,
            CardSource::New => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardSource::Due => "due",
            CardSource::Gap => "gap",
            CardSource::Reinforcement => "reinforcement",
            CardSource::New => "new",
        }
    }

    /// Parse a stored name. Unknown names fall back to `Due`.
    pub fn parse_name(name: &str) -> Self {
        match name {
            "gap" => CardSource::Gap,
            "reinforcement" => CardSource::Reinforcement,
            "new" => CardSource::New,
            _ => CardSource::Due,
        }
    }
}

impl std::fmt::Display for CardSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SESSION CARD
// ============================================================================

/// A card placed in a session queue, tagged with why it was selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCard {
    pub card: ReviewCard,
    pub source: CardSource,
    /// Priority rank inherited from the source pool.
    pub priority: u8,
    /// Concepts that caused the selection. Empty for due and new cards.
    pub target_concepts: Vec<String>,
}

impl SessionCard {
    pub fn new(card: ReviewCard, source: CardSource, target_concepts: Vec<String>) -> Self {
        Self {
            card,
            priority: source.priority(),
            source,
            target_concepts,
        }
    }
}

// ============================================================================
// INTERLEAVING
// ============================================================================

/// Merge per-source buckets into the final queue order.
///
/// Buckets are given in rotation order (due, gap, reinforcement, new) and
/// drained round-robin, one card per source per pass, skipping exhausted
/// buckets. Order within a bucket is preserved. Small sessions, at most
/// [`INTERLEAVE_THRESHOLD`] cards total, are returned in plain priority
/// order instead.
pub fn interleave(buckets: [Vec<SessionCard>; 4]) -> Vec<SessionCard> {
    let total: usize = buckets.iter().map(Vec::len).sum();
    if total <= INTERLEAVE_THRESHOLD {
        return buckets.into_iter().flatten().collect();
    }

    let mut queues: Vec<VecDeque<SessionCard>> =
        buckets.into_iter().map(VecDeque::from).collect();
    let mut ordered = Vec::with_capacity(total);
    while ordered.len() < total {
        for queue in queues.iter_mut() {
            if let Some(card) = queue.pop_front() {
                ordered.push(card);
            }
        }
    }
    ordered
}
