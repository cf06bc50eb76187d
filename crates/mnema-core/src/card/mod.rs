//! Card data model: the reviewable unit, its content payloads, and the
//! creation input accepted from the authoring pipeline.

pub mod card;
pub mod content;

pub use card::{NewCardInput, ReviewCard};
pub use content::{CardContent, CardKind, MatchingPair};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate over one owner's card store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    /// Total cards
    pub total_cards: i64,
    /// Reviewed cards currently past their due date
    pub due_now: i64,
    /// Cards never reviewed
    pub new_cards: i64,
    /// Cards stepping toward their first graduation
    pub learning_cards: i64,
    /// Graduated cards on day-level intervals
    pub review_cards: i64,
    /// Lapsed cards stepping back toward graduation
    pub relearning_cards: i64,
    /// Mean stability over reviewed cards
    pub average_stability: f64,
    /// Mean difficulty over reviewed cards
    pub average_difficulty: f64,
    /// Creation time of the first card
    pub oldest_card: Option<DateTime<Utc>>,
    /// Creation time of the latest card
    pub newest_card: Option<DateTime<Utc>>,
}
