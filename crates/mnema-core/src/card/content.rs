//! Card content payloads.
//!
//! The scheduler treats content as opaque: it stores and returns these
//! payloads but never branches on them. Only the presentation layer and the
//! authoring pipeline interpret the variants.

use serde::{Deserialize, Serialize};

// ============================================================================
// CARD KINDS
// ============================================================================

/// Content variant tag, stored alongside the payload for filtering
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CardKind {
    /// Prompt on the front, free-form answer on the back
    #[default]
    Flashcard,
    /// One correct option among distractors
    MultipleChoice,
    /// Left/right pair association
    Matching,
    /// Fill-in-the-blank over a text span
    Cloze,
}

impl CardKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Flashcard => "flashcard",
            CardKind::MultipleChoice => "multipleChoice",
            CardKind::Matching => "matching",
            CardKind::Cloze => "cloze",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s {
            "multipleChoice" | "multiple_choice" => CardKind::MultipleChoice,
            "matching" => CardKind::Matching,
            "cloze" => CardKind::Cloze,
            _ => CardKind::Flashcard,
        }
    }
}

impl std::fmt::Display for CardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CONTENT PAYLOADS
// ============================================================================

/// One left/right association inside a matching card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPair {
    pub left: String,
    pub right: String,
}

/// Tagged content payload of a card.
///
/// Serialized as `{"type": "...", ...}` and persisted as a JSON TEXT column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CardContent {
    /// Free-form answer text
    Flashcard { back: String },
    /// Options with the index of the correct one
    MultipleChoice {
        options: Vec<String>,
        correct_index: usize,
    },
    /// Pairs to be associated
    Matching { pairs: Vec<MatchingPair> },
    /// Text with blanked spans and their expected answers
    Cloze {
        text: String,
        answers: Vec<String>,
    },
}

impl CardContent {
    /// Variant tag of this payload
    pub fn kind(&self) -> CardKind {
        match self {
            CardContent::Flashcard { .. } => CardKind::Flashcard,
            CardContent::MultipleChoice { .. } => CardKind::MultipleChoice,
            CardContent::Matching { .. } => CardKind::Matching,
            CardContent::Cloze { .. } => CardKind::Cloze,
        }
    }
}

impl Default for CardContent {
    fn default() -> Self {
        CardContent::Flashcard {
            back: String::new(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
