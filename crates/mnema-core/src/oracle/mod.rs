//! Collaborator seams for gap detection and concept mastery.
//!
//! The scheduler consumes these signals but never computes them: a host
//! wires in its own implementations, and hosts without a mastery subsystem
//! use [`NoSignals`]. Oracle failures surface to composition callers as
//! storage-level oracle errors; an empty signal set is not a failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Failure reported by a gap or mastery collaborator
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle query failed: {0}")]
    Query(String),
}

// ============================================================================
// SIGNAL TYPES
// ============================================================================

/// How urgently a detected gap needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapSeverity {
    /// Blocks progress; schedule remediation first
    Critical,
    /// Weak but workable understanding
    Moderate,
}

impl GapSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapSeverity::Critical => "critical",
            GapSeverity::Moderate => "moderate",
        }
    }

    /// Parse a stored name, defaulting to `Moderate` for unknown values
    pub fn parse_name(s: &str) -> Self {
        match s {
            "critical" => GapSeverity::Critical,
            _ => GapSeverity::Moderate,
        }
    }
}

impl std::fmt::Display for GapSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unresolved knowledge gap on a single concept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptGap {
    pub concept_id: String,
    pub severity: GapSeverity,
    pub detected_at: DateTime<Utc>,
}

/// Default decay threshold: a concept counts as decaying once its current
/// mastery falls below this fraction of its peak
pub const DEFAULT_DECAY_RATIO: f64 = 0.7;

/// Mastery trajectory of a single concept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMastery {
    pub concept_id: String,
    /// Present mastery estimate in [0, 1]
    pub current_mastery: f64,
    /// Highest mastery the learner has held on this concept
    pub peak_mastery: f64,
}

impl ConceptMastery {
    /// True when current mastery has fallen below `ratio` of peak
    pub fn is_decaying(&self, ratio: f64) -> bool {
        self.peak_mastery > 0.0 && self.current_mastery < self.peak_mastery * ratio
    }
}

// ============================================================================
// ORACLE TRAITS
// ============================================================================

/// Source of unresolved knowledge gaps for a learner
pub trait GapOracle: Send + Sync {
    /// Unresolved gaps for the learner; resolved gaps are never returned
    fn unresolved_gaps(&self, owner_id: &str) -> Result<Vec<ConceptGap>, OracleError>;
}

/// Source of concept-mastery trajectories for a learner
pub trait MasteryOracle: Send + Sync {
    /// Concepts whose mastery is decaying and worth reinforcing
    fn decaying_concepts(&self, owner_id: &str) -> Result<Vec<ConceptMastery>, OracleError>;

    /// Mastery trajectory for one concept, if tracked
    fn concept_mastery(
        &self,
        owner_id: &str,
        concept_id: &str,
    ) -> Result<Option<ConceptMastery>, OracleError>;
}

/// Null oracle: no gaps, no decay. For hosts without a mastery subsystem
/// and for tests that exercise pure scheduling behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignals;

impl GapOracle for NoSignals {
    fn unresolved_gaps(&self, _owner_id: &str) -> Result<Vec<ConceptGap>, OracleError> {
        Ok(vec![])
    }
}

impl MasteryOracle for NoSignals {
    fn decaying_concepts(&self, _owner_id: &str) -> Result<Vec<ConceptMastery>, OracleError> {
        Ok(vec![])
    }

    fn concept_mastery(
        &self,
        _owner_id: &str,
        _concept_id: &str,
    ) -> Result<Option<ConceptMastery>, OracleError> {
        Ok(None)
    }
}

// ============================================================================
// TESTS
// ============================================================================
