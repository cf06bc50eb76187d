//! Session composition.
//!
//! Fills a bounded card budget from four pools in strict priority order:
//! overdue cards, cards repairing unresolved gaps, cards reinforcing
//! decaying concepts, and never-reviewed cards. Pools never overlap; the
//! final queue is round-robin interleaved across sources. Every
//! composition, including an empty one, persists a session record before
//! the queue is handed back.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::card::ReviewCard;
use crate::oracle::{GapOracle, MasteryOracle};
use crate::session::queue::{interleave, CardSource, SessionCard};
use crate::session::{PracticeSession, SessionOptions, SessionRecord, SessionType};
use crate::storage::{Result, Storage};

/// Ceiling on cards drawn for gap repair per session.
const GAP_POOL_CAP: usize = 10;
/// Ceiling on cards drawn for reinforcement per session.
const REINFORCEMENT_POOL_CAP: usize = 5;
/// The due pool keeps at least this much of the budget even when the
/// new-card limit is large.
const DUE_POOL_FLOOR: usize = 20;
/// Bounded scan over not-yet-due cards when matching concepts.
const CONCEPT_SCAN_CAP: i32 = 500;

/// Budget share reserved for overdue cards.
fn due_pool_cap(max_cards: usize, new_card_limit: usize) -> usize {
    max_cards
        .saturating_sub(new_card_limit)
        .max(DUE_POOL_FLOOR)
        .min(max_cards)
}

/// Builds practice sessions from the card store plus external mastery
/// signals. Oracles are consulted per composition; a failing oracle fails
/// the composition rather than silently shrinking it.
pub struct SessionComposer<'a> {
    storage: &'a Storage,
    gap_oracle: &'a dyn GapOracle,
    mastery_oracle: &'a dyn MasteryOracle,
}

impl<'a> SessionComposer<'a> {
    pub fn new(
        storage: &'a Storage,
        gap_oracle: &'a dyn GapOracle,
        mastery_oracle: &'a dyn MasteryOracle,
    ) -> Self {
        Self {
            storage,
            gap_oracle,
            mastery_oracle,
        }
    }

    /// Compose a session against the current clock.
    pub fn compose(&self, owner_id: &str, options: SessionOptions) -> Result<PracticeSession> {
        self.compose_at(owner_id, options, Utc::now())
    }

    /// Compose a session as of an explicit instant. Selection is fully
    /// determined by the store, the oracles, and `now`.
    pub fn compose_at(
        &self,
        owner_id: &str,
        options: SessionOptions,
        now: DateTime<Utc>,
    ) -> Result<PracticeSession> {
        let mut chosen: HashSet<String> = HashSet::new();

        // Pool 1: overdue cards, most overdue first.
        let due_cap = due_pool_cap(options.max_cards, options.new_card_limit);
        let due_pool: Vec<ReviewCard> = if due_cap > 0 {
            self.storage.due_cards(owner_id, now, due_cap as i32)?
        } else {
            Vec::new()
        };
        chosen.extend(due_pool.iter().map(|c| c.id.clone()));
        let mut remaining = options.max_cards.saturating_sub(due_pool.len());

        // Concept signals. Explicit targets bypass the gap oracle.
        let gap_concepts: Vec<String> = if remaining > 0 {
            match &options.target_concept_ids {
                Some(targets) if !targets.is_empty() => targets.clone(),
                _ => self
                    .gap_oracle
                    .unresolved_gaps(owner_id)?
                    .into_iter()
                    .map(|gap| gap.concept_id)
                    .collect(),
            }
        } else {
            Vec::new()
        };
        let decaying_concepts: Vec<String> = if remaining > 0 {
            self.mastery_oracle
                .decaying_concepts(owner_id)?
                .into_iter()
                .map(|mastery| mastery.concept_id)
                .collect()
        } else {
            Vec::new()
        };

        // One bounded scan over not-yet-due cards feeds pools 2 and 3.
        let scan: Vec<ReviewCard> =
            if remaining > 0 && (!gap_concepts.is_empty() || !decaying_concepts.is_empty()) {
                self.storage.upcoming_cards(owner_id, now, CONCEPT_SCAN_CAP)?
            } else {
                Vec::new()
            };

        // Pool 2: gap repair.
        let gap_take = GAP_POOL_CAP.min(remaining);
        let gap_pool: Vec<ReviewCard> = scan
            .iter()
            .filter(|card| !chosen.contains(&card.id) && card.exercises_any(&gap_concepts))
            .take(gap_take)
            .cloned()
            .collect();
        chosen.extend(gap_pool.iter().map(|c| c.id.clone()));
        remaining = remaining.saturating_sub(gap_pool.len());

        // Pool 3: reinforcement of decaying concepts.
        let reinforcement_take = REINFORCEMENT_POOL_CAP.min(remaining);
        let reinforcement_pool: Vec<ReviewCard> = scan
            .iter()
            .filter(|card| {
                !chosen.contains(&card.id) && card.exercises_any(&decaying_concepts)
            })
            .take(reinforcement_take)
            .cloned()
            .collect();
        chosen.extend(reinforcement_pool.iter().map(|c| c.id.clone()));
        remaining = remaining.saturating_sub(reinforcement_pool.len());

        // Pool 4: new cards, oldest first.
        let new_take = options.new_card_limit.min(remaining);
        let new_pool: Vec<ReviewCard> = if new_take > 0 {
            self.storage
                .new_cards(owner_id, new_take as i32)?
                .into_iter()
                .filter(|card| !chosen.contains(&card.id))
                .collect()
        } else {
            Vec::new()
        };

        let due_cards: Vec<SessionCard> = due_pool
            .into_iter()
            .map(|card| SessionCard::new(card, CardSource::Due, Vec::new()))
            .collect();
        let gap_cards: Vec<SessionCard> = gap_pool
            .into_iter()
            .map(|card| {
                let matched = concept_matches(&card, &gap_concepts);
                SessionCard::new(card, CardSource::Gap, matched)
            })
            .collect();
        let reinforcement_cards: Vec<SessionCard> = reinforcement_pool
            .into_iter()
            .map(|card| {
                let matched = concept_matches(&card, &decaying_concepts);
                SessionCard::new(card, CardSource::Reinforcement, matched)
            })
            .collect();
        let new_cards: Vec<SessionCard> = new_pool
            .into_iter()
            .map(|card| SessionCard::new(card, CardSource::New, Vec::new()))
            .collect();

        let mut record = SessionRecord::new(owner_id, options.session_type, now);
        record.due_count = due_cards.len() as i64;
        record.gap_count = gap_cards.len() as i64;
        record.reinforcement_count = reinforcement_cards.len() as i64;
        record.new_count = new_cards.len() as i64;
        record.card_total =
            record.due_count + record.gap_count + record.reinforcement_count + record.new_count;
        record.target_concepts = options.target_concept_ids.unwrap_or_default();

        let cards = interleave([due_cards, gap_cards, reinforcement_cards, new_cards]);

        // Persist before handing the queue back so every session id a
        // caller sees exists in the store.
        self.storage.save_session(&record)?;
        tracing::info!(
            "Composed {} session {} for {}: {} cards ({} due, {} gap, {} reinforcement, {} new)",
            record.session_type,
            record.id,
            owner_id,
            record.card_total,
            record.due_count,
            record.gap_count,
            record.reinforcement_count,
            record.new_count
        );

        Ok(PracticeSession { record, cards })
    }

    /// Session over every concept the gap oracle reports, with no new-card
    /// budget.
    pub fn compose_targeted(&self, owner_id: &str, max_cards: usize) -> Result<PracticeSession> {
        let targets: Vec<String> = self
            .gap_oracle
            .unresolved_gaps(owner_id)?
            .into_iter()
            .map(|gap| gap.concept_id)
            .collect();
        self.compose(
            owner_id,
            SessionOptions {
                max_cards,
                new_card_limit: 0,
                target_concept_ids: Some(targets),
                session_type: SessionType::Targeted,
            },
        )
    }

    /// Session scoped to an explicit set of gap concepts, with no new-card
    /// budget.
    pub fn compose_gap_fix(
        &self,
        owner_id: &str,
        concept_ids: Vec<String>,
        max_cards: usize,
    ) -> Result<PracticeSession> {
        self.compose(
            owner_id,
            SessionOptions {
                max_cards,
                new_card_limit: 0,
                target_concept_ids: Some(concept_ids),
                session_type: SessionType::GapFix,
            },
        )
    }
}

/// Concepts the card shares with the given set, preserving card order.
fn concept_matches(card: &ReviewCard, concepts: &[String]) -> Vec<String> {
    card.concept_ids
        .iter()
        .filter(|id| concepts.contains(id))
        .cloned()
        .collect()
}
