//! Session Journey Tests
//!
//! Complete practice-session workflows through the composer and storage:
//! composing from mixed pools, working through the queue, finishing or
//! walking away, and reading the aggregates afterwards. Composition runs
//! against an explicit clock a few days out so cards seeded through the
//! harness are genuinely overdue.

use std::collections::HashSet;

use mnema_core::{
    CardSource, NoSignals, SessionComposer, SessionOptions, SessionStatus, SessionType,
    StorageError,
};
use mnema_e2e_tests::fixtures::{unique_owner, FailingOracle, FixedGaps, FixedMastery};
use mnema_e2e_tests::harness::{compose_horizon, TestDb};

#[test]
fn test_daily_session_full_lifecycle() {
    let db = TestDb::new_temp();
    let owner = unique_owner();

    db.seed_due_cards(&owner, 6, "algebra.linear");
    db.seed_upcoming_cards(&owner, 4, "geometry.proofs");
    db.seed_upcoming_cards(&owner, 3, "algebra.quadratics");
    db.seed_new_cards(&owner, 4, "algebra.linear");

    let gaps = FixedGaps::over(&["geometry.proofs"]);
    let mastery = FixedMastery::decaying(&["algebra.quadratics"]);
    let composer = SessionComposer::new(&db.storage, &gaps, &mastery);

    let session = composer
        .compose_at(
            &owner,
            SessionOptions {
                max_cards: 20,
                new_card_limit: 3,
                ..Default::default()
            },
            compose_horizon(),
        )
        .expect("Failed to compose session");

    assert_eq!(session.record.session_type, SessionType::Daily);
    assert_eq!(session.record.status, SessionStatus::InProgress);
    assert_eq!(session.record.due_count, 6);
    assert_eq!(session.record.gap_count, 4);
    assert_eq!(session.record.reinforcement_count, 3);
    assert_eq!(session.record.new_count, 3);
    assert_eq!(session.record.card_total, 16);
    assert_eq!(session.len(), 16);

    // No card appears twice across pools
    let ids: HashSet<&str> = session.cards.iter().map(|c| c.card.id.as_str()).collect();
    assert_eq!(ids.len(), 16);

    // Gap cards carry the concept that pulled them in
    for card in session.cards.iter().filter(|c| c.source == CardSource::Gap) {
        assert!(card.target_concepts.contains(&"geometry.proofs".to_string()));
    }

    // The record was persisted before the queue was handed back
    let stored = db
        .storage
        .get_session(session.id())
        .expect("Failed to read session")
        .expect("Session record missing");
    assert_eq!(stored.card_total, 16);
    assert_eq!(stored.status, SessionStatus::InProgress);

    // Work through four cards, alternating right and wrong
    for i in 0..4 {
        db.storage
            .record_progress(session.id(), i % 2 == 0)
            .expect("Failed to record progress");
    }

    let finished = db
        .storage
        .complete_session(session.id(), &["geometry.proofs".to_string()])
        .expect("Failed to complete session");
    assert_eq!(finished.status, SessionStatus::Completed);
    assert_eq!(finished.completed_cards, 4);
    assert_eq!(finished.correct_cards, 2);
    assert_eq!(finished.gaps_addressed, vec!["geometry.proofs".to_string()]);
    assert!(finished.ended_at.is_some());
    assert!(finished.duration_ms.expect("Duration missing") >= 0);

    let stats = db
        .storage
        .get_session_stats(&owner, 7)
        .expect("Failed to read session stats");
    assert_eq!(stats.sessions_completed, 1);
    assert_eq!(stats.sessions_abandoned, 0);
    assert_eq!(stats.cards_completed, 4);
    assert_eq!(stats.cards_correct, 2);
    assert!((stats.accuracy - 0.5).abs() < 1e-9);
}

#[test]
fn test_large_session_interleaves_sources() {
    let db = TestDb::new_temp();
    let owner = unique_owner();

    db.seed_due_cards(&owner, 3, "c.due");
    db.seed_upcoming_cards(&owner, 2, "c.gap");
    db.seed_upcoming_cards(&owner, 1, "c.rein");
    db.seed_new_cards(&owner, 2, "c.new");

    let gaps = FixedGaps::over(&["c.gap"]);
    let mastery = FixedMastery::decaying(&["c.rein"]);
    let composer = SessionComposer::new(&db.storage, &gaps, &mastery);

    let session = composer
        .compose_at(&owner, SessionOptions::default(), compose_horizon())
        .expect("Failed to compose session");
    assert_eq!(session.len(), 8);

    let sources: Vec<CardSource> = session.cards.iter().map(|c| c.source).collect();
    assert_eq!(
        &sources[..4],
        &[
            CardSource::Due,
            CardSource::Gap,
            CardSource::Reinforcement,
            CardSource::New,
        ]
    );
    // Second rotation: the reinforcement bucket is already empty
    assert_eq!(sources[4], CardSource::Due);
    assert_eq!(sources[5], CardSource::Gap);
    assert_eq!(sources[6], CardSource::New);
    assert_eq!(sources[7], CardSource::Due);
}

#[test]
fn test_small_session_keeps_block_order() {
    let db = TestDb::new_temp();
    let owner = unique_owner();

    db.seed_due_cards(&owner, 2, "c.due");
    db.seed_new_cards(&owner, 1, "c.new");

    let signals = NoSignals;
    let composer = SessionComposer::new(&db.storage, &signals, &signals);

    let session = composer
        .compose_at(&owner, SessionOptions::default(), compose_horizon())
        .expect("Failed to compose session");

    let sources: Vec<CardSource> = session.cards.iter().map(|c| c.source).collect();
    assert_eq!(
        sources,
        vec![CardSource::Due, CardSource::Due, CardSource::New]
    );
}

#[test]
fn test_abandoned_session_refuses_further_work() {
    let db = TestDb::new_temp();
    let owner = unique_owner();
    db.seed_new_cards(&owner, 3, "c.new");

    let signals = NoSignals;
    let composer = SessionComposer::new(&db.storage, &signals, &signals);
    let session = composer
        .compose(&owner, SessionOptions::default())
        .expect("Failed to compose session");
    assert_eq!(session.len(), 3);

    db.storage
        .record_progress(session.id(), true)
        .expect("Failed to record progress");

    let abandoned = db
        .storage
        .abandon_session(session.id())
        .expect("Failed to abandon session");
    assert_eq!(abandoned.status, SessionStatus::Abandoned);
    assert_eq!(abandoned.completed_cards, 1);
    assert!(abandoned.ended_at.is_some());
    assert!(abandoned.duration_ms.expect("Duration missing") >= 0);

    // The clock is stopped: nothing more can be recorded or finalized
    let err = db
        .storage
        .record_progress(session.id(), true)
        .expect_err("Progress after abandon must be refused");
    assert!(matches!(err, StorageError::Conflict(_)));

    let err = db
        .storage
        .complete_session(session.id(), &[])
        .expect_err("Completion after abandon must be refused");
    assert!(matches!(err, StorageError::Conflict(_)));

    // Abandoned practice never counts toward completed-card aggregates
    let stats = db
        .storage
        .get_session_stats(&owner, 7)
        .expect("Failed to read session stats");
    assert_eq!(stats.sessions_abandoned, 1);
    assert_eq!(stats.sessions_completed, 0);
    assert_eq!(stats.cards_completed, 0);
}

#[test]
fn test_empty_session_is_valid_and_persisted() {
    let db = TestDb::new_temp();
    let owner = unique_owner();

    let signals = NoSignals;
    let composer = SessionComposer::new(&db.storage, &signals, &signals);
    let session = composer
        .compose(&owner, SessionOptions::default())
        .expect("Failed to compose empty session");

    assert!(session.is_empty());
    assert_eq!(session.record.card_total, 0);

    let stored = db
        .storage
        .get_session(session.id())
        .expect("Failed to read session")
        .expect("Empty session record missing");
    assert_eq!(stored.card_total, 0);
    assert_eq!(stored.status, SessionStatus::InProgress);

    // An empty session completes like any other
    let finished = db
        .storage
        .complete_session(session.id(), &[])
        .expect("Failed to complete empty session");
    assert_eq!(finished.status, SessionStatus::Completed);
    assert_eq!(finished.completed_cards, 0);

    let stats = db
        .storage
        .get_session_stats(&owner, 7)
        .expect("Failed to read session stats");
    assert_eq!(stats.sessions_completed, 1);
    assert_eq!(stats.cards_completed, 0);
    assert!((stats.accuracy - 0.0).abs() < 1e-9);
}

#[test]
fn test_targeted_session_excludes_new_cards() {
    let db = TestDb::new_temp();
    let owner = unique_owner();

    db.seed_due_cards(&owner, 3, "g.concept");
    db.seed_upcoming_cards(&owner, 2, "g.concept");
    db.seed_new_cards(&owner, 5, "g.concept");

    let gaps = FixedGaps::over(&["g.concept"]);
    let mastery = FixedMastery::none();
    let composer = SessionComposer::new(&db.storage, &gaps, &mastery);

    // Composed against the real clock: every reviewed card is still ahead
    // of its due date, so the whole queue comes from the gap pool
    let session = composer
        .compose_targeted(&owner, 10)
        .expect("Failed to compose targeted session");

    assert_eq!(session.record.session_type, SessionType::Targeted);
    assert_eq!(session.record.target_concepts, vec!["g.concept".to_string()]);
    assert_eq!(session.record.new_count, 0);
    assert_eq!(session.record.gap_count, 5);
    assert_eq!(session.len(), 5);
    for card in &session.cards {
        assert_eq!(card.source, CardSource::Gap);
        assert!(card.card.exercises_any(&["g.concept".to_string()]));
    }
}

#[test]
fn test_gap_fix_session_scopes_to_requested_concepts() {
    let db = TestDb::new_temp();
    let owner = unique_owner();

    db.seed_upcoming_cards(&owner, 3, "weak.a");
    db.seed_upcoming_cards(&owner, 3, "other.b");
    db.seed_new_cards(&owner, 4, "weak.a");

    // Explicit targets bypass the gap oracle entirely
    let gaps = FixedGaps::none();
    let mastery = FixedMastery::none();
    let composer = SessionComposer::new(&db.storage, &gaps, &mastery);

    let session = composer
        .compose_gap_fix(&owner, vec!["weak.a".to_string()], 10)
        .expect("Failed to compose gap-fix session");

    assert_eq!(session.record.session_type, SessionType::GapFix);
    assert_eq!(session.record.target_concepts, vec!["weak.a".to_string()]);
    assert_eq!(session.record.gap_count, 3);
    assert_eq!(session.record.new_count, 0);
    assert_eq!(session.len(), 3);
    for card in &session.cards {
        assert_eq!(card.source, CardSource::Gap);
        assert!(card.card.exercises_any(&["weak.a".to_string()]));
        assert!(!card.card.exercises_any(&["other.b".to_string()]));
    }
}

#[test]
fn test_oracle_failure_fails_composition_before_persisting() {
    let db = TestDb::new_temp();
    let owner = unique_owner();
    db.seed_new_cards(&owner, 2, "c.new");

    let oracle = FailingOracle;
    let composer = SessionComposer::new(&db.storage, &oracle, &oracle);

    let err = composer
        .compose(&owner, SessionOptions::default())
        .expect_err("Composition must surface oracle failures");
    assert!(matches!(err, StorageError::Oracle(_)));

    // Nothing was persisted for the failed attempt
    let sessions = db
        .storage
        .recent_sessions(&owner, 10)
        .expect("Failed to list sessions");
    assert!(sessions.is_empty());
}

#[test]
fn test_due_backlog_fills_budget_and_skips_signal_pools() {
    let db = TestDb::new_temp();
    let owner = unique_owner();
    db.seed_due_cards(&owner, 25, "c.backlog");

    // With the budget spent on overdue cards the oracles are never
    // consulted, so even failing ones cannot break composition
    let oracle = FailingOracle;
    let composer = SessionComposer::new(&db.storage, &oracle, &oracle);

    let session = composer
        .compose_at(
            &owner,
            SessionOptions {
                max_cards: 10,
                new_card_limit: 2,
                ..Default::default()
            },
            compose_horizon(),
        )
        .expect("Failed to compose session from backlog");

    assert_eq!(session.len(), 10);
    assert_eq!(session.record.due_count, 10);
    assert_eq!(session.record.gap_count, 0);
    assert_eq!(session.record.reinforcement_count, 0);
    assert_eq!(session.record.new_count, 0);
    assert!(session.cards.iter().all(|c| c.source == CardSource::Due));
}

#[test]
fn test_session_stats_isolate_owners() {
    let db = TestDb::new_temp();
    let owner_a = unique_owner();
    let owner_b = unique_owner();
    db.seed_new_cards(&owner_a, 2, "c.shared");
    db.seed_new_cards(&owner_b, 2, "c.shared");

    let signals = NoSignals;
    let composer = SessionComposer::new(&db.storage, &signals, &signals);

    let session_a = composer
        .compose(&owner_a, SessionOptions::default())
        .expect("Failed to compose session");
    db.storage
        .record_progress(session_a.id(), true)
        .expect("Failed to record progress");
    db.storage
        .record_progress(session_a.id(), false)
        .expect("Failed to record progress");
    db.storage
        .complete_session(session_a.id(), &[])
        .expect("Failed to complete session");

    let session_b = composer
        .compose(&owner_b, SessionOptions::default())
        .expect("Failed to compose session");
    db.storage
        .abandon_session(session_b.id())
        .expect("Failed to abandon session");

    let stats_a = db
        .storage
        .get_session_stats(&owner_a, 7)
        .expect("Failed to read stats");
    assert_eq!(stats_a.sessions_completed, 1);
    assert_eq!(stats_a.sessions_abandoned, 0);
    assert_eq!(stats_a.cards_completed, 2);
    assert_eq!(stats_a.cards_correct, 1);

    let stats_b = db
        .storage
        .get_session_stats(&owner_b, 7)
        .expect("Failed to read stats");
    assert_eq!(stats_b.sessions_completed, 0);
    assert_eq!(stats_b.sessions_abandoned, 1);
    assert_eq!(stats_b.cards_completed, 0);
}
