//! Scheduling Property Tests
//!
//! Invariants of the memory model exercised through the pure scheduler:
//! bounds that must survive arbitrarily long rating histories, monotonicity
//! of the rating axis, the retrievability curve, and determinism. Walks use
//! a seeded xorshift generator so every run replays the same histories.

use chrono::{DateTime, Duration, Utc};
use mnema_core::scheduler::{MAX_DIFFICULTY, MAX_STABILITY, MIN_DIFFICULTY, MIN_STABILITY};
use mnema_core::{
    retrievability, LearningState, MemoryState, Rating, ReviewScheduler, SchedulerParameters,
};

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

fn epoch() -> DateTime<Utc> {
    "2025-01-06T09:00:00Z".parse().expect("Invalid epoch")
}

/// Drive one card through `steps` reviews with seeded-random ratings and
/// lateness, checking the model invariants after every transition. Returns
/// the final state for determinism checks.
fn rating_walk(seed: u64, steps: i32) -> MemoryState {
    let scheduler = ReviewScheduler::new();
    let mut rng = XorShift64::new(seed);
    let mut state = scheduler.new_card();
    let mut at = epoch();
    let mut again_count = 0;

    for step in 1..=steps {
        let rating = Rating::from_i32(1 + (rng.next() % 4) as i32).expect("Rating in range");
        if rating == Rating::Again {
            again_count += 1;
        }

        let outcome = scheduler.review(&state, rating, at);

        assert!(outcome.due_at > at, "Seed {seed} step {step}: due in the past");
        assert_eq!(outcome.state.reps, step);
        assert_eq!(outcome.state.lapses, again_count);
        assert_eq!(outcome.state.last_reviewed, Some(at));
        assert!(
            outcome.state.stability >= MIN_STABILITY && outcome.state.stability <= MAX_STABILITY,
            "Seed {seed} step {step}: stability {} out of bounds",
            outcome.state.stability
        );
        assert!(
            outcome.state.difficulty >= MIN_DIFFICULTY
                && outcome.state.difficulty <= MAX_DIFFICULTY,
            "Seed {seed} step {step}: difficulty {} out of bounds",
            outcome.state.difficulty
        );

        match outcome.state.state {
            LearningState::Review => {
                assert!(outcome.interval_days >= 1 && outcome.interval_days <= 365);
                assert_eq!(outcome.state.scheduled_days, outcome.interval_days);
                assert_eq!(outcome.due_at, at + Duration::days(outcome.interval_days));
            }
            LearningState::Learning | LearningState::Relearning => {
                assert_eq!(outcome.interval_days, 0);
                assert_eq!(outcome.state.scheduled_days, 0);
                assert!(outcome.due_at - at <= Duration::minutes(10));
            }
            LearningState::New => {
                panic!("Seed {seed} step {step}: reviewed card fell back to new")
            }
        }

        // Review somewhere at or past the due date, sometimes days late
        let late_days = (rng.next() % 3) as i64;
        let late_minutes = (rng.next() % 45) as i64;
        at = outcome.due_at + Duration::days(late_days) + Duration::minutes(late_minutes);
        state = outcome.state;
    }

    state
}

#[test]
fn test_bounds_hold_over_long_rating_walks() {
    for seed in [1, 7, 42, 1234, 0xBAD5EED, 0x9E3779B9, 31_337, 2_026] {
        let final_state = rating_walk(seed, 400);
        assert_eq!(final_state.reps, 400);
        assert!(final_state.lapses <= 400);
    }
}

#[test]
fn test_walks_are_replayable() {
    for seed in [3, 99, 0xFEED] {
        let first = rating_walk(seed, 150);
        let second = rating_walk(seed, 150);
        assert_eq!(first, second);
    }
}

#[test]
fn test_better_ratings_never_schedule_sooner() {
    let scheduler = ReviewScheduler::new();
    let now = epoch();

    for &stability in &[0.5f64, 1.0, 3.0, 10.0, 30.0, 120.0, 365.0] {
        for &difficulty in &[0.1, 0.3, 0.6, 0.9] {
            for &elapsed_factor in &[0.5, 1.0, 2.0] {
                let elapsed = ((stability * elapsed_factor).round() as i64).max(1);
                let state = MemoryState {
                    stability,
                    difficulty,
                    reps: 4,
                    lapses: 0,
                    state: LearningState::Review,
                    last_reviewed: Some(now - Duration::days(elapsed)),
                    scheduled_days: elapsed,
                };
                let preview = scheduler.preview(&state, now);

                assert_eq!(preview.again.interval_days, 0);
                assert_eq!(preview.again.state.state, LearningState::Relearning);
                assert!(preview.again.state.stability <= stability);

                assert!(preview.hard.interval_days <= preview.good.interval_days);
                assert!(preview.good.interval_days <= preview.easy.interval_days);
                assert!(preview.hard.state.stability <= preview.good.state.stability);
                assert!(preview.good.state.stability <= preview.easy.state.stability);
                assert_eq!(preview.good.state.state, LearningState::Review);

                // Good and Easy always grow stability up to the cap; Hard may
                // shrink it when a difficult card is reviewed early
                assert!(preview.good.state.stability >= stability.min(365.0));
            }
        }
    }
}

#[test]
fn test_retrievability_curve_identities() {
    // Fresh reviews always predict certain recall
    for &stability in &[0.5, 1.0, 5.0, 50.0, 365.0] {
        assert_eq!(retrievability(stability, 0.0), 1.0);
    }

    // At elapsed == stability the curve passes through e^-1
    let e_inv = (-1.0f64).exp();
    for &stability in &[0.5, 3.0, 28.0, 200.0] {
        assert!((retrievability(stability, stability) - e_inv).abs() < 1e-12);
    }

    // Decreasing in elapsed time, increasing in stability
    let mut previous = 1.0;
    for elapsed in 1..=20 {
        let r = retrievability(10.0, f64::from(elapsed));
        assert!(r < previous && r > 0.0);
        previous = r;
    }
    assert!(retrievability(5.0, 10.0) < retrievability(50.0, 10.0));

    // The state view agrees with the raw curve
    let now = epoch();
    let state = MemoryState {
        stability: 10.0,
        difficulty: 0.3,
        reps: 2,
        lapses: 0,
        state: LearningState::Review,
        last_reviewed: Some(now - Duration::days(10)),
        scheduled_days: 10,
    };
    assert!((state.retrievability(now) - e_inv).abs() < 1e-9);
}

#[test]
fn test_target_retention_shifts_first_schedule() {
    let now = epoch();
    let default = ReviewScheduler::new();
    let lenient = ReviewScheduler::with_parameters(SchedulerParameters {
        target_retention: 0.8,
        ..SchedulerParameters::default()
    });
    let strict = ReviewScheduler::with_parameters(SchedulerParameters {
        target_retention: 0.95,
        ..SchedulerParameters::default()
    });

    // Same stability seed of 3 days; only the due-time retention changes
    let good_default = default.review(&default.new_card(), Rating::Good, now);
    let good_lenient = lenient.review(&lenient.new_card(), Rating::Good, now);
    let good_strict = strict.review(&strict.new_card(), Rating::Good, now);

    assert_eq!(good_default.interval_days, 3);
    assert_eq!(good_lenient.interval_days, 6);
    assert_eq!(good_strict.interval_days, 1);
    assert_eq!(good_default.state.stability, good_lenient.state.stability);
}

#[test]
fn test_steady_good_reviews_lengthen_intervals_to_the_cap() {
    let scheduler = ReviewScheduler::new();
    let mut state = scheduler.new_card();
    let mut at = epoch();
    let mut last_interval = 0;

    for _ in 0..12 {
        let outcome = scheduler.review(&state, Rating::Good, at);

        assert!(outcome.interval_days >= last_interval);
        assert!(outcome.interval_days <= 365);
        assert!(outcome.state.stability >= state.stability);

        last_interval = outcome.interval_days;
        at = outcome.due_at;
        state = outcome.state;
    }

    assert_eq!(state.state, LearningState::Review);
    assert_eq!(state.reps, 12);
    assert_eq!(state.lapses, 0);
    // A spotless year-long history saturates at the interval ceiling
    assert_eq!(last_interval, 365);
}
