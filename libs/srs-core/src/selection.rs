//! Next-card selection.
//!
//! New cards are drained least-seen first. Once every card has graduated,
//! due review cards are drawn at random, weighted towards cards that are
//! more overdue or have lapsed more often. Every due card keeps a non-zero
//! weight so none of them starves.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::{CardState, Counts, Timestamp, DAY_MS};

/// Cards still in the introduction phase, ordered by id.
pub fn learning_pool<'a, I>(states: I, learning_steps: u32) -> Vec<(&'a str, &'a CardState)>
where
    I: IntoIterator<Item = (&'a str, &'a CardState)>,
{
    let mut pool: Vec<_> = states
        .into_iter()
        .filter(|(_, s)| s.is_learning(learning_steps))
        .collect();
    pool.sort_by(|a, b| a.0.cmp(b.0));
    pool
}

/// Review cards whose due date has passed, ordered by id.
pub fn due_pool<'a, I>(states: I, now: Timestamp) -> Vec<(&'a str, &'a CardState)>
where
    I: IntoIterator<Item = (&'a str, &'a CardState)>,
{
    let mut pool: Vec<_> = states.into_iter().filter(|(_, s)| s.is_due(now)).collect();
    pool.sort_by(|a, b| a.0.cmp(b.0));
    pool
}

/// Queue sizes for the given states.
pub fn counts<'a, I>(states: I, now: Timestamp, learning_steps: u32) -> Counts
where
    I: IntoIterator<Item = (&'a str, &'a CardState)>,
{
    states
        .into_iter()
        .fold(Counts::default(), |mut counts, (_, state)| {
            if state.is_learning(learning_steps) {
                counts.learning_remaining += 1;
            } else if state.is_due(now) {
                counts.due_count += 1;
            }
            counts
        })
}

/// Draw weight of a due card: `1 + overdue days + lapses * 0.5`.
pub fn selection_weight(state: &CardState, now: Timestamp) -> f64 {
    let overdue_days = (now.saturating_sub(state.due_at) as f64 / DAY_MS as f64).max(0.0);
    1.0 + overdue_days + state.lapses as f64 * 0.5
}

/// Pick the next card to present, or `None` when nothing is eligible.
pub fn select_next<'a, I, R>(
    states: I,
    now: Timestamp,
    learning_steps: u32,
    rng: &mut R,
) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a CardState)> + Clone,
    R: Rng + ?Sized,
{
    let learning = learning_pool(states.clone(), learning_steps);
    if let Some(min_seen) = learning.iter().map(|(_, s)| s.seen_count).min() {
        let least_seen: Vec<&str> = learning
            .iter()
            .filter(|(_, s)| s.seen_count == min_seen)
            .map(|(id, _)| *id)
            .collect();
        return least_seen.choose(rng).copied();
    }

    weighted_pick(&due_pool(states, now), now, rng)
}

/// Cumulative-sum draw proportional to [`selection_weight`].
pub fn weighted_pick<'a, R>(
    candidates: &[(&'a str, &'a CardState)],
    now: Timestamp,
    rng: &mut R,
) -> Option<&'a str>
where
    R: Rng + ?Sized,
{
    let weights: Vec<f64> = candidates
        .iter()
        .map(|(_, s)| selection_weight(s, now))
        .collect();
    let total: f64 = weights.iter().sum();
    if candidates.is_empty() || total <= 0.0 {
        return None;
    }

    let mut target = rng.gen_range(0.0..total);
    for ((id, _), weight) in candidates.iter().zip(&weights) {
        if target < *weight {
            return Some(*id);
        }
        target -= weight;
    }
    // Float drift can leave a sliver past the last bucket.
    candidates.last().map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const NOW: Timestamp = 1_700_000_000_000;

    fn learning(seen_count: u32) -> CardState {
        CardState {
            seen_count,
            ..CardState::new(NOW)
        }
    }

    fn review(due_at: Timestamp, lapses: u32) -> CardState {
        CardState {
            phase: Phase::Review,
            seen_count: 10,
            due_at,
            interval: 1,
            repetition: 1,
            lapses,
            ..CardState::new(NOW)
        }
    }

    fn refs(states: &[(String, CardState)]) -> Vec<(&str, &CardState)> {
        states.iter().map(|(id, s)| (id.as_str(), s)).collect()
    }

    #[test]
    fn least_seen_learning_cards_come_first() {
        let states = vec![
            ("a".to_string(), learning(0)),
            ("b".to_string(), learning(0)),
            ("c".to_string(), learning(3)),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let picked = select_next(refs(&states), NOW, 10, &mut rng);
            assert_ne!(picked, Some("c"));
            assert!(picked.is_some());
        }
    }

    #[test]
    fn learning_cards_take_priority_over_due_reviews() {
        let states = vec![
            ("due".to_string(), review(NOW - 5 * DAY_MS, 3)),
            ("new".to_string(), learning(8)),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_next(refs(&states), NOW, 10, &mut rng), Some("new"));
    }

    #[test]
    fn none_only_when_both_pools_empty() {
        let states = vec![
            ("future".to_string(), review(NOW + DAY_MS, 0)),
            ("later".to_string(), review(NOW + 1, 2)),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(select_next(refs(&states), NOW, 10, &mut rng), None);

        let states = vec![
            ("future".to_string(), review(NOW + DAY_MS, 0)),
            ("now".to_string(), review(NOW, 0)),
        ];
        assert_eq!(select_next(refs(&states), NOW, 10, &mut rng), Some("now"));
    }

    #[test]
    fn empty_store_selects_nothing() {
        let states: Vec<(String, CardState)> = Vec::new();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(select_next(refs(&states), NOW, 10, &mut rng), None);
    }

    #[test]
    fn weight_grows_with_overdue_days_and_lapses() {
        assert_eq!(selection_weight(&review(NOW, 0), NOW), 1.0);
        assert_eq!(selection_weight(&review(NOW - 2 * DAY_MS, 0), NOW), 3.0);
        assert_eq!(selection_weight(&review(NOW - 2 * DAY_MS, 2), NOW), 4.0);
        // Not yet due never goes below the base weight.
        assert_eq!(selection_weight(&review(NOW + DAY_MS, 0), NOW), 1.0);
    }

    #[test]
    fn extreme_due_dates_do_not_overflow() {
        let ancient = selection_weight(&review(i64::MIN, 0), NOW);
        assert!(ancient.is_finite() && ancient > 1.0);
        assert_eq!(selection_weight(&review(i64::MAX, 0), i64::MIN), 1.0);

        let states = vec![
            ("ancient".to_string(), review(i64::MIN, 0)),
            ("today".to_string(), review(NOW, 0)),
        ];
        let mut rng = StdRng::seed_from_u64(5);
        assert!(select_next(refs(&states), NOW, 10, &mut rng).is_some());
    }

    #[test]
    fn weighted_draw_matches_weights() {
        // Weights 1 and 3.
        let states = vec![
            ("light".to_string(), review(NOW, 0)),
            ("heavy".to_string(), review(NOW - 2 * DAY_MS, 0)),
        ];
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 20_000;
        let heavy = (0..trials)
            .filter(|_| select_next(refs(&states), NOW, 10, &mut rng) == Some("heavy"))
            .count();
        let share = heavy as f64 / trials as f64;
        assert!((share - 0.75).abs() < 0.02, "heavy share was {share}");
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let states = vec![
            ("a".to_string(), review(NOW - DAY_MS, 1)),
            ("b".to_string(), review(NOW - 3 * DAY_MS, 0)),
            ("c".to_string(), review(NOW, 4)),
        ];
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| select_next(refs(&states), NOW, 10, &mut rng).map(str::to_string))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(9), picks(9));
    }

    #[test]
    fn counts_split_pools() {
        let states = vec![
            ("a".to_string(), learning(0)),
            ("b".to_string(), learning(9)),
            ("c".to_string(), review(NOW - 1, 0)),
            ("d".to_string(), review(NOW + 1, 0)),
        ];
        let counts = counts(refs(&states), NOW, 10);
        assert_eq!(counts.learning_remaining, 2);
        assert_eq!(counts.due_count, 1);
    }
}
