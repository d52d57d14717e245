//! SM-2 with a fixed-length introduction phase.
//!
//! New cards are shown repeatedly until they have been graded
//! `learning_steps` times, then graduate into classic SuperMemo 2 review.

use super::SchedulingAlgorithm;
use crate::types::{CardState, Grade, Phase, Timestamp, DAY_MS};

/// SM-2 algorithm with configurable parameters.
#[derive(Debug, Clone)]
pub struct InfiniteSm2 {
    pub learning_steps: u32,
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub easy_bonus: f64,
}

impl Default for InfiniteSm2 {
    fn default() -> Self {
        Self {
            learning_steps: 10,
            initial_ease: 2.5,
            minimum_ease: 1.3,
            easy_bonus: 1.15,
        }
    }
}

impl SchedulingAlgorithm for InfiniteSm2 {
    fn name(&self) -> &'static str {
        "infinite-sm2"
    }

    fn learning_steps(&self) -> u32 {
        self.learning_steps
    }

    fn initial_state(&self, now: Timestamp) -> CardState {
        CardState {
            ease: self.initial_ease,
            ..CardState::new(now)
        }
    }

    fn schedule(&self, state: &CardState, grade: Grade, now: Timestamp) -> CardState {
        let mut next = match state.phase {
            Phase::Learning => self.schedule_learning(state, now),
            Phase::Review => self.schedule_review(state, grade.quality(), now),
        };
        next.last_reviewed_at = Some(now);
        next
    }
}

impl InfiniteSm2 {
    fn schedule_learning(&self, state: &CardState, now: Timestamp) -> CardState {
        let seen_count = state.seen_count + 1;
        if seen_count < self.learning_steps {
            return CardState {
                seen_count,
                due_at: now,
                ..state.clone()
            };
        }

        // Graduation is fixed regardless of grade; ease is left alone.
        CardState {
            phase: Phase::Review,
            seen_count,
            interval: 1,
            repetition: 1,
            due_at: now + DAY_MS,
            ..state.clone()
        }
    }

    fn schedule_review(&self, state: &CardState, quality: u8, now: Timestamp) -> CardState {
        let (interval, repetition, lapses) = if quality < 3 {
            let lapses = if quality == Grade::Again.quality() {
                state.lapses + 1
            } else {
                state.lapses
            };
            (1, 0, lapses)
        } else {
            let interval = match state.repetition {
                0 => 1,
                1 => 6,
                _ => {
                    let bonus = if quality == 5 { self.easy_bonus } else { 1.0 };
                    (state.interval as f64 * state.ease * bonus).round() as u32
                }
            };
            (interval, state.repetition + 1, state.lapses)
        };

        CardState {
            phase: Phase::Review,
            seen_count: state.seen_count,
            due_at: now + interval as i64 * DAY_MS,
            interval,
            repetition,
            ease: self.next_ease(state.ease, quality),
            lapses,
            last_reviewed_at: state.last_reviewed_at,
        }
    }

    fn next_ease(&self, ease: f64, quality: u8) -> f64 {
        let miss = 5.0 - quality as f64;
        (ease + (0.1 - miss * (0.08 + miss * 0.02))).max(self.minimum_ease)
    }
}
