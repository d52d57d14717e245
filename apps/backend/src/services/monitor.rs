//! Queue monitor: refills the deck when the learner runs out of cards.
//!
//! At most one generation runs at a time, attempts are spaced by a
//! cooldown, and failures are reported rather than retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use srs_core::{validate_batch, BatchRules, CardStore, Clock, SchedulingAlgorithm, Timestamp};

use super::lock;
use super::source::{CardSource, GenerationError};
use super::sync::SyncCoordinator;

/// Why a generation request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    CoolingDown,
    InFlight,
    NoCredential,
}

/// Result of a generation request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Skipped(SkipReason),
    Added { received: usize, inserted: usize },
}

/// Generation state shown to the learner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub in_flight: bool,
    pub last_generation_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub source_configured: bool,
}

struct MonitorInner {
    source: Option<Arc<dyn CardSource>>,
    store: Arc<Mutex<CardStore>>,
    clock: Arc<dyn Clock>,
    algorithm: Arc<dyn SchedulingAlgorithm>,
    sync: SyncCoordinator,
    rules: BatchRules,
    cooldown: Duration,
    max_cards: usize,
    last_generation_at: Mutex<Option<Timestamp>>,
    in_flight: AtomicBool,
    last_error: Mutex<Option<String>>,
}

/// Resets the in-flight flag however the generation ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Cheap to clone; clones share the guard and cooldown.
#[derive(Clone)]
pub struct QueueMonitor {
    inner: Arc<MonitorInner>,
}

impl QueueMonitor {
    pub fn new(
        source: Option<Arc<dyn CardSource>>,
        store: Arc<Mutex<CardStore>>,
        clock: Arc<dyn Clock>,
        algorithm: Arc<dyn SchedulingAlgorithm>,
        sync: SyncCoordinator,
        rules: BatchRules,
        cooldown: Duration,
        max_cards: usize,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                source,
                store,
                clock,
                algorithm,
                sync,
                rules,
                cooldown,
                max_cards,
                last_generation_at: Mutex::new(None),
                in_flight: AtomicBool::new(false),
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Request a new batch unless a guard says otherwise.
    pub async fn maybe_generate(&self) -> Result<GenerationOutcome, GenerationError> {
        let inner = &self.inner;
        let Some(source) = inner.source.clone() else {
            tracing::debug!("No content source configured, skipping generation");
            return Ok(GenerationOutcome::Skipped(SkipReason::NoCredential));
        };

        if inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Generation already in flight, dropping request");
            return Ok(GenerationOutcome::Skipped(SkipReason::InFlight));
        }
        let _guard = InFlightGuard(&inner.in_flight);

        let now = inner.clock.now();
        {
            let mut last = lock(&inner.last_generation_at);
            if let Some(previous) = *last {
                if now - previous < inner.cooldown.as_millis() as i64 {
                    tracing::debug!("Generation cooling down");
                    return Ok(GenerationOutcome::Skipped(SkipReason::CoolingDown));
                }
            }
            *last = Some(now);
        }

        let existing_units = lock(&inner.store).unit_ids();
        tracing::info!(units = existing_units.len(), "Requesting new card batch");

        let cards = match source.generate_batch(&existing_units).await {
            Ok(cards) => cards,
            Err(e) => return Err(self.record_failure(e)),
        };
        if let Err(e) = validate_batch(&cards, &inner.rules) {
            return Err(self.record_failure(e.into()));
        }

        let received = cards.len();
        let now = inner.clock.now();
        let initial = inner.algorithm.initial_state(now);
        let (inserted, dropped, total) = {
            let mut store = lock(&inner.store);
            let inserted = store.upsert_cards(cards, now, &initial);
            let dropped = store.enforce_cap(inner.max_cards);
            if !dropped.is_empty() {
                tracing::info!(count = dropped.len(), "Dropped oldest cards over the cap");
            }
            (inserted.len(), dropped.len(), store.len())
        };
        if inserted > 0 || dropped > 0 {
            inner.sync.note_cards_changed();
        }
        *lock(&inner.last_error) = None;

        tracing::info!(received, inserted, total, "Added generated cards");
        Ok(GenerationOutcome::Added { received, inserted })
    }

    pub fn status(&self) -> GenerationStatus {
        GenerationStatus {
            in_flight: self.inner.in_flight.load(Ordering::SeqCst),
            last_generation_at: *lock(&self.inner.last_generation_at),
            last_error: lock(&self.inner.last_error).clone(),
            source_configured: self.inner.source.is_some(),
        }
    }

    fn record_failure(&self, error: GenerationError) -> GenerationError {
        tracing::warn!(error = %error, "Card generation failed");
        *lock(&self.inner.last_error) = Some(error.to_string());
        error
    }
}
