//! Study session: the scheduler surface handed to the UI layer.
//!
//! One `StudySession` exists per learner session and is shared by `Arc`.
//! All card store reads and writes go through a single mutex that is
//! never held across an `.await`, so a grade and the selection that
//! follows it can't interleave with another grade.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use tokio::runtime::Handle;
use srs_core::{
    select_next, Card, CardId, CardState, CardStore, Clock, Counts, Grade, SchedulerError,
    SchedulingAlgorithm, Timestamp,
};

use super::lock;
use super::monitor::{GenerationOutcome, GenerationStatus, QueueMonitor};
use super::persistence::RemotePersistence;
use super::source::{CardSource, GenerationError};
use super::sync::SyncCoordinator;
use crate::config::SchedulerSettings;

/// How the session's cards were loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// Remote snapshot unavailable; running on the seed deck.
    LocalOnly { cards: usize },
    /// Remote store was empty and has been given the seed deck.
    Bootstrapped { cards: usize },
    /// Remote snapshot loaded, with seed cards it lacked added.
    Restored { cards: usize, states: usize },
}

/// Scheduler state for one learner session.
///
/// Must be constructed inside a Tokio runtime. Background work (sync timers
/// and generation) runs on that runtime, so the synchronous methods can be
/// called from any thread afterwards.
pub struct StudySession {
    session_id: String,
    store: Arc<Mutex<CardStore>>,
    algorithm: Arc<dyn SchedulingAlgorithm>,
    runtime: Handle,
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
    persistence: Arc<dyn RemotePersistence>,
    monitor: QueueMonitor,
    sync: SyncCoordinator,
    max_cards: usize,
}

impl StudySession {
    pub fn new(
        session_id: &str,
        settings: &SchedulerSettings,
        algorithm: Arc<dyn SchedulingAlgorithm>,
        persistence: Arc<dyn RemotePersistence>,
        source: Option<Arc<dyn CardSource>>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        let store = Arc::new(Mutex::new(CardStore::new()));
        let sync = SyncCoordinator::new(
            session_id,
            persistence.clone(),
            store.clone(),
            clock.clone(),
            settings.sync.clone(),
        );
        let monitor = QueueMonitor::new(
            source,
            store.clone(),
            clock.clone(),
            algorithm.clone(),
            sync.clone(),
            settings.batch_rules.clone(),
            settings.generation_cooldown,
            settings.sync.max_cards,
        );

        Self {
            session_id: session_id.to_string(),
            store,
            algorithm,
            runtime: Handle::current(),
            rng: Mutex::new(rng),
            clock,
            persistence,
            monitor,
            sync,
            max_cards: settings.sync.max_cards,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Load the remote snapshot, falling back to the seed deck.
    ///
    /// Remote cards are loaded before the seed so they keep the creation
    /// time they were first stored with.
    pub async fn hydrate(&self, seed: Vec<Card>) -> Hydration {
        let now = self.clock.now();
        let initial = self.algorithm.initial_state(now);

        let snapshot = match self.persistence.fetch_snapshot(&self.session_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load remote snapshot, using seed deck");
                let cards = self.load_seed(seed, now, &initial);
                return Hydration::LocalOnly { cards };
            }
        };

        if snapshot.cards.is_empty() {
            let cards = self.load_seed(seed, now, &initial);
            if let Err(e) = self.sync.bootstrap().await {
                tracing::warn!(error = %e, "Initial push of seed deck failed");
            }
            return Hydration::Bootstrapped { cards };
        }

        let (cards, states, changed) = {
            let mut store = lock(&self.store);
            store.upsert_cards(snapshot.cards, now, &initial);
            let seeded = store.upsert_cards(seed, now, &initial);
            let states = store.merge_remote_state(snapshot.states);
            let dropped = store.enforce_cap(self.max_cards);
            (store.len(), states, !seeded.is_empty() || !dropped.is_empty())
        };
        // Seed cards the remote store lacks go out with the next card flush.
        if changed {
            self.sync.note_cards_changed();
        }
        tracing::info!(cards, states, "Restored session from remote snapshot");
        Hydration::Restored { cards, states }
    }

    /// Id of the card to show next, or `None` when nothing is eligible.
    ///
    /// An empty queue asks the monitor for more cards in the background.
    pub fn next_card(&self) -> Option<CardId> {
        let now = self.clock.now();
        let next = {
            let store = lock(&self.store);
            let mut rng = lock(&self.rng);
            select_next(
                store.states(),
                now,
                self.algorithm.learning_steps(),
                &mut *rng,
            )
            .map(str::to_string)
        };
        if next.is_none() {
            self.spawn_generation();
        }
        next
    }

    /// Record a grade and schedule its persistence.
    ///
    /// Grading an id the store doesn't know means the caller and the
    /// store disagree; nothing is changed and the error is returned.
    pub fn grade_card(&self, id: &str, grade: Grade) -> Result<CardState, SchedulerError> {
        let now = self.clock.now();
        let (state, counts) = {
            let mut store = lock(&self.store);
            let current = store
                .get_state(id)
                .ok_or_else(|| SchedulerError::UnknownCard(id.to_string()))?;
            let next = self.algorithm.schedule(current, grade, now);
            store.record_state(id, next.clone())?;
            (next, store.counts(now, self.algorithm.learning_steps()))
        };

        tracing::debug!(
            card_id = id,
            ?grade,
            phase = ?state.phase,
            interval = state.interval,
            "Graded card"
        );
        self.sync.note_graded(id);
        if counts.is_exhausted() {
            self.spawn_generation();
        }
        Ok(state)
    }

    pub fn counts(&self) -> Counts {
        lock(&self.store).counts(self.clock.now(), self.algorithm.learning_steps())
    }

    /// Manual refill, under the same guards as the automatic one.
    pub async fn request_more_cards(&self) -> Result<GenerationOutcome, GenerationError> {
        self.monitor.maybe_generate().await
    }

    pub fn card(&self, id: &str) -> Option<Card> {
        lock(&self.store).get_card(id).cloned()
    }

    pub fn state(&self, id: &str) -> Option<CardState> {
        lock(&self.store).get_state(id).cloned()
    }

    pub fn total_cards(&self) -> usize {
        lock(&self.store).len()
    }

    pub fn generation_status(&self) -> GenerationStatus {
        self.monitor.status()
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    /// Cancel pending sync timers.
    pub fn shutdown(&self) {
        self.sync.shutdown();
    }

    fn load_seed(&self, seed: Vec<Card>, now: Timestamp, initial: &CardState) -> usize {
        let mut store = lock(&self.store);
        store.upsert_cards(seed, now, initial);
        store.enforce_cap(self.max_cards);
        store.len()
    }

    fn spawn_generation(&self) {
        let monitor = self.monitor.clone();
        self.runtime.spawn(async move {
            // Failures are recorded in the monitor status.
            let _ = monitor.maybe_generate().await;
        });
    }
}
