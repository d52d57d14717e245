//! Debounced persistence of local scheduling state.
//!
//! Local state is authoritative. Grades mark card ids dirty and restart a
//! short timer; when it fires, the current states of every dirty id are
//! written in one batch. A failed write leaves the ids dirty, so the flush
//! after the next grade resends them. Card content is written separately:
//! every change to the stored deck bumps a version, and the deck stays
//! dirty until a write carrying that version succeeds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use srs_core::{Card, CardId, CardState, CardStore, Clock};

use super::debounce::Debouncer;
use super::lock;
use super::persistence::{PersistenceError, RemotePersistence};

/// Timing and retention knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub state_debounce: Duration,
    pub cards_debounce: Duration,
    /// Re-flush after a failed state write. `None` waits for the next grade.
    pub retry_after: Option<Duration>,
    pub max_cards: usize,
    pub retention_days: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            state_debounce: Duration::from_millis(1_200),
            cards_debounce: Duration::from_millis(1_800),
            retry_after: None,
            max_cards: 200,
            retention_days: 90,
        }
    }
}

struct SyncInner {
    persistence: Arc<dyn RemotePersistence>,
    store: Arc<Mutex<CardStore>>,
    clock: Arc<dyn Clock>,
    session_id: String,
    settings: SyncSettings,
    /// Dirty ids with the version of their latest grade.
    dirty: Mutex<HashMap<CardId, u64>>,
    next_version: AtomicU64,
    /// Bumped on every change to the stored deck.
    cards_version: AtomicU64,
    /// Highest deck version confirmed by the remote store.
    cards_synced: AtomicU64,
    state_timer: Debouncer,
    cards_timer: Debouncer,
}

/// Batches local mutations and flushes them to remote persistence.
///
/// Cheap to clone; all clones share the same timers and dirty set.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<SyncInner>,
}

impl SyncCoordinator {
    pub fn new(
        session_id: &str,
        persistence: Arc<dyn RemotePersistence>,
        store: Arc<Mutex<CardStore>>,
        clock: Arc<dyn Clock>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                persistence,
                store,
                clock,
                session_id: session_id.to_string(),
                state_timer: Debouncer::new(settings.state_debounce),
                cards_timer: Debouncer::new(settings.cards_debounce),
                settings,
                dirty: Mutex::new(HashMap::new()),
                next_version: AtomicU64::new(1),
                cards_version: AtomicU64::new(0),
                cards_synced: AtomicU64::new(0),
            }),
        }
    }

    /// Mark a graded card for the next state flush and restart the timer.
    pub fn note_graded(&self, id: &str) {
        let version = self.inner.next_version.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.dirty).insert(id.to_string(), version);
        self.schedule_state_flush(None);
        if self.cards_dirty() && !self.inner.cards_timer.is_pending() {
            self.schedule_card_flush(None);
        }
    }

    /// Mark the stored deck as changed and restart the card-metadata timer.
    pub fn note_cards_changed(&self) {
        self.inner.cards_version.fetch_add(1, Ordering::SeqCst);
        self.schedule_card_flush(None);
    }

    /// Whether the deck has changes the remote store has not confirmed.
    pub fn cards_dirty(&self) -> bool {
        self.inner.cards_version.load(Ordering::SeqCst)
            > self.inner.cards_synced.load(Ordering::SeqCst)
    }

    /// Ids whose latest state has not been written yet.
    pub fn pending_ids(&self) -> Vec<CardId> {
        let mut ids: Vec<CardId> = lock(&self.inner.dirty).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Write the current state of every dirty id in a single batch.
    ///
    /// Returns the number of states written. Ids whose cards were pruned
    /// since grading are dropped from the dirty set without being sent.
    pub async fn flush_states(&self) -> Result<usize, PersistenceError> {
        let pending: Vec<(CardId, u64)> = lock(&self.inner.dirty)
            .iter()
            .map(|(id, version)| (id.clone(), *version))
            .collect();
        if pending.is_empty() {
            return Ok(0);
        }

        let states: HashMap<CardId, CardState> = {
            let store = lock(&self.inner.store);
            pending
                .iter()
                .filter_map(|(id, _)| store.get_state(id).map(|s| (id.clone(), s.clone())))
                .collect()
        };

        if !states.is_empty() {
            if let Err(e) = self
                .inner
                .persistence
                .save_states(&self.inner.session_id, &states)
                .await
            {
                tracing::warn!(
                    error = %e,
                    pending = pending.len(),
                    "State sync failed, keeping changes for the next flush"
                );
                if let Some(retry) = self.inner.settings.retry_after {
                    self.schedule_state_flush(Some(retry));
                }
                return Err(e);
            }
        }

        // Grades that landed during the write carry a newer version and stay dirty.
        let mut dirty = lock(&self.inner.dirty);
        for (id, version) in &pending {
            if dirty.get(id) == Some(version) {
                dirty.remove(id);
            }
        }
        tracing::debug!(written = states.len(), "Synced card states");
        Ok(states.len())
    }

    /// Prune expired cards, then write the card batch.
    ///
    /// The batch is the full deck and replaces what the remote store holds.
    /// A failed write leaves the deck dirty.
    pub async fn flush_cards(&self) -> Result<usize, PersistenceError> {
        let version = self.inner.cards_version.load(Ordering::SeqCst);
        let now = self.inner.clock.now();
        let (cards, pruned) = {
            let mut store = lock(&self.inner.store);
            let pruned = store.prune_expired(now, self.inner.settings.retention_days);
            let cards: Vec<Card> = store.cards().cloned().collect();
            (cards, pruned)
        };

        if !pruned.is_empty() {
            tracing::info!(count = pruned.len(), "Pruned cards past retention");
            let mut dirty = lock(&self.inner.dirty);
            for id in &pruned {
                dirty.remove(id);
            }
        }

        if let Err(e) = self
            .inner
            .persistence
            .save_cards_batch(&self.inner.session_id, &cards, self.inner.settings.max_cards)
            .await
        {
            tracing::warn!(error = %e, cards = cards.len(), "Card batch sync failed");
            if !pruned.is_empty() {
                self.inner.cards_version.fetch_add(1, Ordering::SeqCst);
            }
            if let Some(retry) = self.inner.settings.retry_after {
                self.schedule_card_flush(Some(retry));
            }
            return Err(e);
        }
        self.inner.cards_synced.fetch_max(version, Ordering::SeqCst);
        tracing::debug!(cards = cards.len(), "Synced card batch");
        Ok(cards.len())
    }

    /// Push the whole local deck once, for a session the remote store has never seen.
    pub async fn bootstrap(&self) -> Result<usize, PersistenceError> {
        let version = self.inner.cards_version.load(Ordering::SeqCst);
        let (cards, states) = {
            let store = lock(&self.inner.store);
            let cards: Vec<Card> = store.cards().cloned().collect();
            let states: HashMap<CardId, CardState> = store
                .states()
                .map(|(id, s)| (id.to_string(), s.clone()))
                .collect();
            (cards, states)
        };

        let session_id = &self.inner.session_id;
        self.inner
            .persistence
            .save_cards_batch(session_id, &cards, self.inner.settings.max_cards)
            .await?;
        self.inner.cards_synced.fetch_max(version, Ordering::SeqCst);
        self.inner.persistence.save_states(session_id, &states).await?;
        tracing::info!(cards = cards.len(), "Bootstrapped remote store from local deck");
        Ok(cards.len())
    }

    /// Clear pending timers. Writes already in progress finish on their own.
    pub fn shutdown(&self) {
        self.inner.state_timer.cancel();
        self.inner.cards_timer.cancel();
    }

    fn schedule_state_flush(&self, delay: Option<Duration>) {
        let weak = Arc::downgrade(&self.inner);
        let task = async move {
            if let Some(coordinator) = Self::upgrade(&weak) {
                let _ = coordinator.flush_states().await;
            }
        };
        match delay {
            Some(delay) => self.inner.state_timer.schedule_in(delay, task),
            None => self.inner.state_timer.schedule(task),
        }
    }

    fn schedule_card_flush(&self, delay: Option<Duration>) {
        let weak = Arc::downgrade(&self.inner);
        let task = async move {
            if let Some(coordinator) = Self::upgrade(&weak) {
                let _ = coordinator.flush_cards().await;
            }
        };
        match delay {
            Some(delay) => self.inner.cards_timer.schedule_in(delay, task),
            None => self.inner.cards_timer.schedule(task),
        }
    }

    fn upgrade(weak: &Weak<SyncInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}
