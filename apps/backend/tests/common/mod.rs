//! Common test utilities and fakes for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - RecordingPersistence, an in-memory remote store that records writes
//!   and can be told to fail
//! - ScriptedSource, a content source that replays canned batches
//! - TestContext for wiring a hydrated session around them

#![allow(dead_code)]

pub mod fixtures;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;

use srs_backend::config::SchedulerSettings;
use srs_backend::services::persistence::{
    MemoryPersistence, PersistenceError, RemotePersistence, Snapshot,
};
use srs_backend::services::session::StudySession;
use srs_backend::services::source::{CardSource, GenerationError};
use srs_backend::AppState;
use srs_core::{
    Card, CardId, CardState, InfiniteSm2, ManualClock, SchedulingAlgorithm, Timestamp,
};

pub const NOW: Timestamp = 1_700_000_000_000;
pub const SESSION: &str = "test-session";

/// Remote store double over [`MemoryPersistence`] that records every write.
///
/// `snapshot = None` makes fetching fail.
pub struct RecordingPersistence {
    remote: MemoryPersistence,
    fetch_fails: bool,
    pub fail_saves: AtomicBool,
    pub failed_attempts: AtomicUsize,
    pub state_writes: Mutex<Vec<HashMap<CardId, CardState>>>,
    pub card_writes: Mutex<Vec<(Vec<CardId>, usize)>>,
}

impl RecordingPersistence {
    pub fn new(snapshot: Option<Snapshot>) -> Self {
        let remote = MemoryPersistence::new();
        let fetch_fails = snapshot.is_none();
        if let Some(snapshot) = snapshot {
            remote.restore(SESSION, snapshot);
        }
        Self {
            remote,
            fetch_fails,
            fail_saves: AtomicBool::new(false),
            failed_attempts: AtomicUsize::new(0),
            state_writes: Mutex::new(Vec::new()),
            card_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Some(Snapshot::default()))
    }

    /// What the remote store currently holds for the test session.
    pub fn stored(&self) -> Snapshot {
        self.remote.snapshot(SESSION)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    pub fn state_writes(&self) -> Vec<HashMap<CardId, CardState>> {
        self.state_writes.lock().unwrap().clone()
    }

    pub fn card_writes(&self) -> Vec<(Vec<CardId>, usize)> {
        self.card_writes.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.state_writes.lock().unwrap().clear();
        self.card_writes.lock().unwrap().clear();
    }

    fn check_failure(&self) -> Result<(), PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            self.failed_attempts.fetch_add(1, Ordering::SeqCst);
            return Err(PersistenceError::Backend {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemotePersistence for RecordingPersistence {
    async fn fetch_snapshot(&self, session_id: &str) -> Result<Snapshot, PersistenceError> {
        if self.fetch_fails {
            return Err(PersistenceError::Parse("expected value at line 1".to_string()));
        }
        self.remote.fetch_snapshot(session_id).await
    }

    async fn save_cards_batch(
        &self,
        session_id: &str,
        cards: &[Card],
        max_cards: usize,
    ) -> Result<(), PersistenceError> {
        self.check_failure()?;
        let ids = cards.iter().map(|c| c.id().to_string()).collect();
        self.card_writes.lock().unwrap().push((ids, max_cards));
        self.remote.save_cards_batch(session_id, cards, max_cards).await
    }

    async fn save_states(
        &self,
        session_id: &str,
        states: &HashMap<CardId, CardState>,
    ) -> Result<(), PersistenceError> {
        self.check_failure()?;
        self.state_writes.lock().unwrap().push(states.clone());
        self.remote.save_states(session_id, states).await
    }
}

/// Content source that replays queued responses in order.
///
/// With a gate set, each call signals `entered` and then waits for
/// `release` before answering.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<Card>, GenerationError>>>,
    pub calls: AtomicUsize,
    pub entered: tokio::sync::Notify,
    pub release: tokio::sync::Notify,
    gated: bool,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<Vec<Card>, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
            gated: false,
        }
    }

    pub fn gated(responses: Vec<Result<Vec<Card>, GenerationError>>) -> Self {
        Self {
            gated: true,
            ..Self::new(responses)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CardSource for ScriptedSource {
    async fn generate_batch(
        &self,
        _existing_units: &[String],
    ) -> Result<Vec<Card>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Provider("script exhausted".to_string())))
    }
}

/// A session wired to test doubles, with a manual clock at [`NOW`].
pub struct TestContext {
    pub session: Arc<StudySession>,
    pub clock: Arc<ManualClock>,
    pub persistence: Arc<RecordingPersistence>,
    pub source: Option<Arc<ScriptedSource>>,
    settings: SchedulerSettings,
}

impl TestContext {
    /// Session without a content source, hydrated from `seed` over an empty remote store.
    pub async fn new(seed: Vec<Card>) -> Self {
        Self::build(
            seed,
            RecordingPersistence::empty(),
            None,
            SchedulerSettings::default(),
        )
        .await
    }

    pub async fn with_source(seed: Vec<Card>, source: ScriptedSource) -> Self {
        Self::build(
            seed,
            RecordingPersistence::empty(),
            Some(source),
            SchedulerSettings::default(),
        )
        .await
    }

    pub async fn build(
        seed: Vec<Card>,
        persistence: RecordingPersistence,
        source: Option<ScriptedSource>,
        settings: SchedulerSettings,
    ) -> Self {
        let ctx = Self::unhydrated(persistence, source, settings);
        ctx.session.hydrate(seed).await;
        ctx
    }

    pub fn unhydrated(
        persistence: RecordingPersistence,
        source: Option<ScriptedSource>,
        settings: SchedulerSettings,
    ) -> Self {
        Self::assemble(
            Arc::new(persistence),
            source.map(Arc::new),
            settings,
            Arc::new(InfiniteSm2::default()),
            NOW,
        )
    }

    /// Unhydrated session scheduling with `algorithm`.
    pub fn with_algorithm(
        algorithm: Arc<dyn SchedulingAlgorithm>,
        source: Option<ScriptedSource>,
        settings: SchedulerSettings,
    ) -> Self {
        Self::assemble(
            Arc::new(RecordingPersistence::empty()),
            source.map(Arc::new),
            settings,
            algorithm,
            NOW,
        )
    }

    /// Shut this session down and start an unhydrated one over the same
    /// remote store, with the clock at `now`.
    pub fn restart_at(self, now: Timestamp) -> Self {
        self.session.shutdown();
        Self::assemble(
            self.persistence,
            self.source,
            self.settings,
            Arc::new(InfiniteSm2::default()),
            now,
        )
    }

    fn assemble(
        persistence: Arc<RecordingPersistence>,
        source: Option<Arc<ScriptedSource>>,
        settings: SchedulerSettings,
        algorithm: Arc<dyn SchedulingAlgorithm>,
        now: Timestamp,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(now));
        let session = Arc::new(StudySession::new(
            SESSION,
            &settings,
            algorithm,
            persistence.clone(),
            source.clone().map(|s| s as Arc<dyn CardSource>),
            clock.clone(),
            StdRng::seed_from_u64(17),
        ));

        Self {
            session,
            clock,
            persistence,
            source,
            settings,
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        srs_backend::router(AppState {
            session: self.session.clone(),
        })
    }
}
