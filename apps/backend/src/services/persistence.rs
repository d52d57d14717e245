//! Remote persistence for cards and scheduling state.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use srs_core::{Card, CardId, CardState};

use super::lock;

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Everything stored remotely for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub states: HashMap<CardId, CardState>,
}

/// Get/put access to the session store. Writes are idempotent.
#[async_trait]
pub trait RemotePersistence: Send + Sync {
    async fn fetch_snapshot(&self, session_id: &str) -> Result<Snapshot, PersistenceError>;

    /// Replace the session's card set with `cards`.
    ///
    /// Cards missing from the batch are deleted along with their states.
    /// Over `max_cards`, the cards with the oldest `createdAt` are dropped.
    async fn save_cards_batch(
        &self,
        session_id: &str,
        cards: &[Card],
        max_cards: usize,
    ) -> Result<(), PersistenceError>;

    /// Upsert the given states, leaving the others untouched.
    async fn save_states(
        &self,
        session_id: &str,
        states: &HashMap<CardId, CardState>,
    ) -> Result<(), PersistenceError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveCardsRequest<'a> {
    cards: &'a [Card],
    max_cards: usize,
}

#[derive(Debug, Serialize)]
struct SaveStatesRequest<'a> {
    states: &'a HashMap<CardId, CardState>,
}

/// JSON-over-HTTP persistence client.
#[derive(Clone)]
pub struct HttpPersistence {
    client: Client,
    backend_url: String,
}

impl HttpPersistence {
    pub fn new(backend_url: &str) -> Self {
        Self {
            client: Client::new(),
            backend_url: backend_url.trim_end_matches('/').to_string(),
        }
    }

    fn session_url(&self, session_id: &str, resource: &str) -> String {
        format!("{}/api/sessions/{}/{}", self.backend_url, session_id, resource)
    }

    async fn check(resp: Response) -> Result<Response, PersistenceError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(PersistenceError::Backend { status, message });
        }
        Ok(resp)
    }
}

#[async_trait]
impl RemotePersistence for HttpPersistence {
    async fn fetch_snapshot(&self, session_id: &str) -> Result<Snapshot, PersistenceError> {
        let resp = self
            .client
            .get(self.session_url(session_id, "snapshot"))
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;

        // Unknown session: nothing stored yet.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Snapshot::default());
        }

        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| PersistenceError::Parse(e.to_string()))
    }

    async fn save_cards_batch(
        &self,
        session_id: &str,
        cards: &[Card],
        max_cards: usize,
    ) -> Result<(), PersistenceError> {
        let resp = self
            .client
            .post(self.session_url(session_id, "cards"))
            .json(&SaveCardsRequest { cards, max_cards })
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn save_states(
        &self,
        session_id: &str,
        states: &HashMap<CardId, CardState>,
    ) -> Result<(), PersistenceError> {
        let resp = self
            .client
            .put(self.session_url(session_id, "states"))
            .json(&SaveStatesRequest { states })
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Process-local persistence, used when no remote store is configured.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    sessions: Mutex<HashMap<String, Snapshot>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything stored for a session.
    pub fn restore(&self, session_id: &str, snapshot: Snapshot) {
        lock(&self.sessions).insert(session_id.to_string(), snapshot);
    }

    /// Current contents for a session.
    pub fn snapshot(&self, session_id: &str) -> Snapshot {
        lock(&self.sessions)
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemotePersistence for MemoryPersistence {
    async fn fetch_snapshot(&self, session_id: &str) -> Result<Snapshot, PersistenceError> {
        Ok(self.snapshot(session_id))
    }

    async fn save_cards_batch(
        &self,
        session_id: &str,
        cards: &[Card],
        max_cards: usize,
    ) -> Result<(), PersistenceError> {
        let mut kept = cards.to_vec();
        if kept.len() > max_cards {
            kept.sort_by_key(|c| c.created_at().unwrap_or(i64::MIN));
            let excess = kept.len() - max_cards;
            kept.drain(..excess);
        }
        let ids: HashSet<&str> = kept.iter().map(Card::id).collect();

        let mut sessions = lock(&self.sessions);
        let snapshot = sessions.entry(session_id.to_string()).or_default();
        snapshot.states.retain(|id, _| ids.contains(id.as_str()));
        snapshot.cards = kept;
        Ok(())
    }

    async fn save_states(
        &self,
        session_id: &str,
        states: &HashMap<CardId, CardState>,
    ) -> Result<(), PersistenceError> {
        let mut sessions = lock(&self.sessions);
        let snapshot = sessions.entry(session_id.to_string()).or_default();
        for (id, state) in states {
            snapshot.states.insert(id.clone(), state.clone());
        }
        Ok(())
    }
}
