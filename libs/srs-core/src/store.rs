//! In-memory card store: immutable content plus one scheduling state per card.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::SchedulerError;
use crate::selection;
use crate::types::{Card, CardId, CardState, Counts, Timestamp, DAY_MS};

#[derive(Debug, Clone)]
struct Entry {
    card: Card,
    state: CardState,
    created_at: Timestamp,
}

/// Mapping from card id to (card, state).
#[derive(Debug, Clone, Default)]
pub struct CardStore {
    entries: BTreeMap<CardId, Entry>,
}

impl CardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert cards whose ids are not yet known.
    ///
    /// Existing cards keep both their content and their state. Each newly
    /// inserted card starts from a copy of `initial` and is stamped with
    /// `now` as its creation time unless it already carries one, so the
    /// time travels with the card when it is persisted. Returns the new ids.
    pub fn upsert_cards<I>(
        &mut self,
        cards: I,
        now: Timestamp,
        initial: &CardState,
    ) -> Vec<CardId>
    where
        I: IntoIterator<Item = Card>,
    {
        let mut inserted = Vec::new();
        for mut card in cards {
            if self.entries.contains_key(card.id()) {
                continue;
            }
            let id = card.id().to_string();
            let created_at = card.stamp_created_at(now);
            self.entries.insert(
                id.clone(),
                Entry {
                    card,
                    state: initial.clone(),
                    created_at,
                },
            );
            inserted.push(id);
        }
        inserted
    }

    /// Apply a remote snapshot on first load.
    ///
    /// Remote wins for every id known locally. Remote states without a
    /// local card are dropped. Returns how many states were replaced.
    pub fn merge_remote_state(&mut self, states: HashMap<CardId, CardState>) -> usize {
        let mut merged = 0;
        for (id, state) in states {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.state = state;
                merged += 1;
            }
        }
        merged
    }

    pub fn get_state(&self, id: &str) -> Option<&CardState> {
        self.entries.get(id).map(|e| &e.state)
    }

    pub fn get_card(&self, id: &str) -> Option<&Card> {
        self.entries.get(id).map(|e| &e.card)
    }

    /// Replace the state of an existing card.
    pub fn record_state(&mut self, id: &str, state: CardState) -> Result<(), SchedulerError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| SchedulerError::UnknownCard(id.to_string()))?;
        entry.state = state;
        Ok(())
    }

    /// `(id, state)` pairs in id order.
    pub fn states(&self) -> impl Iterator<Item = (&str, &CardState)> + Clone {
        self.entries.iter().map(|(id, e)| (id.as_str(), &e.state))
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.entries.values().map(|e| &e.card)
    }

    /// Distinct unit ids of stored cards.
    pub fn unit_ids(&self) -> Vec<String> {
        self.entries
            .values()
            .map(|e| e.card.unit_id().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn counts(&self, now: Timestamp, learning_steps: u32) -> Counts {
        selection::counts(self.states(), now, learning_steps)
    }

    /// Drop cards created more than `retention_days` before `now`.
    pub fn prune_expired(&mut self, now: Timestamp, retention_days: u32) -> Vec<CardId> {
        let cutoff = now - retention_days as i64 * DAY_MS;
        let expired: Vec<CardId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.created_at < cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.entries.remove(id);
        }
        expired
    }

    /// Keep at most `max_cards`, dropping the oldest-created first.
    pub fn enforce_cap(&mut self, max_cards: usize) -> Vec<CardId> {
        if self.entries.len() <= max_cards {
            return Vec::new();
        }
        let mut by_age: Vec<(Timestamp, CardId)> = self
            .entries
            .iter()
            .map(|(id, e)| (e.created_at, id.clone()))
            .collect();
        by_age.sort();

        let excess = self.entries.len() - max_cards;
        let dropped: Vec<CardId> = by_age.into_iter().take(excess).map(|(_, id)| id).collect();
        for id in &dropped {
            self.entries.remove(id);
        }
        dropped
    }
}
