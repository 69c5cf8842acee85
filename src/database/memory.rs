//! In-memory store for tests and throwaway sessions.
use super::{ReviewStore, StoreError, StoreResult};
use crate::models::{Deck, ReviewItem};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    decks: HashMap<String, Vec<ReviewItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deck(deck: &Deck) -> Self {
        let mut store = Self::new();
        store.decks.insert(deck.name.clone(), deck.items.clone());
        store
    }
}

impl ReviewStore for MemoryStore {
    fn get_all(&self, deck: &str) -> StoreResult<Vec<ReviewItem>> {
        self.decks
            .get(deck)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(deck.to_string()))
    }

    fn put(&mut self, deck: &str, item: &ReviewItem) -> StoreResult<()> {
        item.validate()?;
        let items = self.decks.entry(deck.to_string()).or_default();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
        Ok(())
    }

    fn put_if_unchanged(
        &mut self,
        deck: &str,
        item: &ReviewItem,
        expected_review_count: u32,
    ) -> StoreResult<()> {
        item.validate()?;
        let existing = self
            .decks
            .get_mut(deck)
            .and_then(|items| items.iter_mut().find(|existing| existing.id == item.id))
            .ok_or_else(|| StoreError::NotFound(format!("{deck}/{}", item.id)))?;

        if existing.review_count != expected_review_count {
            return Err(StoreError::Conflict {
                id: item.id.clone(),
            });
        }
        *existing = item.clone();
        Ok(())
    }

    fn reset_progress(&mut self, deck: &str) -> StoreResult<usize> {
        let items = self
            .decks
            .get_mut(deck)
            .ok_or_else(|| StoreError::NotFound(deck.to_string()))?;
        for item in items.iter_mut() {
            *item = item.with_progress_cleared();
        }
        Ok(items.len())
    }
}
