//! Persistence port for review items and its adapters.
//!
//! The scheduler never touches storage: whoever drives a practice session reads items
//! through a [`ReviewStore`], hands them to the scheduler and writes the results back.

pub mod db;
pub mod memory;

use crate::models::{InvalidItemState, ReviewItem};
use thiserror::Error;

pub use db::SqliteStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid stored item: {0}")]
    InvalidItem(#[from] InvalidItemState),

    #[error("invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("item '{id}' was changed by another session")]
    Conflict { id: String },

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value style access to the review items of a deck.
pub trait ReviewStore {
    /// All items of the deck in insertion order.
    fn get_all(&self, deck: &str) -> StoreResult<Vec<ReviewItem>>;

    /// Inserts or overwrites an item. Last write wins.
    fn put(&mut self, deck: &str, item: &ReviewItem) -> StoreResult<()>;

    /// Overwrites an item only if the stored copy still has `expected_review_count`.
    ///
    /// The review count grows by exactly one per attempt, so it doubles as a version:
    /// a mismatch means another session recorded an attempt in the meantime.
    fn put_if_unchanged(
        &mut self,
        deck: &str,
        item: &ReviewItem,
        expected_review_count: u32,
    ) -> StoreResult<()>;

    /// Clears the progress of every item in the deck. Returns how many items were reset.
    fn reset_progress(&mut self, deck: &str) -> StoreResult<usize>;
}
