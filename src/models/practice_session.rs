//! Practice session management.
//! Walks a batch of review items, sends each answer through the scheduler and saves the
//! result, keeping an unsaved answer around when storage fails so it can be retried.

use super::scheduler::{self, Strategy};
use super::{InvalidItemState, ReviewItem, SessionStats};
use crate::database::{ReviewStore, StoreError};
use crate::feedback::{self, Verdict};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidItem(#[from] InvalidItemState),

    #[error("could not save progress: {0}")]
    Save(#[from] StoreError),

    #[error("the previous answer has not been saved yet")]
    PendingSave,

    #[error("no card left to answer")]
    NoCurrentItem,
}

/// A graded answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub item: ReviewItem,
    pub was_correct: bool,
    pub newly_mastered: bool,
}

/// Graded answer waiting to be written.
#[derive(Debug, Clone)]
struct PendingSave {
    attempt: Attempt,
    expected_review_count: u32,
}

pub struct PracticeSession {
    pub deck_name: String,
    pub language_tag: String,
    pub strategy: Strategy,
    items: Vec<ReviewItem>,
    current_index: usize,
    show_answer: bool,
    pending: Option<PendingSave>,
    attempts: usize,
    correct: usize,
}

impl PracticeSession {
    /// Starts a session over the items selected by `strategy` at `now`.
    pub fn new(
        deck_name: impl Into<String>,
        language_tag: impl Into<String>,
        items: &[ReviewItem],
        now: DateTime<Utc>,
        strategy: Strategy,
    ) -> Self {
        let batch: Vec<ReviewItem> = scheduler::select_next_batch(items, now, strategy)
            .cloned()
            .collect();
        let deck_name = deck_name.into();
        tracing::info!(deck = %deck_name, %strategy, cards = batch.len(), "practice session started");

        Self {
            deck_name,
            language_tag: language_tag.into(),
            strategy,
            items: batch,
            current_index: 0,
            show_answer: false,
            pending: None,
            attempts: 0,
            correct: 0,
        }
    }

    /// Loads the deck from `store` and starts a session over it.
    pub fn from_store(
        deck_name: &str,
        language_tag: &str,
        store: &dyn ReviewStore,
        now: DateTime<Utc>,
        strategy: Strategy,
    ) -> Result<Self, StoreError> {
        let items = store.get_all(deck_name)?;
        Ok(Self::new(deck_name, language_tag, &items, now, strategy))
    }

    pub fn current(&self) -> Option<&ReviewItem> {
        self.items.get(self.current_index)
    }

    pub fn show_answer(&self) -> bool {
        self.show_answer
    }

    pub fn reveal(&mut self) {
        self.show_answer = true;
    }

    pub fn has_unsaved_answer(&self) -> bool {
        self.pending.is_some()
    }

    /// Grades the current card, saves it and moves on.
    ///
    /// If saving fails the graded card is kept and the session stays on it; call
    /// [`retry_save`](Self::retry_save) or [`discard_unsaved`](Self::discard_unsaved).
    pub fn answer(
        &mut self,
        was_correct: bool,
        now: DateTime<Utc>,
        store: &mut dyn ReviewStore,
    ) -> Result<Attempt, SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::PendingSave);
        }
        let item = self.current().ok_or(SessionError::NoCurrentItem)?;
        let updated = scheduler::record_attempt(item, was_correct, now)?;

        self.pending = Some(PendingSave {
            attempt: Attempt {
                newly_mastered: updated.mastered && !item.mastered,
                item: updated,
                was_correct,
            },
            expected_review_count: item.review_count,
        });
        self.retry_save(store)
    }

    /// Judges a typed or spoken answer against the back text, then grades the card.
    pub fn answer_with_text(
        &mut self,
        given: &str,
        now: DateTime<Utc>,
        store: &mut dyn ReviewStore,
    ) -> Result<(Verdict, Attempt), SessionError> {
        let expected = self
            .current()
            .map(|item| item.back_text.clone())
            .ok_or(SessionError::NoCurrentItem)?;
        let verdict = feedback::judge_answer(&expected, given);
        let attempt = self.answer(verdict.is_correct(), now, store)?;
        Ok((verdict, attempt))
    }

    /// Writes the unsaved answer again.
    pub fn retry_save(&mut self, store: &mut dyn ReviewStore) -> Result<Attempt, SessionError> {
        let pending = self.pending.as_ref().ok_or(SessionError::NoCurrentItem)?;

        if let Err(error) =
            store.put_if_unchanged(&self.deck_name, &pending.attempt.item, pending.expected_review_count)
        {
            tracing::warn!(deck = %self.deck_name, id = %pending.attempt.item.id, %error, "saving answer failed");
            return Err(error.into());
        }

        let Some(PendingSave { attempt, .. }) = self.pending.take() else {
            return Err(SessionError::NoCurrentItem);
        };
        self.attempts += 1;
        if attempt.was_correct {
            self.correct += 1;
        }
        if let Some(slot) = self.items.get_mut(self.current_index) {
            *slot = attempt.item.clone();
        }
        self.advance();
        Ok(attempt)
    }

    /// Drops the unsaved answer and moves to the next card.
    pub fn discard_unsaved(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::info!(id = %pending.attempt.item.id, "unsaved answer discarded");
            self.advance();
        }
    }

    /// Moves on without grading the current card.
    pub fn skip(&mut self) {
        if self.pending.is_none() {
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.current_index < self.items.len() {
            self.current_index += 1;
        }
        self.show_answer = false;
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    pub fn answered_count(&self) -> usize {
        self.attempts
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    pub fn remaining_count(&self) -> usize {
        self.items.len() - self.current_index
    }

    /// Cards done (answered or skipped) and the size of the batch.
    pub fn progress(&self) -> (usize, usize) {
        (self.current_index, self.items.len())
    }

    pub fn is_completed(&self) -> bool {
        self.pending.is_none() && self.current_index >= self.items.len()
    }

    /// Stats over the cards of this session, including answers given so far.
    pub fn stats(&self, now: DateTime<Utc>) -> SessionStats {
        SessionStats::from_items(&self.items, now)
    }

    pub fn phase_message(&self) -> String {
        match self.strategy {
            Strategy::DueOnly => format!("Smart review: {} due cards", self.total_count()),
            Strategy::All => format!("Full deck: {} cards", self.total_count()),
        }
    }
}
