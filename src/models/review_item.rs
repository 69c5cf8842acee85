//! A single learnable unit (word, phrase or flashcard) with its scheduling metadata.
use super::scheduler::MASTERY_THRESHOLD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected item state. Raised when a record contradicts the scheduling invariants
/// instead of letting a corrupted record flow back into storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidItemState {
    #[error("item '{id}' has a negative review count ({count})")]
    NegativeReviewCount { id: String, count: i64 },

    #[error("item '{id}' has a review count too large to track ({count})")]
    ReviewCountOverflow { id: String, count: i64 },

    #[error("item '{id}' is due at {next_due_at}, which is not after its last review at {last_reviewed_at}")]
    DueNotAfterLastReview {
        id: String,
        last_reviewed_at: DateTime<Utc>,
        next_due_at: DateTime<Utc>,
    },

    #[error("item '{id}' was reviewed {count} times but is missing its review timestamps")]
    MissingTimestamps { id: String, count: u32 },

    #[error("item '{id}' has never been reviewed but carries review timestamps")]
    TimestampsWithoutReview { id: String },

    #[error("item '{id}' reviewed at {reviewed_at} cannot be scheduled: the next due date is out of range")]
    DueDateOutOfRange { id: String, reviewed_at: DateTime<Utc> },

    #[error("item '{id}' has {correct} correct answers out of {count} reviews")]
    CorrectExceedsReviews { id: String, correct: u32, count: u32 },
}

/// Where an item sits in its learning lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    New,
    /// Reviewed at least once, below the mastery threshold.
    Learning(u32),
    Mastered,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ReviewItemRecord")]
pub struct ReviewItem {
    pub id: String,
    pub front_text: String,
    pub back_text: String,
    pub review_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_at: Option<DateTime<Utc>>,
    pub mastered: bool,
    pub correct_count: u32,
}

impl ReviewItem {
    pub fn new(id: impl Into<String>, front_text: impl Into<String>, back_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            front_text: front_text.into(),
            back_text: back_text.into(),
            review_count: 0,
            last_reviewed_at: None,
            next_due_at: None,
            mastered: false,
            correct_count: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.review_count == 0
    }

    pub fn stage(&self) -> Stage {
        if self.review_count == 0 {
            Stage::New
        } else if self.review_count >= MASTERY_THRESHOLD {
            Stage::Mastered
        } else {
            Stage::Learning(self.review_count)
        }
    }

    /// Same content with all progress cleared, as after a "reset progress".
    pub fn with_progress_cleared(&self) -> Self {
        Self::new(self.id.clone(), self.front_text.clone(), self.back_text.clone())
    }

    /// Checks the record against the scheduling invariants.
    pub fn validate(&self) -> Result<(), InvalidItemState> {
        if self.correct_count > self.review_count {
            return Err(InvalidItemState::CorrectExceedsReviews {
                id: self.id.clone(),
                correct: self.correct_count,
                count: self.review_count,
            });
        }

        match (self.review_count, self.last_reviewed_at, self.next_due_at) {
            (0, None, None) => Ok(()),
            (0, _, _) => Err(InvalidItemState::TimestampsWithoutReview { id: self.id.clone() }),
            (_, Some(last), Some(next)) if next <= last => {
                Err(InvalidItemState::DueNotAfterLastReview {
                    id: self.id.clone(),
                    last_reviewed_at: last,
                    next_due_at: next,
                })
            }
            (_, Some(_), Some(_)) => Ok(()),
            (count, _, _) => Err(InvalidItemState::MissingTimestamps {
                id: self.id.clone(),
                count,
            }),
        }
    }
}

/// Wire shape of a persisted item. Counts are signed here so that a negative value
/// from storage is reported as an invalid state rather than a generic parse error.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewItemRecord {
    id: String,
    front_text: String,
    back_text: String,
    review_count: i64,
    #[serde(default)]
    last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    next_due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[allow(dead_code)]
    mastered: bool,
    #[serde(default)]
    correct_count: i64,
}

/// Converts a signed persisted count into a review count.
pub fn count_from_storage(id: &str, count: i64) -> Result<u32, InvalidItemState> {
    if count < 0 {
        return Err(InvalidItemState::NegativeReviewCount {
            id: id.to_string(),
            count,
        });
    }
    u32::try_from(count).map_err(|_| InvalidItemState::ReviewCountOverflow {
        id: id.to_string(),
        count,
    })
}

impl TryFrom<ReviewItemRecord> for ReviewItem {
    type Error = InvalidItemState;

    fn try_from(record: ReviewItemRecord) -> Result<Self, Self::Error> {
        let review_count = count_from_storage(&record.id, record.review_count)?;
        let correct_count = count_from_storage(&record.id, record.correct_count)?;

        // `mastered` is derived, a stored flag that disagrees is ignored
        let item = ReviewItem {
            mastered: review_count >= MASTERY_THRESHOLD,
            id: record.id,
            front_text: record.front_text,
            back_text: record.back_text,
            review_count,
            last_reviewed_at: record.last_reviewed_at,
            next_due_at: record.next_due_at,
            correct_count,
        };
        item.validate()?;
        Ok(item)
    }
}
