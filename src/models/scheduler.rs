//! Spaced repetition scheduler for review items.
//!
//! The policy is exponential doubling:
//! - Every attempt advances the review count, whether the answer was right or wrong
//! - The next interval is `2^review_count` days from the attempt
//! - An item is mastered once its review count reaches [`MASTERY_THRESHOLD`]
//!
//! All functions are pure: they take the item and the current time and hand back new
//! state. Persisting the result is the caller's job.

use super::{InvalidItemState, ReviewItem};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Review count at which an item counts as learned.
pub const MASTERY_THRESHOLD: u32 = 5;

/// Largest exponent used for the interval. `2^26` days (~184,000 years) is the biggest
/// power of two that still lands inside chrono's date range from present-day dates, so
/// intervals keep doubling until date arithmetic itself would overflow.
pub const MAX_INTERVAL_EXPONENT: u32 = 26;

/// Which items a review batch should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Only items that are due ("smart review").
    #[default]
    DueOnly,
    /// The whole deck.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown review strategy '{0}', expected 'due-only' or 'all'")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "due-only" => Ok(Strategy::DueOnly),
            "all" => Ok(Strategy::All),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::DueOnly => f.write_str("due-only"),
            Strategy::All => f.write_str("all"),
        }
    }
}

/// Interval scheduled after an attempt that brought the item to `review_count`.
pub fn interval_for(review_count: u32) -> Duration {
    let exponent = review_count.min(MAX_INTERVAL_EXPONENT);
    Duration::days(1_i64 << exponent)
}

/// True if the item has never been reviewed or its due time has arrived.
pub fn is_due(item: &ReviewItem, now: DateTime<Utc>) -> bool {
    if item.is_new() {
        return true;
    }
    item.next_due_at.is_none_or(|due| now >= due)
}

/// Applies one review attempt and returns the updated item.
///
/// Fails when `item` already violates the scheduling invariants, or when the next due
/// date would fall outside the representable date range.
pub fn record_attempt(
    item: &ReviewItem,
    was_correct: bool,
    now: DateTime<Utc>,
) -> Result<ReviewItem, InvalidItemState> {
    item.validate()?;

    let review_count =
        item.review_count
            .checked_add(1)
            .ok_or_else(|| InvalidItemState::ReviewCountOverflow {
                id: item.id.clone(),
                count: i64::from(item.review_count),
            })?;

    let interval = interval_for(review_count);
    let next_due_at =
        now.checked_add_signed(interval)
            .ok_or_else(|| InvalidItemState::DueDateOutOfRange {
                id: item.id.clone(),
                reviewed_at: now,
            })?;

    tracing::debug!(
        id = %item.id,
        was_correct,
        review_count,
        interval_days = interval.num_days(),
        "scheduled next review"
    );

    Ok(ReviewItem {
        id: item.id.clone(),
        front_text: item.front_text.clone(),
        back_text: item.back_text.clone(),
        review_count,
        last_reviewed_at: Some(now),
        next_due_at: Some(next_due_at),
        mastered: review_count >= MASTERY_THRESHOLD,
        correct_count: item.correct_count + u32::from(was_correct),
    })
}

/// Lazily yields the items to review, in their original order.
///
/// The returned iterator is `Clone`, so a batch can be walked again from the start, and
/// calling this again with the same inputs yields the same sequence.
pub fn select_next_batch(
    items: &[ReviewItem],
    now: DateTime<Utc>,
    strategy: Strategy,
) -> impl Iterator<Item = &ReviewItem> + Clone {
    items
        .iter()
        .filter(move |item| strategy == Strategy::All || is_due(item, now))
}
