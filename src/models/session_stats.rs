//! Aggregate progress figures, always recomputed from the items themselves.
use super::{ReviewItem, scheduler};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionStats {
    pub total: usize,
    pub reviewed: usize,
    pub mastered: usize,
    pub due: usize,
    pub attempts: u64,
    pub correct: u64,
}

impl SessionStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a ReviewItem>, now: DateTime<Utc>) -> Self {
        items.into_iter().fold(Self::default(), |mut stats, item| {
            stats.total += 1;
            if !item.is_new() {
                stats.reviewed += 1;
            }
            if item.mastered {
                stats.mastered += 1;
            }
            if scheduler::is_due(item, now) {
                stats.due += 1;
            }
            stats.attempts += u64::from(item.review_count);
            stats.correct += u64::from(item.correct_count);
            stats
        })
    }

    /// Share of attempts judged correct, `None` before the first attempt.
    pub fn accuracy(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.correct as f64 / self.attempts as f64)
    }

    pub fn summary(&self) -> String {
        let accuracy = self
            .accuracy()
            .map(|a| format!("{:.0}%", a * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "{} items, {} reviewed, {} mastered, {} due, accuracy {}",
            self.total, self.reviewed, self.mastered, self.due, accuracy
        )
    }
}
