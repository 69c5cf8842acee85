pub mod deck;
pub mod deck_set;
pub mod practice_session;
pub mod review_item;
pub mod scheduler;
pub mod session_stats;

pub use deck::Deck;
pub use deck_set::DeckSet;
pub use practice_session::{Attempt, PracticeSession, SessionError};
pub use review_item::{InvalidItemState, ReviewItem, Stage};
pub use scheduler::Strategy;
pub use session_stats::SessionStats;
