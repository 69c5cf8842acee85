pub mod config;
pub mod database;
pub mod export;
pub mod feedback;
pub mod models;
pub mod speech;

pub use models::{Deck, DeckSet, PracticeSession, ReviewItem, SessionStats, Strategy};
