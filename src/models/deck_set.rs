//! Container for all available decks
use super::Deck;

#[derive(Clone, Default)]
pub struct DeckSet {
    pub decks: Vec<Deck>,
}

impl DeckSet {
    pub fn get(&self, name: &str) -> Option<&Deck> {
        self.decks.iter().find(|deck| deck.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Deck> {
        self.decks.iter_mut().find(|deck| deck.name == name)
    }
}
