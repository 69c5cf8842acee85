//! Deck is a named set of review items in one target language
use super::ReviewItem;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub name: String,
    /// BCP-47 tag used when speaking or listening to the front text.
    #[serde(default = "default_language_tag")]
    pub language_tag: String,
    pub items: Vec<ReviewItem>,
}

fn default_language_tag() -> String {
    "es-ES".to_string()
}

impl Default for Deck {
    fn default() -> Self {
        Self {
            name: "My Deck".to_string(),
            language_tag: default_language_tag(),
            items: Vec::new(),
        }
    }
}

impl Deck {
    pub fn new(name: impl Into<String>, language_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language_tag: language_tag.into(),
            items: Vec::new(),
        }
    }

    pub fn find(&self, id: &str) -> Option<&ReviewItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Replaces the stored copy of `item`, matched by id.
    /// Returns false when the deck has no item with that id.
    pub fn replace(&mut self, item: ReviewItem) -> bool {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item;
                true
            }
            None => false,
        }
    }
}

/// Stable item id for a front text: lowercase words joined with dashes.
/// `None` when the text has no letters or digits to build an id from.
pub fn item_id(front_text: &str) -> Option<String> {
    let id = front_text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id() {
        assert_eq!(item_id("¿Dónde está el baño?").as_deref(), Some("dónde-está-el-baño"));
        assert_eq!(item_id("  Buenos   días ").as_deref(), Some("buenos-días"));
    }

    #[test]
    fn test_item_id_needs_a_word() {
        assert_eq!(item_id("¿?"), None);
        assert_eq!(item_id("  ...  "), None);
    }

    #[test]
    fn test_replace_by_id() {
        let mut deck = Deck::new("Spanish", "es-ES");
        deck.items.push(ReviewItem::new("gato", "gato", "cat"));

        assert!(deck.replace(ReviewItem::new("gato", "gato", "cat (animal)")));
        assert_eq!(deck.find("gato").unwrap().back_text, "cat (animal)");

        assert!(!deck.replace(ReviewItem::new("perro", "perro", "dog")));
    }

    #[test]
    fn test_language_tag_defaults_when_missing() {
        let deck: Deck = serde_json::from_str(r#"{"name":"Old","items":[]}"#).unwrap();
        assert_eq!(deck.language_tag, "es-ES");
    }
}
