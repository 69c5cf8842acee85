//! JSON import/export module for decks.
//! Items are written in their persisted record shape: camelCase fields and RFC 3339 timestamps.

use crate::models::{Deck, InvalidItemState};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid deck file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid item: {0}")]
    InvalidItem(#[from] InvalidItemState),

    #[error("deck '{deck}' contains item '{id}' twice")]
    DuplicateItem { deck: String, id: String },
}

/// Exports a deck to a JSON file at the specified path.
pub fn export_json_to_path(deck: &Deck, path: &Path) -> Result<(), ExportError> {
    let json_string = serde_json::to_string_pretty(deck)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    tracing::info!(deck = %deck.name, path = %path.display(), "deck exported");
    Ok(())
}

/// Imports a deck from a JSON file.
/// Every item is checked against the scheduling invariants while parsing.
pub fn import_json(path: &Path) -> Result<Deck, ExportError> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let deck: Deck = serde_json::from_str(&contents)?;

    let mut seen = std::collections::HashSet::new();
    for item in &deck.items {
        item.validate()?;
        if !seen.insert(item.id.as_str()) {
            return Err(ExportError::DuplicateItem {
                deck: deck.name.clone(),
                id: item.id.clone(),
            });
        }
    }

    tracing::info!(deck = %deck.name, path = %path.display(), items = deck.items.len(), "deck imported");
    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewItem;
    use crate::models::scheduler::record_attempt;
    use chrono::{TimeZone, Utc};
    use std::fs;

    fn create_test_deck() -> Deck {
        let mut deck = Deck::new("Test Deck", "pl-PL");
        let reviewed = record_attempt(
            &ReviewItem::new("cześć", "cześć", "hello"),
            true,
            Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap(),
        )
        .unwrap();
        deck.items.push(reviewed);
        deck.items.push(ReviewItem::new("dziękuję", "dziękuję", "thank you"));
        deck
    }

    #[test]
    fn test_export_and_import_roundtrip() {
        let original_deck = create_test_deck();
        let test_file = Path::new("test_lingua_roundtrip.json");

        export_json_to_path(&original_deck, test_file).unwrap();
        let imported_deck = import_json(test_file).unwrap();
        let _ = fs::remove_file(test_file);

        assert_eq!(original_deck.name, imported_deck.name);
        assert_eq!(original_deck.language_tag, imported_deck.language_tag);
        assert_eq!(original_deck.items, imported_deck.items);
    }

    #[test]
    fn test_import_record_shape() {
        let json_content = r#"{
  "name": "Import Test Deck",
  "languageTag": "es-MX",
  "items": [
    {
      "id": "hola",
      "frontText": "hola",
      "backText": "hello",
      "reviewCount": 2,
      "lastReviewedAt": "2024-01-18T10:00:00Z",
      "nextDueAt": "2024-01-22T10:00:00Z",
      "mastered": false,
      "correctCount": 1
    }
  ]
}"#;

        let test_file = Path::new("test_lingua_import.json");
        fs::write(test_file, json_content).unwrap();
        let result = import_json(test_file);
        let _ = fs::remove_file(test_file);

        let deck = result.unwrap();
        assert_eq!(deck.language_tag, "es-MX");
        assert_eq!(deck.items[0].review_count, 2);
        assert_eq!(deck.items[0].correct_count, 1);
    }

    #[test]
    fn test_import_rejects_inverted_timestamps() {
        let json_content = r#"{"name":"Bad","items":[{"id":"a","frontText":"a","backText":"b",
            "reviewCount":1,"lastReviewedAt":"2024-01-22T00:00:00Z","nextDueAt":"2024-01-20T00:00:00Z","mastered":false}]}"#;

        let test_file = Path::new("test_lingua_inverted.json");
        fs::write(test_file, json_content).unwrap();
        let result = import_json(test_file);
        let _ = fs::remove_file(test_file);

        assert!(matches!(result, Err(ExportError::Json(_))));
    }

    #[test]
    fn test_import_rejects_duplicate_ids() {
        let json_content = r#"{"name":"Dup","items":[
            {"id":"a","frontText":"a","backText":"b","reviewCount":0,"mastered":false},
            {"id":"a","frontText":"a","backText":"c","reviewCount":0,"mastered":false}]}"#;

        let test_file = Path::new("test_lingua_duplicate.json");
        fs::write(test_file, json_content).unwrap();
        let result = import_json(test_file);
        let _ = fs::remove_file(test_file);

        assert!(matches!(result, Err(ExportError::DuplicateItem { .. })));
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_json(Path::new("nonexistent_file_xyz123.json"));
        assert!(matches!(result, Err(ExportError::Io(_))));
    }

    #[test]
    fn test_import_invalid_json() {
        let test_file = Path::new("test_lingua_invalid.json");
        fs::write(test_file, "{ this is not valid json }").unwrap();
        let result = import_json(test_file);
        let _ = fs::remove_file(test_file);

        assert!(result.is_err());
    }
}
