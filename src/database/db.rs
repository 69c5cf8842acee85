//! SQLite storage for the review app
//!
//! Handles database initialization, deck and review item CRUD, progress resets
//! and the simulated "current date" used to fast-forward through review intervals.

use super::{ReviewStore, StoreError, StoreResult};
use crate::models::review_item::count_from_storage;
use crate::models::{Deck, DeckSet, ReviewItem, scheduler::MASTERY_THRESHOLD};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

pub struct SqliteStore {
    conn: Connection,
}

/// Raw column values of one `review_items` row, converted outside the row closure so that
/// timestamp and count errors keep their own error variants.
struct ItemRow {
    id: String,
    front_text: String,
    back_text: String,
    review_count: i64,
    correct_count: i64,
    last_reviewed_at: Option<String>,
    next_due_at: Option<String>,
}

impl ItemRow {
    fn into_item(self) -> StoreResult<ReviewItem> {
        let review_count = count_from_storage(&self.id, self.review_count)?;
        let correct_count = count_from_storage(&self.id, self.correct_count)?;
        let item = ReviewItem {
            review_count,
            correct_count,
            last_reviewed_at: self.last_reviewed_at.as_deref().map(parse_timestamp).transpose()?,
            next_due_at: self.next_due_at.as_deref().map(parse_timestamp).transpose()?,
            mastered: review_count >= MASTERY_THRESHOLD,
            id: self.id,
            front_text: self.front_text,
            back_text: self.back_text,
        };
        item.validate()?;
        Ok(item)
    }
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|t| t.with_timezone(&Utc))
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        tracing::info!(path = %path.display(), "opening review database");
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Creates tables for decks, review items and app state.
    /// Sets current date to now if not already initialized.
    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS decks (
                name TEXT PRIMARY KEY,
                language_tag TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS review_items (
                deck_name TEXT NOT NULL REFERENCES decks(name) ON DELETE CASCADE,
                id TEXT NOT NULL,
                front_text TEXT NOT NULL,
                back_text TEXT NOT NULL,
                review_count INTEGER NOT NULL DEFAULT 0,
                correct_count INTEGER NOT NULL DEFAULT 0,
                last_reviewed_at TEXT,
                next_due_at TEXT,
                mastered INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (deck_name, id)
            );

            CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
            params![format_timestamp(Utc::now())],
        )?;

        Ok(Self { conn })
    }

    /// Retrieves the simulated current date
    pub fn current_date(&self) -> StoreResult<DateTime<Utc>> {
        let value: String = self.conn.query_row(
            "SELECT value FROM app_state WHERE key = 'current_date'",
            [],
            |row| row.get(0),
        )?;
        Ok(parse_timestamp(&value)?)
    }

    /// Advances the simulated current date by 24 hours
    pub fn advance_day(&self) -> StoreResult<DateTime<Utc>> {
        let next_day = self.current_date()? + Duration::days(1);
        self.conn.execute(
            "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
            params![format_timestamp(next_day)],
        )?;
        tracing::info!(date = %next_day, "advanced simulated date");
        Ok(next_day)
    }

    pub fn create_deck(&self, name: &str, language_tag: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO decks (name, language_tag) VALUES (?1, ?2)",
            params![name, language_tag],
        )?;
        tracing::info!(deck = name, language_tag, "deck created");
        Ok(())
    }

    pub fn deck_names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM decks ORDER BY rowid")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Adds a new item to a deck.
    ///
    /// Returns false if the deck already holds an item with the same id.
    pub fn add_item(&self, deck_name: &str, item: &ReviewItem) -> StoreResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO review_items
                (deck_name, id, front_text, back_text, review_count, correct_count,
                 last_reviewed_at, next_due_at, mastered)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                deck_name,
                item.id,
                item.front_text,
                item.back_text,
                item.review_count,
                item.correct_count,
                item.last_reviewed_at.map(format_timestamp),
                item.next_due_at.map(format_timestamp),
                item.mastered,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Imports a whole deck. Fails if a deck with that name already exists.
    pub fn insert_deck(&mut self, deck: &Deck) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO decks (name, language_tag) VALUES (?1, ?2)",
            params![deck.name, deck.language_tag],
        )?;
        {
            let store = SqliteTx(&tx);
            for item in &deck.items {
                item.validate()?;
                store.upsert(&deck.name, item)?;
            }
        }
        tx.commit()?;
        tracing::info!(deck = %deck.name, items = deck.items.len(), "deck imported");
        Ok(())
    }

    /// Loads all decks with their items into memory
    pub fn load_all_decks(&self) -> StoreResult<DeckSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, language_tag FROM decks ORDER BY rowid")?;
        let headers = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut decks = Vec::with_capacity(headers.len());
        for (name, language_tag) in headers {
            let items = self.get_all(&name)?;
            decks.push(Deck {
                name,
                language_tag,
                items,
            });
        }
        Ok(DeckSet { decks })
    }

    fn item_exists(&self, deck: &str, id: &str) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM review_items WHERE deck_name = ?1 AND id = ?2",
                params![deck, id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Upsert shared by plain writes and the import transaction.
struct SqliteTx<'a>(&'a Connection);

impl SqliteTx<'_> {
    fn upsert(&self, deck: &str, item: &ReviewItem) -> StoreResult<()> {
        self.0.execute(
            "INSERT INTO review_items
                (deck_name, id, front_text, back_text, review_count, correct_count,
                 last_reviewed_at, next_due_at, mastered)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (deck_name, id) DO UPDATE SET
                front_text = excluded.front_text,
                back_text = excluded.back_text,
                review_count = excluded.review_count,
                correct_count = excluded.correct_count,
                last_reviewed_at = excluded.last_reviewed_at,
                next_due_at = excluded.next_due_at,
                mastered = excluded.mastered",
            params![
                deck,
                item.id,
                item.front_text,
                item.back_text,
                item.review_count,
                item.correct_count,
                item.last_reviewed_at.map(format_timestamp),
                item.next_due_at.map(format_timestamp),
                item.mastered,
            ],
        )?;
        Ok(())
    }
}

impl ReviewStore for SqliteStore {
    fn get_all(&self, deck: &str) -> StoreResult<Vec<ReviewItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, front_text, back_text, review_count, correct_count, last_reviewed_at, next_due_at
             FROM review_items
             WHERE deck_name = ?1
             ORDER BY rowid",
        )?;

        let rows = stmt
            .query_map(params![deck], |row| {
                Ok(ItemRow {
                    id: row.get(0)?,
                    front_text: row.get(1)?,
                    back_text: row.get(2)?,
                    review_count: row.get(3)?,
                    correct_count: row.get(4)?,
                    last_reviewed_at: row.get(5)?,
                    next_due_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(ItemRow::into_item).collect()
    }

    fn put(&mut self, deck: &str, item: &ReviewItem) -> StoreResult<()> {
        item.validate()?;
        SqliteTx(&self.conn).upsert(deck, item)?;
        tracing::debug!(deck, id = %item.id, review_count = item.review_count, "item saved");
        Ok(())
    }

    fn put_if_unchanged(
        &mut self,
        deck: &str,
        item: &ReviewItem,
        expected_review_count: u32,
    ) -> StoreResult<()> {
        item.validate()?;
        let updated = self.conn.execute(
            "UPDATE review_items
             SET front_text = ?3, back_text = ?4, review_count = ?5, correct_count = ?6,
                 last_reviewed_at = ?7, next_due_at = ?8, mastered = ?9
             WHERE deck_name = ?1 AND id = ?2 AND review_count = ?10",
            params![
                deck,
                item.id,
                item.front_text,
                item.back_text,
                item.review_count,
                item.correct_count,
                item.last_reviewed_at.map(format_timestamp),
                item.next_due_at.map(format_timestamp),
                item.mastered,
                expected_review_count,
            ],
        )?;

        if updated > 0 {
            tracing::debug!(deck, id = %item.id, review_count = item.review_count, "item saved");
            return Ok(());
        }

        if self.item_exists(deck, &item.id)? {
            tracing::warn!(deck, id = %item.id, expected_review_count, "concurrent update detected");
            Err(StoreError::Conflict {
                id: item.id.clone(),
            })
        } else {
            Err(StoreError::NotFound(format!("{deck}/{}", item.id)))
        }
    }

    fn reset_progress(&mut self, deck: &str) -> StoreResult<usize> {
        let reset = self.conn.execute(
            "UPDATE review_items
             SET review_count = 0, correct_count = 0, last_reviewed_at = NULL,
                 next_due_at = NULL, mastered = 0
             WHERE deck_name = ?1",
            params![deck],
        )?;
        tracing::info!(deck, items = reset, "progress reset");
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scheduler::record_attempt;

    fn store_with_deck() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.create_deck("Spanish", "es-ES").unwrap();
        for (front, back) in [("hola", "hello"), ("gracias", "thank you"), ("adiós", "goodbye")] {
            store
                .add_item("Spanish", &ReviewItem::new(front, front, back))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_items_load_in_insertion_order() {
        let store = store_with_deck();
        let ids: Vec<_> = store
            .get_all("Spanish")
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["hola", "gracias", "adiós"]);
    }

    #[test]
    fn test_duplicate_item_is_ignored() {
        let store = store_with_deck();
        let added = store
            .add_item("Spanish", &ReviewItem::new("hola", "hola", "hi"))
            .unwrap();
        assert!(!added);
        assert_eq!(store.get_all("Spanish").unwrap()[0].back_text, "hello");
    }

    #[test]
    fn test_put_roundtrips_schedule() {
        let mut store = store_with_deck();
        let now = store.current_date().unwrap();
        let item = store.get_all("Spanish").unwrap().remove(0);

        let reviewed = record_attempt(&item, true, now).unwrap();
        store.put("Spanish", &reviewed).unwrap();

        let loaded = store.get_all("Spanish").unwrap().remove(0);
        assert_eq!(loaded, reviewed);
    }

    #[test]
    fn test_put_if_unchanged_detects_conflict() {
        let mut store = store_with_deck();
        let now = store.current_date().unwrap();
        let item = store.get_all("Spanish").unwrap().remove(0);

        // Two sessions review the same copy
        let first = record_attempt(&item, true, now).unwrap();
        let second = record_attempt(&item, false, now).unwrap();

        store.put_if_unchanged("Spanish", &first, item.review_count).unwrap();
        let result = store.put_if_unchanged("Spanish", &second, item.review_count);
        assert!(matches!(result, Err(StoreError::Conflict { id }) if id == "hola"));
    }

    #[test]
    fn test_put_if_unchanged_missing_item() {
        let mut store = store_with_deck();
        let result = store.put_if_unchanged("Spanish", &ReviewItem::new("x", "x", "x"), 0);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_reset_progress() {
        let mut store = store_with_deck();
        let now = store.current_date().unwrap();
        for item in store.get_all("Spanish").unwrap() {
            let reviewed = record_attempt(&item, true, now).unwrap();
            store.put("Spanish", &reviewed).unwrap();
        }

        assert_eq!(store.reset_progress("Spanish").unwrap(), 3);
        assert!(store.get_all("Spanish").unwrap().iter().all(ReviewItem::is_new));
    }

    #[test]
    fn test_negative_count_is_rejected_on_load() {
        let store = store_with_deck();
        store
            .conn
            .execute("UPDATE review_items SET review_count = -2 WHERE id = 'hola'", [])
            .unwrap();

        let result = store.get_all("Spanish");
        assert!(matches!(result, Err(StoreError::InvalidItem(_))));
    }

    #[test]
    fn test_advance_day() {
        let store = SqliteStore::in_memory().unwrap();
        let before = store.current_date().unwrap();
        let after = store.advance_day().unwrap();
        assert_eq!(after - before, Duration::days(1));
        assert_eq!(store.current_date().unwrap(), after);
    }

    #[test]
    fn test_insert_and_load_decks() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut deck = Deck::new("French", "fr-FR");
        deck.items.push(ReviewItem::new("chat", "chat", "cat"));
        store.insert_deck(&deck).unwrap();

        assert!(store.insert_deck(&deck).is_err());

        let set = store.load_all_decks().unwrap();
        let french = set.get("French").unwrap();
        assert_eq!(french.language_tag, "fr-FR");
        assert_eq!(french.items.len(), 1);
    }
}
