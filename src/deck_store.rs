use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::capabilities::IdSource;
use crate::defaults::default_decks;
use crate::errors::{FlashcardError, Result};
use crate::models::*;
use crate::session::CardOutcome;
use crate::share_token::{decode_share_payload, encode_share_token};
use crate::storage::KeyValueStorage;
use crate::{log_store_operation, log_validation};

/// Slot holding the whole serialized collection
pub const STORAGE_KEY: &str = "vivid_decks";

const MAX_ID_ATTEMPTS: usize = 64;

/// What to do when the storage slot is empty at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    DefaultDecks,
    Empty,
}

/// Owns every deck. Each mutation serializes the next collection and writes
/// it to storage before the in-memory copy changes, so a failed write leaves
/// both untouched.
pub struct DeckStore {
    storage: Box<dyn KeyValueStorage>,
    ids: Arc<dyn IdSource>,
    decks: Vec<Deck>,
}

impl DeckStore {
    pub fn load(
        storage: Box<dyn KeyValueStorage>,
        ids: Arc<dyn IdSource>,
        seed: SeedPolicy,
    ) -> Result<Self> {
        let stored = storage.get(STORAGE_KEY)?;
        let mut store = Self {
            storage,
            ids,
            decks: Vec::new(),
        };

        match stored {
            Some(bytes) => {
                store.decks = parse_collection(&bytes)?;
                log_store_operation!("load", deck_count = store.decks.len());
            }
            None => {
                let decks = match seed {
                    SeedPolicy::DefaultDecks => default_decks(),
                    SeedPolicy::Empty => Vec::new(),
                };
                store.commit(decks)?;
                log_store_operation!("seed", deck_count = store.decks.len());
            }
        }
        Ok(store)
    }

    pub fn decks(&self) -> &[Deck] {
        &self.decks
    }

    pub fn deck(&self, deck_id: &str) -> Result<&Deck> {
        self.decks
            .iter()
            .find(|d| d.id == deck_id)
            .ok_or_else(|| FlashcardError::not_found("Deck", deck_id))
    }

    pub fn storage(&self) -> &dyn KeyValueStorage {
        self.storage.as_ref()
    }

    pub fn collection_stats(&self) -> CollectionStats {
        CollectionStats::from_decks(&self.decks)
    }

    fn commit(&mut self, next: Vec<Deck>) -> Result<()> {
        let bytes = serde_json::to_vec(&next)
            .map_err(|e| FlashcardError::Storage(format!("cannot serialize decks: {}", e)))?;
        self.storage.set(STORAGE_KEY, &bytes)?;
        self.decks = next;
        Ok(())
    }

    fn fresh_id(&self, taken: impl Fn(&str) -> bool) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.new_id();
            if !taken(&id) {
                return Ok(id);
            }
        }
        Err(FlashcardError::Storage(
            "id source keeps returning ids already in use".to_string(),
        ))
    }

    fn fresh_deck_id(&self) -> Result<String> {
        self.fresh_id(|id| self.decks.iter().any(|d| d.id == id))
    }

    fn position(&self, deck_id: &str) -> Result<usize> {
        self.decks
            .iter()
            .position(|d| d.id == deck_id)
            .ok_or_else(|| FlashcardError::not_found("Deck", deck_id))
    }

    pub fn create_deck(&mut self, name: &str, description: Option<&str>) -> Result<Deck> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FlashcardError::Validation("deck name must not be empty".to_string()));
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let deck = Deck {
            description,
            ..Deck::new(self.fresh_deck_id()?, name)
        };
        let mut next = self.decks.clone();
        next.push(deck.clone());
        self.commit(next)?;

        log_store_operation!("create_deck", deck_id = deck.id, card_count = 0);
        Ok(deck)
    }

    /// Remove a deck and its cards. Returns false when there was nothing to delete.
    pub fn delete_deck(&mut self, deck_id: &str) -> Result<bool> {
        let Ok(index) = self.position(deck_id) else {
            return Ok(false);
        };
        let mut next = self.decks.clone();
        let removed = next.remove(index);
        self.commit(next)?;

        log_store_operation!("delete_deck", deck_id = deck_id, card_count = removed.cards.len());
        Ok(true)
    }

    pub fn add_card(&mut self, deck_id: &str, front: &str, back: &str) -> Result<Card> {
        let (front, back) = (front.trim(), back.trim());
        if front.is_empty() || back.is_empty() {
            return Err(FlashcardError::Validation(
                "card front and back must not be empty".to_string(),
            ));
        }
        let index = self.position(deck_id)?;
        let deck = &self.decks[index];
        let card = Card::new(
            self.fresh_id(|id| deck.cards.iter().any(|c| c.id == id))?,
            front,
            back,
        );

        let mut next = self.decks.clone();
        next[index].cards.push(card.clone());
        let card_count = next[index].cards.len();
        self.commit(next)?;

        log_store_operation!("add_card", deck_id = deck_id, card_count = card_count);
        Ok(card)
    }

    /// Remove one card. Returns false when the deck or card does not exist.
    pub fn delete_card(&mut self, deck_id: &str, card_id: &str) -> Result<bool> {
        let Ok(index) = self.position(deck_id) else {
            return Ok(false);
        };
        let Some(card_index) = self.decks[index].cards.iter().position(|c| c.id == card_id) else {
            return Ok(false);
        };

        let mut next = self.decks.clone();
        next[index].cards.remove(card_index);
        self.commit(next)?;

        log_store_operation!("delete_card", deck_id = deck_id, card_id = card_id);
        Ok(true)
    }

    /// Write a finished session back: card promotion levels plus best/last percent.
    /// Outcomes for cards deleted since the session started are skipped.
    pub fn apply_session_result(&mut self, deck_id: &str, outcomes: &[CardOutcome]) -> Result<Deck> {
        if outcomes.is_empty() {
            return Err(FlashcardError::Validation(
                "a session result needs at least one outcome".to_string(),
            ));
        }
        let index = self.position(deck_id)?;
        let mut next = self.decks.clone();
        let deck = &mut next[index];

        for outcome in outcomes {
            match deck.cards.iter_mut().find(|c| c.id == outcome.card_id) {
                Some(card) => card.promotion_level = outcome.promotion_level,
                None => {
                    log_store_operation!(
                        warn,
                        "apply_session_result",
                        format!("card '{}' no longer in deck '{}'", outcome.card_id, deck_id)
                    );
                }
            }
        }

        let correct = outcomes.iter().filter(|o| o.correct).count();
        let percent = round_percent(correct, outcomes.len());
        deck.stats.last_percent = percent;
        deck.stats.best_percent = deck.stats.best_percent.max(percent);
        deck.stats.sessions_completed += 1;
        deck.stats.last_studied_at = Some(Utc::now());

        let updated = deck.clone();
        self.commit(next)?;

        log_store_operation!("apply_session_result", deck_id = deck_id, card_count = outcomes.len());
        Ok(updated)
    }

    /// Full-fidelity snapshot in the persistence schema
    pub fn export_all(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.decks)
            .map_err(|e| FlashcardError::Storage(format!("cannot serialize decks: {}", e)))
    }

    /// Replace the whole collection, or nothing at all
    pub fn import_all(&mut self, bytes: &[u8]) -> Result<usize> {
        let decks = parse_collection(bytes).inspect_err(|e| {
            log_validation!(failure, "import_all", error = e);
        })?;
        let count = decks.len();
        self.commit(decks)?;

        log_store_operation!("import_all", deck_count = count);
        Ok(count)
    }

    pub fn share_token(&self, deck_id: &str) -> Result<String> {
        encode_share_token(self.deck(deck_id)?)
    }

    /// Decode a token into a detached deck with ids that are free in this store
    pub fn decode_share_token(&self, token: &str) -> Result<Deck> {
        let payload = decode_share_payload(token)?;
        let mut deck = Deck::new(self.fresh_deck_id()?, payload.name);
        for (front, back) in payload.cards {
            let id = self.fresh_id(|id| deck.cards.iter().any(|c| c.id == id))?;
            deck.cards.push(Card::new(id, front, back));
        }
        Ok(deck)
    }

    pub fn import_share_token(&mut self, token: &str) -> Result<Deck> {
        let deck = self.decode_share_token(token)?;
        let mut next = self.decks.clone();
        next.push(deck.clone());
        self.commit(next)?;

        log_store_operation!("import_share_token", deck_id = deck.id, card_count = deck.cards.len());
        Ok(deck)
    }

    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.commit(default_decks())?;
        log_store_operation!("reset_to_defaults", deck_count = self.decks.len());
        Ok(())
    }
}

/// Parse and check a serialized collection
pub fn parse_collection(bytes: &[u8]) -> Result<Vec<Deck>> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| FlashcardError::Format(format!("deck collection is not valid: {}", e)))?;
    reject_legacy_cards(&value)?;
    let decks: Vec<Deck> = serde_json::from_value(value)
        .map_err(|e| FlashcardError::Format(format!("deck collection is not valid: {}", e)))?;
    validate_collection(&decks)?;
    Ok(decks)
}

/// Browser-app backups store levels under `box`; importing them as-is would
/// reset every card to level 1.
fn reject_legacy_cards(value: &serde_json::Value) -> Result<()> {
    let legacy = value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|deck| deck.get("cards").and_then(serde_json::Value::as_array))
        .flatten()
        .any(|card| card.get("box").is_some() && card.get("promotion_level").is_none());
    if legacy {
        return Err(FlashcardError::Format(
            "legacy backup with `box` levels; convert it with migrate_backup first".to_string(),
        ));
    }
    Ok(())
}

fn validate_collection(decks: &[Deck]) -> Result<()> {
    let mut deck_ids = HashSet::new();
    for deck in decks {
        if deck.id.is_empty() || !deck_ids.insert(deck.id.as_str()) {
            return Err(FlashcardError::Format(format!(
                "deck id '{}' is empty or duplicated",
                deck.id
            )));
        }
        if deck.name.trim().is_empty() {
            return Err(FlashcardError::Format(format!("deck '{}' has no name", deck.id)));
        }

        let mut card_ids = HashSet::new();
        for card in &deck.cards {
            if card.id.is_empty() || !card_ids.insert(card.id.as_str()) {
                return Err(FlashcardError::Format(format!(
                    "card id '{}' is empty or duplicated in deck '{}'",
                    card.id, deck.id
                )));
            }
            if card.front.trim().is_empty() || card.back.trim().is_empty() {
                return Err(FlashcardError::Format(format!(
                    "card '{}' in deck '{}' has an empty side",
                    card.id, deck.id
                )));
            }
        }
    }
    Ok(())
}
