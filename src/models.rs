use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::promotion::PromotionLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub promotion_level: PromotionLevel,
}

impl Card {
    pub fn new(id: impl Into<String>, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            front: front.into(),
            back: back.into(),
            promotion_level: PromotionLevel::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    pub best_percent: u32,
    pub last_percent: u32,
    #[serde(default)]
    pub sessions_completed: u32,
    #[serde(default)]
    pub last_studied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub stats: DeckStats,
}

impl Deck {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            cards: Vec::new(),
            stats: DeckStats::default(),
        }
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    /// Share of cards promoted past the first level, as a rounded percentage
    pub fn mastery_percent(&self) -> u32 {
        let learned = self
            .cards
            .iter()
            .filter(|c| c.promotion_level.value() > PromotionLevel::MIN)
            .count();
        round_percent(learned, self.cards.len())
    }
}

/// Aggregate figures across the whole collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub deck_count: usize,
    pub total_cards: usize,
    pub mastered_cards: usize,
    pub level: u32,
}

impl CollectionStats {
    pub fn from_decks(decks: &[Deck]) -> Self {
        let cards = || decks.iter().flat_map(|d| d.cards.iter());
        let promotions: u32 = cards()
            .map(|c| (c.promotion_level.value() - PromotionLevel::MIN) as u32)
            .sum();

        Self {
            deck_count: decks.len(),
            total_cards: cards().count(),
            mastered_cards: cards().filter(|c| c.promotion_level.is_mastered()).count(),
            level: promotions / PromotionLevel::MAX as u32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeckRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub front: String,
    pub back: String,
}

/// round(part / total * 100) with halves rounded up; 0 when total is 0
pub fn round_percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part * 200 + total) / (total * 2)) as u32
}
