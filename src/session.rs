//! Session engine: one shuffled, strictly forward pass over a deck.
//!
//! ```text
//! start ──> InProgress ──submit_answer──> AnswerRevealed ──advance──> InProgress
//!                                               │
//!                                               └──advance (last card)──> Finished
//! ```
//!
//! Out-of-sequence calls fail with [`FlashcardError::InvalidState`] and leave
//! the session untouched. The deck store is never touched from here; the
//! caller applies [`SessionSummary::outcomes`] once the session finishes.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::errors::{FlashcardError, Result};
use crate::models::{Card, Deck, round_percent};
use crate::promotion::PromotionLevel;
use crate::log_session_event;

/// Shown in history instead of a blank answer
pub const EMPTY_ANSWER_PLACEHOLDER: &str = "(empty)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionState {
    InProgress,
    AnswerRevealed { is_correct: bool },
    Finished,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::InProgress => "in progress",
            SessionState::AnswerRevealed { .. } => "showing an answer",
            SessionState::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResults {
    pub correct: usize,
    pub wrong: usize,
}

impl SessionResults {
    pub fn answered(&self) -> usize {
        self.correct + self.wrong
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub card_id: String,
    pub front: String,
    pub back: String,
    /// Exactly what was submitted
    pub input: String,
    pub is_correct: bool,
}

impl HistoryEntry {
    pub fn display_input(&self) -> &str {
        if self.input.trim().is_empty() {
            EMPTY_ANSWER_PLACEHOLDER
        } else {
            &self.input
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongAnswer {
    pub front: String,
    pub back: String,
    pub input: String,
}

/// Per-card result handed back to the deck store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardOutcome {
    pub card_id: String,
    pub correct: bool,
    pub promotion_level: PromotionLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub expected: String,
    pub promotion_level: PromotionLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub deck_id: String,
    pub deck_name: String,
    pub correct: usize,
    pub wrong: usize,
    pub total: usize,
    pub percent: u32,
    pub wrong_answers: Vec<WrongAnswer>,
    pub outcomes: Vec<CardOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next { index: usize },
    Finished(SessionSummary),
}

/// Serializable snapshot for callers. The current back only appears once
/// the answer has been checked.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub deck_id: String,
    pub deck_name: String,
    pub state: SessionState,
    pub position: usize,
    pub total: usize,
    pub progress_percent: u32,
    pub front: Option<String>,
    pub revealed_back: Option<String>,
    pub user_input: String,
    pub results: SessionResults,
    pub history: Vec<HistoryView>,
    pub summary: Option<SessionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub front: String,
    pub back: String,
    pub input: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    deck_id: String,
    deck_name: String,
    cards: Vec<Card>,
    current_index: usize,
    user_input: String,
    state: SessionState,
    results: SessionResults,
    history: Vec<HistoryEntry>,
    outcomes: Vec<CardOutcome>,
}

/// Trimmed, case-insensitive exact equality
pub fn answers_match(input: &str, expected: &str) -> bool {
    input.trim().to_lowercase() == expected.trim().to_lowercase()
}

impl Session {
    pub fn start(deck: &Deck) -> Result<Self> {
        Self::start_with_rng(deck, &mut rand::thread_rng())
    }

    pub fn start_with_rng<R: Rng + ?Sized>(deck: &Deck, rng: &mut R) -> Result<Self> {
        if deck.cards.is_empty() {
            return Err(FlashcardError::EmptyDeck {
                deck_id: deck.id.clone(),
            });
        }

        let mut cards = deck.cards.clone();
        cards.shuffle(rng);

        log_session_event!(started, deck_id = deck.id, card_count = cards.len());

        Ok(Self {
            deck_id: deck.id.clone(),
            deck_name: deck.name.clone(),
            history: Vec::with_capacity(cards.len()),
            outcomes: Vec::with_capacity(cards.len()),
            cards,
            current_index: 0,
            user_input: String::new(),
            state: SessionState::InProgress,
            results: SessionResults::default(),
        })
    }

    pub fn deck_id(&self) -> &str {
        &self.deck_id
    }

    pub fn deck_name(&self) -> &str {
        &self.deck_name
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// 1-based position of the current card
    pub fn position(&self) -> usize {
        self.current_index + 1
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn results(&self) -> SessionResults {
        self.results
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Result of the most recent check, cleared when moving to the next card
    pub fn is_correct(&self) -> Option<bool> {
        match self.state {
            SessionState::AnswerRevealed { is_correct } => Some(is_correct),
            SessionState::Finished => self.history.last().map(|h| h.is_correct),
            SessionState::InProgress => None,
        }
    }

    pub fn current_card(&self) -> Option<&Card> {
        if self.is_finished() {
            None
        } else {
            self.cards.get(self.current_index)
        }
    }

    pub fn progress_percent(&self) -> u32 {
        round_percent(self.results.answered(), self.cards.len())
    }

    fn reject(&self, operation: &'static str) -> FlashcardError {
        log_session_event!(rejected, operation = operation, state = self.state.label());
        FlashcardError::InvalidState {
            operation,
            state: self.state.label(),
        }
    }

    /// Replace the draft answer while the current card is unanswered
    pub fn set_draft(&mut self, input: &str) -> Result<()> {
        if self.state != SessionState::InProgress {
            return Err(self.reject("edit the answer"));
        }
        self.user_input = input.to_string();
        Ok(())
    }

    /// Check the current draft
    pub fn submit_draft(&mut self) -> Result<AnswerFeedback> {
        let input = self.user_input.clone();
        self.submit_answer(&input)
    }

    pub fn submit_answer(&mut self, input: &str) -> Result<AnswerFeedback> {
        if self.state != SessionState::InProgress {
            return Err(self.reject("submit an answer"));
        }
        let card = &self.cards[self.current_index];
        let is_correct = answers_match(input, &card.back);
        let promotion_level = card.promotion_level.after_answer(is_correct);

        self.history.push(HistoryEntry {
            card_id: card.id.clone(),
            front: card.front.clone(),
            back: card.back.clone(),
            input: input.to_string(),
            is_correct,
        });
        self.outcomes.push(CardOutcome {
            card_id: card.id.clone(),
            correct: is_correct,
            promotion_level,
        });
        if is_correct {
            self.results.correct += 1;
        } else {
            self.results.wrong += 1;
        }

        let feedback = AnswerFeedback {
            is_correct,
            expected: card.back.clone(),
            promotion_level,
        };
        self.user_input = input.to_string();
        self.state = SessionState::AnswerRevealed { is_correct };

        log_session_event!(
            answered,
            deck_id = self.deck_id,
            index = self.current_index,
            correct = is_correct
        );
        Ok(feedback)
    }

    pub fn advance(&mut self) -> Result<Advance> {
        if !matches!(self.state, SessionState::AnswerRevealed { .. }) {
            return Err(self.reject("advance"));
        }

        if self.current_index + 1 < self.cards.len() {
            self.current_index += 1;
            self.user_input.clear();
            self.state = SessionState::InProgress;
            return Ok(Advance::Next {
                index: self.current_index,
            });
        }

        self.state = SessionState::Finished;
        let summary = self.build_summary();
        log_session_event!(
            finished,
            deck_id = self.deck_id,
            correct = summary.correct,
            wrong = summary.wrong,
            percent = summary.percent
        );
        Ok(Advance::Finished(summary))
    }

    /// The summary the next `advance` will finish with, if it finishes.
    /// Lets a caller persist the result before the session commits to it.
    pub fn pending_summary(&self) -> Option<SessionSummary> {
        let last_revealed = matches!(self.state, SessionState::AnswerRevealed { .. })
            && self.current_index + 1 == self.cards.len();
        last_revealed.then(|| self.build_summary())
    }

    /// Final figures, available once the session is finished
    pub fn summary(&self) -> Option<SessionSummary> {
        self.is_finished().then(|| self.build_summary())
    }

    fn build_summary(&self) -> SessionSummary {
        let total = self.cards.len();
        SessionSummary {
            deck_id: self.deck_id.clone(),
            deck_name: self.deck_name.clone(),
            correct: self.results.correct,
            wrong: self.results.wrong,
            total,
            percent: round_percent(self.results.correct, total),
            wrong_answers: self
                .history
                .iter()
                .filter(|h| !h.is_correct)
                .map(|h| WrongAnswer {
                    front: h.front.clone(),
                    back: h.back.clone(),
                    input: h.input.clone(),
                })
                .collect(),
            outcomes: self.outcomes.clone(),
        }
    }

    pub fn view(&self) -> SessionView {
        let current = self.current_card();
        let revealed = matches!(self.state, SessionState::AnswerRevealed { .. });
        SessionView {
            deck_id: self.deck_id.clone(),
            deck_name: self.deck_name.clone(),
            state: self.state,
            position: self.position().min(self.cards.len()),
            total: self.cards.len(),
            progress_percent: self.progress_percent(),
            front: current.map(|c| c.front.clone()),
            revealed_back: current.filter(|_| revealed).map(|c| c.back.clone()),
            user_input: self.user_input.clone(),
            results: self.results,
            history: self
                .history
                .iter()
                .map(|h| HistoryView {
                    front: h.front.clone(),
                    back: h.back.clone(),
                    input: h.display_input().to_string(),
                    is_correct: h.is_correct,
                })
                .collect(),
            summary: self.summary(),
        }
    }
}
