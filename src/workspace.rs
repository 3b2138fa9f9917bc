use std::sync::Arc;

use crate::capabilities::{ExportArtifact, ExportSink, Notifier};
use crate::deck_store::DeckStore;
use crate::errors::{FlashcardError, Result};
use crate::log_session_event;
use crate::models::Deck;
use crate::session::{Advance, AnswerFeedback, Session, SessionSummary};
use crate::share_token::{share_link, token_from_input};

pub const BACKUP_FILE_NAME: &str = "vivid_backup.json";

/// One user's context: the deck store plus at most one running session
pub struct Workspace {
    store: DeckStore,
    session: Option<Session>,
    notifier: Arc<dyn Notifier>,
    share_base_url: String,
}

impl Workspace {
    pub fn new(store: DeckStore, notifier: Arc<dyn Notifier>, share_base_url: &str) -> Self {
        Self {
            store,
            session: None,
            notifier,
            share_base_url: share_base_url.to_string(),
        }
    }

    pub fn store(&self) -> &DeckStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DeckStore {
        &mut self.store
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn active_session(&mut self, operation: &'static str) -> Result<&mut Session> {
        self.session.as_mut().ok_or(FlashcardError::InvalidState {
            operation,
            state: "not running",
        })
    }

    /// Start reviewing a deck, replacing whatever session was running
    pub fn start_session(&mut self, deck_id: &str) -> Result<&Session> {
        let deck = self.store.deck(deck_id)?;
        let session = match Session::start(deck) {
            Ok(session) => session,
            Err(e) => {
                if matches!(e, FlashcardError::EmptyDeck { .. }) {
                    self.notifier.notify("Deck is empty");
                }
                return Err(e);
            }
        };

        if let Some(previous) = self.session.take() {
            log_session_event!(discarded, deck_id = previous.deck_id(), "replaced by a new session");
        }
        Ok(&*self.session.insert(session))
    }

    pub fn set_draft(&mut self, input: &str) -> Result<()> {
        self.active_session("edit the answer")?.set_draft(input)
    }

    pub fn submit_answer(&mut self, input: &str) -> Result<AnswerFeedback> {
        self.active_session("submit an answer")?.submit_answer(input)
    }

    pub fn submit_draft(&mut self) -> Result<AnswerFeedback> {
        self.active_session("submit an answer")?.submit_draft()
    }

    /// Move past the revealed card. Passing the last card writes the result
    /// to the deck store first; if that write fails the session stays on the
    /// revealed card and the advance can be retried. The finished session
    /// stays readable until another one starts or it is abandoned.
    pub fn advance(&mut self) -> Result<Advance> {
        if let Some(summary) = self.active_session("advance")?.pending_summary() {
            self.record(&summary)?;
        }
        self.active_session("advance")?.advance()
    }

    fn record(&mut self, summary: &SessionSummary) -> Result<()> {
        match self.store.apply_session_result(&summary.deck_id, &summary.outcomes) {
            Ok(_) => Ok(()),
            Err(FlashcardError::NotFound { .. }) => {
                log_session_event!(discarded, deck_id = summary.deck_id, "deck deleted before the session finished");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the running session without touching the store
    pub fn abandon_session(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                log_session_event!(discarded, deck_id = session.deck_id(), "abandoned");
                true
            }
            None => false,
        }
    }

    pub fn create_deck(&mut self, name: &str, description: Option<&str>) -> Result<Deck> {
        self.store.create_deck(name, description)
    }

    /// Delete a deck. A session running over it is discarded as well.
    pub fn delete_deck(&mut self, deck_id: &str) -> Result<bool> {
        let deleted = self.store.delete_deck(deck_id)?;
        if deleted && self.session.as_ref().is_some_and(|s| s.deck_id() == deck_id) {
            self.session = None;
            log_session_event!(discarded, deck_id = deck_id, "deck deleted");
        }
        Ok(deleted)
    }

    pub fn share_deck(&self, deck_id: &str, sink: &dyn ExportSink) -> Result<String> {
        let deck = self.store.deck(deck_id)?;
        let link = share_link(&self.share_base_url, &self.store.share_token(deck_id)?);
        match sink.deliver(ExportArtifact::ShareLink {
            deck_name: deck.name.clone(),
            link: link.clone(),
        }) {
            Ok(()) => {
                self.notifier.notify("Link copied");
                Ok(link)
            }
            Err(e) => {
                self.notifier.notify("Copy failed");
                Err(e)
            }
        }
    }

    /// Import a shared deck from a bare token or a whole share link
    pub fn import_share_token(&mut self, token: &str) -> Result<Deck> {
        let result = self.store.import_share_token(token_from_input(token));
        match &result {
            Ok(deck) => self.notifier.notify(&format!("Imported \"{}\"", deck.name)),
            Err(_) => self.notifier.notify("Invalid share link"),
        }
        result
    }

    pub fn export_backup(&self, sink: &dyn ExportSink) -> Result<()> {
        let bytes = self.store.export_all()?;
        sink.deliver(ExportArtifact::Backup {
            file_name: BACKUP_FILE_NAME.to_string(),
            bytes,
        })
    }

    pub fn import_backup(&mut self, bytes: &[u8]) -> Result<usize> {
        let result = self.store.import_all(bytes);
        match &result {
            Ok(_) => {
                self.notifier.notify("Data loaded");
                self.abandon_session();
            }
            Err(_) => self.notifier.notify("Import failed"),
        }
        result
    }

    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.store.reset_to_defaults()?;
        self.abandon_session();
        self.notifier.notify("Reset");
        Ok(())
    }
}
