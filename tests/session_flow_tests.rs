use std::sync::Arc;
use vivid_decks::capabilities::{NotificationLog, SequentialIdSource};
use vivid_decks::session::SessionSummary;
use vivid_decks::{Advance, DeckStore, FileStorage, SeedPolicy, SessionState, Workspace};

fn open_workspace(dir: &std::path::Path) -> Workspace {
    let store = DeckStore::load(
        Box::new(FileStorage::open(dir).unwrap()),
        Arc::new(SequentialIdSource::new("flow")),
        SeedPolicy::Empty,
    )
    .unwrap();
    Workspace::new(store, Arc::new(NotificationLog::new(8)), "http://localhost:3000/")
}

/// Answer every card, correctly when `correct` says so for its front
fn run_session(ws: &mut Workspace, deck_id: &str, correct: impl Fn(&str) -> bool) -> SessionSummary {
    ws.start_session(deck_id).unwrap();
    loop {
        let card = ws.session().unwrap().current_card().unwrap().clone();
        let input = if correct(&card.front) { card.back.to_lowercase() } else { String::new() };
        ws.set_draft(&input).unwrap();
        ws.submit_draft().unwrap();
        if let Advance::Finished(summary) = ws.advance().unwrap() {
            return summary;
        }
    }
}

#[test]
fn test_mixed_session_is_recorded_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let deck_id = {
        let mut ws = open_workspace(dir.path());
        let deck = ws.create_deck("Tiere", None).unwrap();
        ws.store_mut().add_card(&deck.id, "Hund", "Dog").unwrap();
        ws.store_mut().add_card(&deck.id, "Katze", "Cat").unwrap();

        let summary = run_session(&mut ws, &deck.id, |front| front == "Hund");
        assert_eq!((summary.correct, summary.wrong, summary.total), (1, 1, 2));
        assert_eq!(summary.percent, 50);
        assert_eq!(summary.wrong_answers.len(), 1);
        assert_eq!(summary.wrong_answers[0].front, "Katze");
        assert_eq!(summary.wrong_answers[0].input, "");

        let view = ws.session().unwrap().view();
        assert_eq!(view.state, SessionState::Finished);
        assert_eq!(view.progress_percent, 100);
        let katze = view.history.iter().find(|h| h.front == "Katze").unwrap();
        assert_eq!(katze.input, vivid_decks::session::EMPTY_ANSWER_PLACEHOLDER);
        deck.id
    };

    let ws = open_workspace(dir.path());
    let deck = ws.store().deck(&deck_id).unwrap();
    let level = |front: &str| {
        deck.cards
            .iter()
            .find(|c| c.front == front)
            .unwrap()
            .promotion_level
            .value()
    };
    assert_eq!(level("Hund"), 2);
    assert_eq!(level("Katze"), 1);
    assert_eq!(deck.stats.last_percent, 50);
    assert_eq!(deck.stats.best_percent, 50);
    assert_eq!(deck.stats.sessions_completed, 1);
    assert!(deck.stats.last_studied_at.is_some());
    assert!(ws.session().is_none());
}

#[test]
fn test_repeated_success_masters_cards() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = open_workspace(dir.path());
    let deck = ws.create_deck("Farben", None).unwrap();
    ws.store_mut().add_card(&deck.id, "Rot", "Red").unwrap();
    ws.store_mut().add_card(&deck.id, "Grün", "Green").unwrap();

    for _ in 0..6 {
        assert_eq!(run_session(&mut ws, &deck.id, |_| true).percent, 100);
    }

    let stats = ws.store().collection_stats();
    assert_eq!(stats.total_cards, 2);
    assert_eq!(stats.mastered_cards, 2);
    assert_eq!(ws.store().deck(&deck.id).unwrap().mastery_percent(), 100);

    // one miss drops a mastered card straight back to level 1
    run_session(&mut ws, &deck.id, |front| front == "Rot");
    let deck = ws.store().deck(&deck.id).unwrap();
    let green = deck.cards.iter().find(|c| c.front == "Grün").unwrap();
    assert_eq!(green.promotion_level.value(), 1);
    assert_eq!(deck.stats.best_percent, 100);
    assert_eq!(deck.stats.last_percent, 50);
    assert_eq!(deck.stats.sessions_completed, 7);
}

#[test]
fn test_session_survives_edits_to_its_deck() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = open_workspace(dir.path());
    let deck = ws.create_deck("Obst", None).unwrap();
    let apple = ws.store_mut().add_card(&deck.id, "Apfel", "Apple").unwrap();
    ws.store_mut().add_card(&deck.id, "Birne", "Pear").unwrap();

    ws.start_session(&deck.id).unwrap();
    ws.store_mut().delete_card(&deck.id, &apple.id).unwrap();
    ws.store_mut().add_card(&deck.id, "Kirsche", "Cherry").unwrap();

    // the running session keeps its own copy of the cards
    assert_eq!(ws.session().unwrap().cards().len(), 2);

    loop {
        let back = ws.session().unwrap().current_card().unwrap().back.clone();
        ws.submit_answer(&back).unwrap();
        if let Advance::Finished(summary) = ws.advance().unwrap() {
            assert_eq!(summary.percent, 100);
            break;
        }
    }

    let deck = ws.store().deck(&deck.id).unwrap();
    assert_eq!(deck.cards.len(), 2);
    let level = |front: &str| deck.cards.iter().find(|c| c.front == front).unwrap().promotion_level.value();
    assert_eq!(level("Birne"), 2);
    assert_eq!(level("Kirsche"), 1);
}
