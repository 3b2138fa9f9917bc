use crate::models::{Card, Deck};

fn seed_deck(id: &str, name: &str, description: &str, pairs: &[(&str, &str, &str)]) -> Deck {
    Deck {
        description: Some(description.to_string()),
        cards: pairs
            .iter()
            .map(|(card_id, front, back)| Card::new(*card_id, *front, *back))
            .collect(),
        ..Deck::new(id, name)
    }
}

/// Decks a fresh installation starts with
pub fn default_decks() -> Vec<Deck> {
    vec![
        seed_deck(
            "vivid-en",
            "Sprache: Englisch",
            "Basis-Vokabular für den Alltag.",
            &[
                ("en-1", "Hund", "Dog"),
                ("en-2", "Katze", "Cat"),
                ("en-3", "Blau", "Blue"),
                ("en-4", "Apfel", "Apple"),
            ],
        ),
        seed_deck(
            "vivid-es",
            "Sprache: Spanisch",
            "Begrüßungen und einfache Zahlen.",
            &[
                ("es-1", "Hallo", "Hola"),
                ("es-2", "Danke", "Gracias"),
                ("es-3", "Bitte", "Por favor"),
                ("es-4", "Eins, zwei, drei", "Uno, dos, tres"),
            ],
        ),
        seed_deck(
            "vivid-it",
            "Sprache: Italienisch",
            "Essen und höfliche Phrasen.",
            &[
                ("it-1", "Guten Tag", "Buongiorno"),
                ("it-2", "Tschüss", "Ciao"),
                ("it-3", "Lecker", "Delizioso"),
                ("it-4", "Frühstück", "Colazione"),
            ],
        ),
    ]
}
