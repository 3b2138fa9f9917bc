//! Share tokens: `base64url(JSON)` without padding, so a token can sit in a
//! URL query parameter as-is.
//!
//! Payload schema (the only one accepted):
//!
//! ```json
//! { "name": "Sprache: Englisch", "cards": [["Hund", "Dog"], ["Katze", "Cat"]] }
//! ```
//!
//! Ids, promotion levels and stats are never part of a token.

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::{Deserialize, Serialize};

use crate::errors::{FlashcardError, Result};
use crate::models::Deck;

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Query parameter carrying a token in share links
pub const SHARE_QUERY_PARAM: &str = "seed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    pub name: String,
    pub cards: Vec<(String, String)>,
}

impl SharePayload {
    pub fn from_deck(deck: &Deck) -> Self {
        Self {
            name: deck.name.clone(),
            cards: deck
                .cards
                .iter()
                .map(|c| (c.front.clone(), c.back.clone()))
                .collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FlashcardError::Format("share token has no deck name".to_string()));
        }
        if let Some(index) = self
            .cards
            .iter()
            .position(|(front, back)| front.trim().is_empty() || back.trim().is_empty())
        {
            return Err(FlashcardError::Format(format!(
                "share token card {} has an empty side",
                index + 1
            )));
        }
        Ok(())
    }
}

pub fn encode_share_token(deck: &Deck) -> Result<String> {
    let json = serde_json::to_vec(&SharePayload::from_deck(deck))
        .map_err(|e| FlashcardError::Format(format!("cannot serialize deck: {}", e)))?;
    Ok(TOKEN_ENGINE.encode(json))
}

pub fn decode_share_payload(token: &str) -> Result<SharePayload> {
    let bytes = TOKEN_ENGINE
        .decode(token.trim())
        .map_err(|e| FlashcardError::Format(format!("share token is not base64url: {}", e)))?;
    let payload: SharePayload = serde_json::from_slice(&bytes)
        .map_err(|e| FlashcardError::Format(format!("share token payload invalid: {}", e)))?;
    payload.validate()?;
    Ok(payload)
}

/// `<base>?seed=<token>`, appending with `&` when the base already has a query
pub fn share_link(base_url: &str, token: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base_url, separator, SHARE_QUERY_PARAM, token)
}

/// Accept either a bare token or a whole share link
pub fn token_from_input(input: &str) -> &str {
    let input = input.trim();
    let input = input.split_once('#').map_or(input, |(head, _)| head);
    let Some((_, query)) = input.split_once('?') else {
        return input;
    };
    let prefix = format!("{}=", SHARE_QUERY_PARAM);
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(prefix.as_str()))
        .unwrap_or(input)
}
