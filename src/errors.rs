use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Every failure the deck store and session engine can report
#[derive(Debug, thiserror::Error)]
pub enum FlashcardError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Deck '{deck_id}' has no cards to study")]
    EmptyDeck { deck_id: String },

    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Malformed payload: {0}")]
    Format(String),

    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, FlashcardError>;

impl FlashcardError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        FlashcardError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FlashcardError::Validation(_) | FlashcardError::Format(_) => StatusCode::BAD_REQUEST,
            FlashcardError::EmptyDeck { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FlashcardError::InvalidState { .. } => StatusCode::CONFLICT,
            FlashcardError::NotFound { .. } => StatusCode::NOT_FOUND,
            FlashcardError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for FlashcardError {
    fn from(err: std::io::Error) -> Self {
        FlashcardError::Storage(err.to_string())
    }
}

/// Error context for structured logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }
}

impl FlashcardError {
    /// Convert to an HTTP response with consistent structure and logging
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        let status = self.status_code();
        match &self {
            FlashcardError::NotFound { .. } => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (status, Json(ApiResponse::error(self.to_string())))
            }
            FlashcardError::Validation(_)
            | FlashcardError::Format(_)
            | FlashcardError::EmptyDeck { .. }
            | FlashcardError::InvalidState { .. } => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Request rejected"
                );
                (status, Json(ApiResponse::error(self.to_string())))
            }
            FlashcardError::Storage(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Storage error"
                );
                (
                    status,
                    Json(ApiResponse::error(
                        "Saving decks failed. Please try again.".to_string(),
                    )),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("add_card", "deck").with_id("vivid-en");

        assert_eq!(context.operation, "add_card");
        assert_eq!(context.resource_type, "deck");
        assert_eq!(context.resource_id, Some("vivid-en".to_string()));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = vec![
            (FlashcardError::Validation("name".into()), StatusCode::BAD_REQUEST),
            (FlashcardError::Format("not json".into()), StatusCode::BAD_REQUEST),
            (
                FlashcardError::EmptyDeck { deck_id: "d".into() },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                FlashcardError::InvalidState { operation: "advance", state: "in progress" },
                StatusCode::CONFLICT,
            ),
            (FlashcardError::not_found("Deck", "x"), StatusCode::NOT_FOUND),
            (FlashcardError::Storage("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let (status, _) = error.to_response_with_context(ErrorContext::new("test", "deck"));
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_error_messages() {
        let error = FlashcardError::not_found("Card", "c-1");
        assert_eq!(error.to_string(), "Card with id 'c-1' not found");

        let error = FlashcardError::InvalidState { operation: "advance", state: "in progress" };
        assert_eq!(error.to_string(), "Cannot advance while session is in progress");
    }

    #[test]
    fn test_io_errors_become_storage_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert!(matches!(FlashcardError::from(io), FlashcardError::Storage(_)));
    }
}
