// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros so every layer emits the same field names
///
/// Card text (fronts, backs, user input) is only ever logged at debug level.

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, deck_id = $deck_id:expr) => {
        tracing::debug!(
            operation = $operation,
            deck_id = %$deck_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, deck_id = $deck_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            deck_id = %$deck_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, deck_id = $deck_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            deck_id = %$deck_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// Deck Store Logging Macros
// ============================================================================

/// Log deck store mutations
#[macro_export]
macro_rules! log_store_operation {
    (warn, $operation:expr, $msg:expr) => {
        tracing::warn!(
            component = "deck_store",
            operation = $operation,
            "Deck store warning: {}", $msg
        );
    };
    ($operation:expr, deck_id = $deck_id:expr, card_count = $count:expr) => {
        tracing::info!(
            component = "deck_store",
            operation = $operation,
            deck_id = %$deck_id,
            card_count = $count,
            "Deck store operation completed"
        );
    };
    ($operation:expr, deck_id = $deck_id:expr, card_id = $card_id:expr) => {
        tracing::info!(
            component = "deck_store",
            operation = $operation,
            deck_id = %$deck_id,
            card_id = %$card_id,
            "Deck store operation completed"
        );
    };
    ($operation:expr, deck_count = $count:expr) => {
        tracing::info!(
            component = "deck_store",
            operation = $operation,
            deck_count = $count,
            "Deck store operation completed"
        );
    };
}

// ============================================================================
// Storage Logging Macros
// ============================================================================

/// Log durable slot reads and writes
#[macro_export]
macro_rules! log_storage_operation {
    (debug, $operation:expr, bytes = $bytes:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "storage",
            operation = $operation,
            bytes = $bytes,
            duration_ms = $duration,
            "Storage operation completed"
        );
    };
    (info, $operation:expr, $msg:expr) => {
        tracing::info!(
            component = "storage",
            operation = $operation,
            "Storage operation: {}", $msg
        );
    };
    (error, $operation:expr, error = $error:expr) => {
        tracing::error!(
            component = "storage",
            operation = $operation,
            error = %$error,
            "Storage operation failed"
        );
    };
}

// ============================================================================
// Session Engine Logging Macros
// ============================================================================

/// Log session lifecycle transitions
#[macro_export]
macro_rules! log_session_event {
    (started, deck_id = $deck_id:expr, card_count = $count:expr) => {
        tracing::info!(
            component = "session",
            event = "started",
            deck_id = %$deck_id,
            card_count = $count,
            "Session started"
        );
    };
    (answered, deck_id = $deck_id:expr, index = $index:expr, correct = $correct:expr) => {
        tracing::debug!(
            component = "session",
            event = "answered",
            deck_id = %$deck_id,
            index = $index,
            correct = $correct,
            "Answer checked"
        );
    };
    (finished, deck_id = $deck_id:expr, correct = $correct:expr, wrong = $wrong:expr, percent = $percent:expr) => {
        tracing::info!(
            component = "session",
            event = "finished",
            deck_id = %$deck_id,
            correct = $correct,
            wrong = $wrong,
            percent = $percent,
            "Session finished"
        );
    };
    (rejected, operation = $operation:expr, state = $state:expr) => {
        tracing::warn!(
            component = "session",
            event = "rejected",
            operation = $operation,
            state = $state,
            "Session call out of sequence"
        );
    };
    (discarded, deck_id = $deck_id:expr, $reason:expr) => {
        tracing::info!(
            component = "session",
            event = "discarded",
            deck_id = %$deck_id,
            "Session discarded: {}", $reason
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::errors::FlashcardError;

    #[test]
    fn test_logging_macros_compile() {
        let deck_id = "vivid-en";
        let error = FlashcardError::Validation("empty name".to_string());

        log_api_start!("get_deck", deck_id = deck_id);
        log_api_start!("list_decks");
        log_api_success!("get_deck", deck_id = deck_id, "deck retrieved");
        log_api_success!("list_decks", count = 3, "decks listed");
        log_api_success!("reset", "collection reset");
        log_api_warn!("get_deck", deck_id = deck_id, "deck not found");
        log_api_warn!("drain", "nothing pending");
        log_api_error!("create_deck", error = error, "rejected");

        log_store_operation!("add_card", deck_id = deck_id, card_count = 5);
        log_store_operation!("delete_card", deck_id = deck_id, card_id = "en-1");
        log_store_operation!("import_all", deck_count = 2);
        log_store_operation!(warn, "apply_session_result", "card vanished");

        log_storage_operation!(debug, "write_slot", bytes = 42, duration_ms = 1);
        log_storage_operation!(info, "open", "using data/");
        log_storage_operation!(error, "read_slot", error = error);

        log_session_event!(started, deck_id = deck_id, card_count = 4);
        log_session_event!(answered, deck_id = deck_id, index = 0, correct = true);
        log_session_event!(finished, deck_id = deck_id, correct = 3, wrong = 1, percent = 75);
        log_session_event!(rejected, operation = "advance", state = "in progress");
        log_session_event!(discarded, deck_id = deck_id, "new session started");

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(shutdown, component = "server", "server stopped");
        log_system_event!(config, "configuration loaded successfully");

        log_validation!(success, "config", "configuration validated");
        log_validation!(failure, "import", error = error);
    }
}
