use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    capabilities::{CapturingSink, ExportArtifact, NotificationLog},
    errors::{ErrorContext, FlashcardError},
    models::*,
    session::{Advance, AnswerFeedback, SessionView},
    workspace::Workspace,
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Mutex<Workspace>>,
    pub notifications: Arc<NotificationLog>,
}

impl AppState {
    pub fn new(workspace: Workspace, notifications: Arc<NotificationLog>) -> Self {
        Self {
            workspace: Arc::new(Mutex::new(workspace)),
            notifications,
        }
    }
}

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub deck_id: String,
}

#[derive(Deserialize)]
pub struct DraftRequest {
    pub input: String,
}

/// Without `input` the current draft is submitted
#[derive(Deserialize)]
pub struct AnswerRequest {
    pub input: Option<String>,
}

#[derive(Deserialize)]
pub struct ImportShareRequest {
    pub token: String,
}

#[derive(Serialize)]
pub struct ShareResponse {
    pub link: String,
}

#[derive(Serialize)]
pub struct ImportBackupResponse {
    pub deck_count: usize,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub feedback: AnswerFeedback,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct AdvanceResponse {
    pub finished: bool,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

fn lock_workspace<'a>(
    state: &'a AppState,
    context: &ErrorContext,
) -> Result<MutexGuard<'a, Workspace>, ErrorResponse> {
    state.workspace.lock().map_err(|_| {
        log_api_error!(context.operation.as_str(), error = "poisoned", "workspace lock poisoned");
        FlashcardError::Storage("workspace lock poisoned".to_string())
            .to_response_with_context(context.clone())
    })
}

// Deck endpoints
pub async fn list_decks(State(state): State<AppState>) -> ApiResult<Vec<Deck>> {
    log_api_start!("list_decks");
    let context = ErrorContext::new("list_decks", "deck");
    let workspace = lock_workspace(&state, &context)?;
    let decks = workspace.store().decks().to_vec();
    log_api_success!("list_decks", count = decks.len(), "decks listed");
    Ok(Json(ApiResponse::success(decks)))
}

pub async fn create_deck(
    State(state): State<AppState>,
    Json(request): Json<CreateDeckRequest>,
) -> ApiResult<Deck> {
    log_api_start!("create_deck");
    let context = ErrorContext::new("create_deck", "deck");
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.create_deck(&request.name, request.description.as_deref()) {
        Ok(deck) => {
            log_api_success!("create_deck", deck_id = deck.id, "deck created");
            Ok(Json(ApiResponse::success(deck)))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn get_deck(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deck> {
    log_api_start!("get_deck", deck_id = id);
    let context = ErrorContext::new("get_deck", "deck").with_id(&id);
    let workspace = lock_workspace(&state, &context)?;

    match workspace.store().deck(&id) {
        Ok(deck) => Ok(Json(ApiResponse::success(deck.clone()))),
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn delete_deck(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    log_api_start!("delete_deck", deck_id = id);
    let context = ErrorContext::new("delete_deck", "deck").with_id(&id);
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.delete_deck(&id) {
        Ok(true) => {
            log_api_success!("delete_deck", deck_id = id, "deck deleted");
            Ok(Json(ApiResponse::success(())))
        }
        Ok(false) => {
            log_api_warn!("delete_deck", deck_id = id, "deck not found");
            Err(FlashcardError::not_found("Deck", id.as_str()).to_response_with_context(context))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn add_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CreateCardRequest>,
) -> ApiResult<Card> {
    log_api_start!("add_card", deck_id = id);
    let context = ErrorContext::new("add_card", "deck").with_id(&id);
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.store_mut().add_card(&id, &request.front, &request.back) {
        Ok(card) => {
            log_api_success!("add_card", deck_id = id, "card added");
            Ok(Json(ApiResponse::success(card)))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path((id, card_id)): Path<(String, String)>,
) -> ApiResult<()> {
    log_api_start!("delete_card", deck_id = id);
    let context = ErrorContext::new("delete_card", "card").with_id(&card_id);
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.store_mut().delete_card(&id, &card_id) {
        Ok(true) => {
            log_api_success!("delete_card", deck_id = id, "card deleted");
            Ok(Json(ApiResponse::success(())))
        }
        Ok(false) => {
            if let Err(e) = workspace.store().deck(&id) {
                log_api_warn!("delete_card", deck_id = id, "deck not found");
                return Err(e.to_response_with_context(
                    ErrorContext::new("delete_card", "deck").with_id(&id),
                ));
            }
            log_api_warn!("delete_card", deck_id = id, "card not found");
            Err(FlashcardError::not_found("Card", card_id.as_str())
                .to_response_with_context(context))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn get_stats(State(state): State<AppState>) -> ApiResult<CollectionStats> {
    let context = ErrorContext::new("get_stats", "collection");
    let workspace = lock_workspace(&state, &context)?;
    Ok(Json(ApiResponse::success(workspace.store().collection_stats())))
}

// Sharing endpoints
pub async fn share_deck(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ShareResponse> {
    log_api_start!("share_deck", deck_id = id);
    let context = ErrorContext::new("share_deck", "deck").with_id(&id);
    let workspace = lock_workspace(&state, &context)?;
    let sink = CapturingSink::new();

    match workspace.share_deck(&id, &sink) {
        Ok(link) => {
            log_api_success!("share_deck", deck_id = id, "share link created");
            Ok(Json(ApiResponse::success(ShareResponse { link })))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn import_share(
    State(state): State<AppState>,
    Json(request): Json<ImportShareRequest>,
) -> ApiResult<Deck> {
    log_api_start!("import_share");
    let context = ErrorContext::new("import_share", "share_token");
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.import_share_token(&request.token) {
        Ok(deck) => {
            log_api_success!("import_share", deck_id = deck.id, "shared deck imported");
            Ok(Json(ApiResponse::success(deck)))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

// Backup endpoints
pub async fn export_backup(State(state): State<AppState>) -> Result<Response, ErrorResponse> {
    log_api_start!("export_backup");
    let context = ErrorContext::new("export_backup", "collection");
    let workspace = lock_workspace(&state, &context)?;
    let sink = CapturingSink::new();

    if let Err(e) = workspace.export_backup(&sink) {
        return Err(e.to_response_with_context(context));
    }

    match sink.take() {
        Some(ExportArtifact::Backup { file_name, bytes }) => {
            log_api_success!("export_backup", count = bytes.len(), "backup exported");
            Ok((
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", file_name),
                    ),
                ],
                bytes,
            )
                .into_response())
        }
        _ => Err(FlashcardError::Storage("backup was not produced".to_string())
            .to_response_with_context(context)),
    }
}

pub async fn import_backup(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<ImportBackupResponse> {
    log_api_start!("import_backup");
    let context = ErrorContext::new("import_backup", "collection");
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.import_backup(&body) {
        Ok(deck_count) => {
            log_api_success!("import_backup", count = deck_count, "backup imported");
            Ok(Json(ApiResponse::success(ImportBackupResponse { deck_count })))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn reset_decks(State(state): State<AppState>) -> ApiResult<Vec<Deck>> {
    log_api_start!("reset_decks");
    let context = ErrorContext::new("reset_decks", "collection");
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.reset_to_defaults() {
        Ok(()) => {
            let decks = workspace.store().decks().to_vec();
            log_api_success!("reset_decks", count = decks.len(), "collection reset");
            Ok(Json(ApiResponse::success(decks)))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

// Session endpoints
fn current_view(workspace: &Workspace, context: ErrorContext) -> Result<SessionView, ErrorResponse> {
    workspace.session().map(|s| s.view()).ok_or_else(|| {
        FlashcardError::InvalidState {
            operation: "view the session",
            state: "not running",
        }
        .to_response_with_context(context)
    })
}

pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> ApiResult<SessionView> {
    log_api_start!("start_session", deck_id = request.deck_id);
    let context = ErrorContext::new("start_session", "deck").with_id(&request.deck_id);
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.start_session(&request.deck_id) {
        Ok(session) => {
            let view = session.view();
            log_api_success!("start_session", deck_id = request.deck_id, "session started");
            Ok(Json(ApiResponse::success(view)))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

/// The running session, or `null` data when none is running
pub async fn get_session(State(state): State<AppState>) -> ApiResult<Option<SessionView>> {
    let context = ErrorContext::new("get_session", "session");
    let workspace = lock_workspace(&state, &context)?;
    Ok(Json(ApiResponse::success(workspace.session().map(|s| s.view()))))
}

pub async fn set_draft(
    State(state): State<AppState>,
    Json(request): Json<DraftRequest>,
) -> ApiResult<SessionView> {
    let context = ErrorContext::new("set_draft", "session");
    let mut workspace = lock_workspace(&state, &context)?;

    if let Err(e) = workspace.set_draft(&request.input) {
        return Err(e.to_response_with_context(context));
    }
    Ok(Json(ApiResponse::success(current_view(&workspace, context)?)))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<AnswerResponse> {
    log_api_start!("submit_answer");
    let context = ErrorContext::new("submit_answer", "session");
    let mut workspace = lock_workspace(&state, &context)?;

    let result = match request.input.as_deref() {
        Some(input) => workspace.submit_answer(input),
        None => workspace.submit_draft(),
    };
    match result {
        Ok(feedback) => {
            log_api_success!("submit_answer", "answer checked");
            let session = current_view(&workspace, context)?;
            Ok(Json(ApiResponse::success(AnswerResponse { feedback, session })))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn advance_session(State(state): State<AppState>) -> ApiResult<AdvanceResponse> {
    log_api_start!("advance_session");
    let context = ErrorContext::new("advance_session", "session");
    let mut workspace = lock_workspace(&state, &context)?;

    match workspace.advance() {
        Ok(advance) => {
            let finished = matches!(advance, Advance::Finished(_));
            if finished {
                log_api_success!("advance_session", "session finished");
            }
            let session = current_view(&workspace, context)?;
            Ok(Json(ApiResponse::success(AdvanceResponse { finished, session })))
        }
        Err(e) => Err(e.to_response_with_context(context)),
    }
}

pub async fn abandon_session(State(state): State<AppState>) -> ApiResult<bool> {
    let context = ErrorContext::new("abandon_session", "session");
    let mut workspace = lock_workspace(&state, &context)?;
    Ok(Json(ApiResponse::success(workspace.abandon_session())))
}

/// Drain pending user notifications
pub async fn get_notifications(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.notifications.drain()))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Deck routes
        .route("/api/decks", get(list_decks))
        .route("/api/decks", post(create_deck))
        .route("/api/decks/:id", get(get_deck))
        .route("/api/decks/:id", delete(delete_deck))
        .route("/api/decks/:id/cards", post(add_card))
        .route("/api/decks/:id/cards/:card_id", delete(delete_card))
        .route("/api/stats", get(get_stats))

        // Sharing routes
        .route("/api/decks/:id/share", get(share_deck))
        .route("/api/share/import", post(import_share))

        // Backup routes
        .route("/api/backup", get(export_backup))
        .route("/api/backup", post(import_backup))
        .route("/api/reset", post(reset_decks))

        // Session routes
        .route("/api/session/start", post(start_session))
        .route("/api/session", get(get_session))
        .route("/api/session", delete(abandon_session))
        .route("/api/session/input", post(set_draft))
        .route("/api/session/answer", post(submit_answer))
        .route("/api/session/advance", post(advance_session))

        .route("/api/notifications", get(get_notifications))
        .with_state(state)
}
