use crate::api::{SharedController, get_embedded_asset};
use crate::app::{UiEvent, ViewState};
use crate::db::SnippetStore;
use anyhow::{Context, anyhow};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub controller: SharedController,
    pub store: SnippetStore,
    pub model: Arc<str>,
    pub api_key_configured: bool,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/state", get(current_state))
        .route("/api/v1/generate", post(generate))
        .route("/api/v1/snippets", get(snippets))
        .fallback(get(static_assets))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct GeneratePayload {
    #[serde(default)]
    task: String,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    model: String,
    api_key_configured: bool,
    db_path: String,
    snippet_count: i64,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let store = state.store.clone();
    let snippet_count = tokio::task::spawn_blocking(move || store.count())
        .await
        .context("Status worker failed")??;

    Ok(Json(StatusPayload {
        model: state.model.to_string(),
        api_key_configured: state.api_key_configured,
        db_path: state.store.path().display().to_string(),
        snippet_count,
    }))
}

async fn current_state(State(state): State<ApiState>) -> ApiResult<Json<ViewState>> {
    let controller = Arc::clone(&state.controller);

    let view = tokio::task::spawn_blocking(move || {
        controller
            .lock()
            .map(|controller| controller.state().clone())
            .map_err(|_| anyhow!("UI controller lock poisoned"))
    })
    .await
    .context("UI state worker failed")??;

    Ok(Json(view))
}

async fn generate(
    State(state): State<ApiState>,
    Json(payload): Json<GeneratePayload>,
) -> ApiResult<Json<ViewState>> {
    run_event(&state, UiEvent::generate(payload.task)).await.map(Json)
}

async fn snippets(State(state): State<ApiState>) -> ApiResult<Json<ViewState>> {
    run_event(&state, UiEvent::ViewHistory).await.map(Json)
}

// Generation and SQLite calls block, so events run on the blocking pool
// while holding the controller lock.
async fn run_event(state: &ApiState, event: UiEvent) -> ApiResult<ViewState> {
    let controller = Arc::clone(&state.controller);

    let view = tokio::task::spawn_blocking(move || {
        let mut controller = controller
            .lock()
            .map_err(|_| anyhow!("UI controller lock poisoned"))?;
        controller.dispatch(event).cloned()
    })
    .await
    .context("UI event worker failed")??;

    Ok(view)
}

async fn static_assets(uri: Uri) -> ApiResult<Response> {
    match get_embedded_asset(uri.path()) {
        Some((bytes, mime)) => {
            let mut response = Response::new(bytes.into_response().into_body());
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_str(&mime)?);
            Ok(response)
        }
        None => Err(ApiError::NotFound("Static asset not found".to_string())),
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{error:#}") })),
            )
                .into_response(),
        }
    }
}
