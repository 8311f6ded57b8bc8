//! CRUD API over the scenario registry, mounted at `/_uni/scenarios`

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use unimock_core::{Error, Scenario};

/// The scenario CRUD router, to be nested under `/_uni/scenarios`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{uuid}", get(get_one).put(replace).delete(remove))
        .fallback(crate::tech::unknown)
}

async fn create(
    State(state): State<AppState>,
    Json(scenario): Json<Scenario>,
) -> Result<(StatusCode, Json<Scenario>), ApiError> {
    let stored = state.scenarios.insert(scenario).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list(State(state): State<AppState>) -> Json<Vec<Scenario>> {
    Json(state.scenarios.list().await)
}

async fn get_one(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<Scenario>, ApiError> {
    state
        .scenarios
        .get(&uuid)
        .await
        .map(Json)
        .ok_or_else(|| ApiError(Error::not_found(format!("scenario {uuid}"))))
}

async fn replace(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(scenario): Json<Scenario>,
) -> Result<Json<Scenario>, ApiError> {
    let stored = state.scenarios.replace(&uuid, scenario).await?;
    Ok(Json(stored))
}

async fn remove(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.scenarios.remove(&uuid).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError(Error::not_found(format!("scenario {uuid}"))))
    }
}
