use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::instrument;
use uuid::Uuid;

use super::dto::WeightResponse;
use super::{repo, services};
use crate::{auth::jwt::AuthUser, error::AppResult, filters::ListQuery, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/weights", get(list_weights).post(create_weight))
        .route(
            "/weights/:id",
            get(get_weight).put(update_weight).delete(delete_weight),
        )
}

#[instrument(skip(state))]
pub async fn list_weights(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<WeightResponse>>> {
    let query = ListQuery::from_params(params)?;
    let rows = repo::list(&state.db, user_id, &query).await?;
    Ok(Json(rows.into_iter().map(WeightResponse::from).collect()))
}

/// POST /weights { "weight": 72.4, "entry_date": "2024-06-01" }
#[instrument(skip(state, body))]
pub async fn create_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Map<String, Value>>,
) -> AppResult<(StatusCode, Json<WeightResponse>)> {
    let entry = services::add_weight(&state.db, state.clock.today(), user_id, &body).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

#[instrument(skip(state))]
pub async fn get_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WeightResponse>> {
    let entry = services::get_weight(&state.db, user_id, id).await?;
    Ok(Json(entry.into()))
}

#[instrument(skip(state, body))]
pub async fn update_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<Map<String, Value>>,
) -> AppResult<Json<WeightResponse>> {
    let entry =
        services::update_weight(&state.db, state.clock.today(), user_id, id, &body).await?;
    Ok(Json(entry.into()))
}

#[instrument(skip(state))]
pub async fn delete_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_weight(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
