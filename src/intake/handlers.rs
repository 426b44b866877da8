use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateIntakeRequest, IntakeResponse, UpdateIntakeRequest};
use super::{repo, services};
use crate::{auth::jwt::AuthUser, error::AppResult, filters::ListQuery, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/intakes", get(list_intakes).post(create_intake))
        .route(
            "/intakes/:id",
            get(get_intake).put(update_intake).delete(delete_intake),
        )
}

/// GET /intakes?date_min=2024-01-01&filter=food_name:oat
#[instrument(skip(state))]
pub async fn list_intakes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<IntakeResponse>>> {
    let query = ListQuery::from_params(params)?;
    let rows = repo::list(&state.db, user_id, &query, state.clock.today()).await?;
    Ok(Json(rows.into_iter().map(IntakeResponse::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn create_intake(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateIntakeRequest>,
) -> AppResult<(StatusCode, Json<IntakeResponse>)> {
    let intake = services::add_intake(&state.db, state.clock.today(), user_id, body).await?;
    Ok((StatusCode::CREATED, Json(intake.into())))
}

#[instrument(skip(state))]
pub async fn get_intake(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<IntakeResponse>> {
    let intake = services::get_intake(&state.db, user_id, id).await?;
    Ok(Json(intake.into()))
}

#[instrument(skip(state, body))]
pub async fn update_intake(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateIntakeRequest>,
) -> AppResult<Json<IntakeResponse>> {
    let intake =
        services::update_intake(&state.db, state.clock.today(), user_id, id, body).await?;
    Ok(Json(intake.into()))
}

#[instrument(skip(state))]
pub async fn delete_intake(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_intake(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
