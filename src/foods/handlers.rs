use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::dto::{
    CreateFoodRequest, FoodDetails, FoodDetailsQuery, FoodSummary, ImportedFoodsResponse,
    LookupFoodRequest, NutritionQuery, UpdateFoodRequest,
};
use super::{repo, services};
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult, FieldErrors},
    filters::ListQuery,
    lookup::NutritionItem,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods))
        .route("/foods/:id", get(get_food))
        .route("/nutrition", get(search_nutrition))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", post(create_food))
        .route("/foods/lookup", post(import_foods))
        .route("/foods/:id", put(update_food).delete(delete_food))
}

#[instrument(skip(state))]
pub async fn list_foods(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<FoodSummary>>> {
    let query = ListQuery::from_params(params)?;
    let foods = repo::list(&state.db, &query).await?;
    Ok(Json(foods.iter().map(FoodSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<FoodDetailsQuery>,
) -> AppResult<Json<FoodDetails>> {
    let food = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Food item not found".into()))?;
    let per_quantity = services::nutrition_at(&food, q.quantity)?;
    Ok(Json(FoodDetails::new(&food, per_quantity)))
}

#[instrument(skip(state, body), fields(name = %body.name))]
pub async fn create_food(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(body): Json<CreateFoodRequest>,
) -> AppResult<(StatusCode, Json<FoodDetails>)> {
    let food = services::create_food(&state.db, body.into()).await?;
    Ok((StatusCode::CREATED, Json(FoodDetails::new(&food, None))))
}

#[instrument(skip(state, body))]
pub async fn update_food(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateFoodRequest>,
) -> AppResult<Json<FoodDetails>> {
    let food = services::update_food(&state.db, id, body).await?;
    Ok(Json(FoodDetails::new(&food, None)))
}

#[instrument(skip(state))]
pub async fn delete_food(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_food(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /foods/lookup { "name": "chicken breast" }
#[instrument(skip(state, body), fields(name = %body.name))]
pub async fn import_foods(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(body): Json<LookupFoodRequest>,
) -> AppResult<(StatusCode, Json<ImportedFoodsResponse>)> {
    let outcome =
        services::import_from_lookup(&state.db, state.nutrition.as_ref(), &body.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(ImportedFoodsResponse {
            foods: outcome.created.iter().map(FoodSummary::from).collect(),
            skipped: outcome.skipped,
        }),
    ))
}

/// GET /nutrition?food=banana. Proxies the external lookup without storing
/// anything; no match is an empty list.
#[instrument(skip(state))]
pub async fn search_nutrition(
    State(state): State<AppState>,
    Query(q): Query<NutritionQuery>,
) -> AppResult<Json<Vec<NutritionItem>>> {
    let Some(food) = q.food.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(FieldErrors::single("food", "Food query parameter is required.").into());
    };
    let items = state.nutrition.search(food).await.map_err(|e| {
        warn!(error = %e, food, "nutrition search failed");
        AppError::Upstream("Failed to fetch nutrition data".into())
    })?;
    Ok(Json(items))
}
