use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, instrument};

use super::dto::DashboardResponse;
use crate::{
    auth::jwt::AuthUser, error::AppResult, intake::repo as intake_repo, state::AppState,
    weights::repo as weights_repo,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

/// Today's intake totals and the latest recorded weight.
#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<DashboardResponse>> {
    let today = state.clock.today();
    let (totals, last) = tokio::try_join!(
        intake_repo::totals_for_day(&state.db, user_id, today),
        weights_repo::latest(&state.db, user_id),
    )?;
    debug!(%user_id, calories = %totals.calories, has_weight = last.is_some(), "dashboard built");
    Ok(Json(DashboardResponse::new(today, totals, last)))
}
