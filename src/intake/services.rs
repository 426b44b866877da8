use anyhow::Context;
use sqlx::PgPool;
use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{CreateIntakeRequest, UpdateIntakeRequest};
use super::model::{DailyIntake, IntakeDraft, Snapshot};
use super::repo;
use crate::error::{AppError, AppResult};
use crate::foods::repo as foods_repo;

fn food_not_found() -> AppError {
    AppError::NotFound("Food item not found".into())
}

fn intake_not_found() -> AppError {
    AppError::NotFound("Intake entry not found".into())
}

/// Log a portion of a food. The food is read under a share lock so the
/// snapshot and the row commit together.
pub async fn add_intake(
    db: &PgPool,
    today: Date,
    user_id: Uuid,
    req: CreateIntakeRequest,
) -> AppResult<DailyIntake> {
    let draft = IntakeDraft::parse(
        req.food_id,
        req.food_quantity,
        req.entry_date.as_deref(),
        today,
    )
    .map_err(|errors| {
        warn!(%user_id, %errors, "intake rejected");
        AppError::from(errors)
    })?;

    let mut tx = db.begin().await.context("begin tx")?;
    let food = foods_repo::find_for_share(&mut *tx, draft.food_id)
        .await?
        .ok_or_else(food_not_found)?;
    let snap = Snapshot::of(&food, draft.food_quantity)?;
    let intake = repo::insert(&mut *tx, user_id, &draft, &snap).await?;
    tx.commit().await.context("commit tx")?;

    info!(
        %user_id,
        intake_id = %intake.id,
        food_id = %food.id,
        calories = %intake.calories,
        "intake logged"
    );
    Ok(intake)
}

/// Edit an entry. The snapshot is recomputed from the food as it is now.
pub async fn update_intake(
    db: &PgPool,
    today: Date,
    user_id: Uuid,
    id: Uuid,
    patch: UpdateIntakeRequest,
) -> AppResult<DailyIntake> {
    let mut tx = db.begin().await.context("begin tx")?;
    let existing = repo::find_for_update(&mut *tx, user_id, id)
        .await?
        .ok_or_else(intake_not_found)?;

    let existing_date = existing.entry_date.to_string();
    let draft = IntakeDraft::parse(
        patch.food_id.unwrap_or(existing.food_id),
        Some(patch.food_quantity.unwrap_or(existing.food_quantity)),
        Some(patch.entry_date.as_deref().unwrap_or(&existing_date)),
        today,
    )?;

    let food = foods_repo::find_for_share(&mut *tx, draft.food_id)
        .await?
        .ok_or_else(food_not_found)?;
    let snap = Snapshot::of(&food, draft.food_quantity)?;
    let intake = repo::update(&mut *tx, user_id, id, &draft, &snap)
        .await?
        .ok_or_else(intake_not_found)?;
    tx.commit().await.context("commit tx")?;

    info!(%user_id, intake_id = %intake.id, "intake updated");
    Ok(intake)
}

pub async fn delete_intake(db: &PgPool, user_id: Uuid, id: Uuid) -> AppResult<()> {
    if !repo::delete(db, user_id, id).await? {
        return Err(intake_not_found());
    }
    info!(%user_id, intake_id = %id, "intake deleted");
    Ok(())
}

pub async fn get_intake(db: &PgPool, user_id: Uuid, id: Uuid) -> AppResult<DailyIntake> {
    repo::find_by_id(db, user_id, id)
        .await?
        .ok_or_else(intake_not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use rust_decimal_macros::dec;
    use time::macros::date;

    // Validation runs before the lazy pool is touched.
    #[tokio::test]
    async fn out_of_range_quantity_never_reaches_the_database() {
        let state = AppState::fake();
        for quantity in [dec!(0.5), dec!(1001)] {
            let err = add_intake(
                &state.db,
                date!(2024 - 05 - 10),
                Uuid::new_v4(),
                CreateIntakeRequest {
                    food_id: Uuid::new_v4(),
                    food_quantity: Some(quantity),
                    entry_date: None,
                },
            )
            .await
            .unwrap_err();
            match err {
                AppError::Validation(fields) => assert!(fields.get("food_quantity").is_some()),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
