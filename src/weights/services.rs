use serde_json::{Map, Value};
use sqlx::PgPool;
use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{validate_entry, WeightEntry};
use super::repo;
use crate::error::{is_unique_violation, AppError, AppResult};

fn not_found() -> AppError {
    AppError::NotFound("Weight entry not found".into())
}

fn date_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e, repo::USER_DATE_UNIQUE) {
        AppError::Conflict("A weight entry for this date already exists.".into())
    } else {
        e.into()
    }
}

/// Record a weight. Body fields are read raw so a malformed value is reported
/// as a format error instead of a deserialization failure.
pub async fn add_weight(
    db: &PgPool,
    today: Date,
    user_id: Uuid,
    body: &Map<String, Value>,
) -> AppResult<WeightEntry> {
    let draft = validate_entry(body.get("weight"), body.get("entry_date"), today).map_err(|e| {
        warn!(%user_id, field = e.field(), error = %e, "weight rejected");
        AppError::from(e)
    })?;

    let entry = repo::insert(db, user_id, &draft)
        .await
        .map_err(date_conflict)?;
    info!(%user_id, entry_id = %entry.id, date = %entry.entry_date, "weight recorded");
    Ok(entry)
}

/// Edit an entry; fields missing from the body keep their stored values.
pub async fn update_weight(
    db: &PgPool,
    today: Date,
    user_id: Uuid,
    id: Uuid,
    body: &Map<String, Value>,
) -> AppResult<WeightEntry> {
    let existing = repo::find_by_id(db, user_id, id)
        .await?
        .ok_or_else(not_found)?;

    let stored_weight = Value::String(existing.weight.to_string());
    let stored_date = Value::String(existing.entry_date.to_string());
    let draft = validate_entry(
        Some(body.get("weight").unwrap_or(&stored_weight)),
        Some(body.get("entry_date").unwrap_or(&stored_date)),
        today,
    )?;

    let entry = repo::update(db, user_id, id, &draft)
        .await
        .map_err(date_conflict)?
        .ok_or_else(not_found)?;
    info!(%user_id, entry_id = %entry.id, "weight updated");
    Ok(entry)
}

pub async fn get_weight(db: &PgPool, user_id: Uuid, id: Uuid) -> AppResult<WeightEntry> {
    repo::find_by_id(db, user_id, id)
        .await?
        .ok_or_else(not_found)
}

pub async fn delete_weight(db: &PgPool, user_id: Uuid, id: Uuid) -> AppResult<()> {
    if !repo::delete(db, user_id, id).await? {
        return Err(not_found());
    }
    info!(%user_id, entry_id = %id, "weight deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::tests::unique_violation;
    use crate::state::AppState;
    use serde_json::json;
    use time::macros::date;

    fn body(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn duplicate_day_is_a_conflict() {
        let err = date_conflict(unique_violation(repo::USER_DATE_UNIQUE));
        assert!(matches!(err, AppError::Conflict(_)));

        let err = date_conflict(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Internal(_)));
    }

    // Rejected before the lazy pool is touched.
    #[tokio::test]
    async fn invalid_weight_is_rejected_on_its_field() {
        let state = AppState::fake();
        let err = add_weight(
            &state.db,
            date!(2024 - 06 - 15),
            Uuid::new_v4(),
            &body(json!({ "weight": 600.0, "entry_date": "2023-02-30" })),
        )
        .await
        .unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert!(fields.get("entry_date").is_some());
                assert!(fields.get("weight").is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
