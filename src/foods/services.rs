use std::collections::HashSet;

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::UpdateFoodRequest;
use super::model::{Food, FoodDraft, NAME_TAKEN};
use super::repo;
use crate::error::{is_unique_violation, AppError, AppResult, FieldErrors};
use crate::lookup::NutritionLookup;
use crate::nutrition::Nutrients;

fn name_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e, repo::NAME_UNIQUE_INDEX) {
        FieldErrors::single("name", NAME_TAKEN).into()
    } else {
        e.into()
    }
}

/// Nutrients for an optional gram amount asked for on a food's detail view.
pub fn nutrition_at(food: &Food, quantity: Option<Decimal>) -> AppResult<Option<Nutrients>> {
    let Some(quantity) = quantity else {
        return Ok(None);
    };
    if quantity.is_sign_negative() && !quantity.is_zero() {
        return Err(FieldErrors::single(
            "quantity",
            "Ensure this value is greater than or equal to 0.0.",
        )
        .into());
    }
    match food.nutrition_for_quantity(quantity) {
        Some(n) => Ok(Some(n)),
        None => {
            warn!(food_id = %food.id, %quantity, "quantity too large to scale");
            Err(FieldErrors::single("quantity", "Ensure this value is a smaller amount.").into())
        }
    }
}

pub async fn create_food(db: &PgPool, mut draft: FoodDraft) -> AppResult<Food> {
    draft.normalize();
    let taken = repo::name_taken(db, &draft.name, None).await?;
    let errors = draft.check(taken);
    if !errors.is_empty() {
        warn!(name = %draft.name, %errors, "food rejected");
        return Err(errors.into());
    }

    let food = repo::insert(db, &draft).await.map_err(name_conflict)?;
    info!(food_id = %food.id, name = %food.name, "food created");
    Ok(food)
}

pub async fn update_food(db: &PgPool, id: Uuid, patch: UpdateFoodRequest) -> AppResult<Food> {
    let existing = repo::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Food item not found".into()))?;

    let mut draft = FoodDraft::from(&existing);
    patch.apply(&mut draft);
    draft.normalize();
    let taken = repo::name_taken(db, &draft.name, Some(id)).await?;
    draft.check(taken).into_result()?;

    let food = repo::update(db, id, &draft)
        .await
        .map_err(name_conflict)?
        .ok_or_else(|| AppError::NotFound("Food item not found".into()))?;
    info!(food_id = %food.id, name = %food.name, "food updated");
    Ok(food)
}

pub async fn delete_food(db: &PgPool, id: Uuid) -> AppResult<()> {
    if !repo::delete(db, id).await? {
        return Err(AppError::NotFound("Food item not found".into()));
    }
    info!(food_id = %id, "food deleted");
    Ok(())
}

/// Foods written by [`import_from_lookup`], plus names skipped because a food
/// with that name already existed.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub created: Vec<Food>,
    pub skipped: Vec<String>,
}

/// Create foods from the external nutrition service. A lookup failure aborts
/// before anything is written; the matching items are inserted in one
/// transaction.
pub async fn import_from_lookup(
    db: &PgPool,
    lookup: &dyn NutritionLookup,
    query: &str,
) -> AppResult<ImportOutcome> {
    let query = query.trim();
    if query.is_empty() {
        return Err(FieldErrors::single("name", "This field may not be blank.").into());
    }

    let items = lookup.search(query).await.map_err(|e| {
        warn!(error = %e, query, "nutrition lookup failed");
        AppError::Upstream("Failed to fetch nutrition data".into())
    })?;
    if items.is_empty() {
        return Err(AppError::NotFound(format!(
            "No nutrition data found for '{query}'"
        )));
    }

    let mut outcome = ImportOutcome::default();
    let mut seen = HashSet::new();
    let mut tx = db.begin().await.context("begin tx")?;
    for item in items {
        let mut draft = FoodDraft::from(item);
        draft.normalize();

        let key = draft.name.to_lowercase();
        if seen.contains(&key) || repo::name_taken(&mut *tx, &draft.name, None).await? {
            outcome.skipped.push(draft.name);
            continue;
        }
        draft.check(false).into_result()?;

        let food = repo::insert(&mut *tx, &draft).await.map_err(name_conflict)?;
        seen.insert(key);
        outcome.created.push(food);
    }
    tx.commit().await.context("commit tx")?;

    info!(
        query,
        created = outcome.created.len(),
        skipped = outcome.skipped.len(),
        "foods imported from lookup"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::tests::unique_violation;
    use crate::lookup::{LookupError, NutritionItem};
    use crate::state::AppState;
    use async_trait::async_trait;

    struct FailingLookup;

    #[async_trait]
    impl NutritionLookup for FailingLookup {
        async fn search(&self, _query: &str) -> Result<Vec<NutritionItem>, LookupError> {
            Err(LookupError::EmptyQuery)
        }
    }

    struct EmptyLookup;

    #[async_trait]
    impl NutritionLookup for EmptyLookup {
        async fn search(&self, _query: &str) -> Result<Vec<NutritionItem>, LookupError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn racing_duplicate_name_is_a_name_error() {
        match name_conflict(unique_violation(repo::NAME_UNIQUE_INDEX)) {
            AppError::Validation(fields) => {
                assert_eq!(fields.get("name").unwrap()[0], NAME_TAKEN);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn detail_quantity_is_scaled_or_rejected() {
        use crate::foods::model::tests::apple;
        use rust_decimal_macros::dec;

        let apple = apple();
        assert_eq!(nutrition_at(&apple, None).unwrap(), None);
        let half = nutrition_at(&apple, Some(dec!(50))).unwrap().unwrap();
        assert_eq!(half.calories, dec!(26.0));

        let negative = nutrition_at(&apple, Some(dec!(-1))).unwrap_err();
        assert!(matches!(negative, AppError::Validation(f) if f.get("quantity").is_some()));

        let tiny = Food {
            quantity: dec!(0.1),
            ..apple
        };
        let huge: Decimal = "1000000000000000000000000000".parse().unwrap();
        let err = nutrition_at(&tiny, Some(huge)).unwrap_err();
        assert!(matches!(err, AppError::Validation(f) if f.get("quantity").is_some()));
    }

    // The lazy pool never connects: both paths return before touching it.
    #[tokio::test]
    async fn lookup_failure_aborts_import() {
        let state = AppState::fake();
        let err = import_from_lookup(&state.db, &FailingLookup, "apple")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn no_match_is_not_found() {
        let state = AppState::fake();
        let err = import_from_lookup(&state.db, &EmptyLookup, "xyzzy")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn blank_query_is_a_validation_error() {
        let state = AppState::fake();
        let err = import_from_lookup(&state.db, &EmptyLookup, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
