use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::model::{Food, FoodDraft};
use crate::filters::{
    EntityFilter, FieldKind, FieldSpec, FilterOp, ListQuery, OrderSpec, ParamSpec,
};
use crate::error::AppResult;

/// Unique index on `lower(name)`.
pub const NAME_UNIQUE_INDEX: &str = "foods_name_lower_key";

const FOOD_COLUMNS: &str = r#"
    id, name, quantity, calories, carbohydrates, protein, fat,
    serving_size, fat_saturated, sodium, potassium, cholesterol, fiber, sugar,
    created_at
"#;

pub const FOOD_FILTER: EntityFilter = EntityFilter {
    fields: &[
        FieldSpec {
            name: "name",
            column: "name",
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "calories",
            column: "calories",
            kind: FieldKind::Number,
        },
        FieldSpec {
            name: "carbohydrates",
            column: "carbohydrates",
            kind: FieldKind::Number,
        },
        FieldSpec {
            name: "protein",
            column: "protein",
            kind: FieldKind::Number,
        },
        FieldSpec {
            name: "fat",
            column: "fat",
            kind: FieldKind::Number,
        },
    ],
    params: &[
        ParamSpec { param: "name", field: "name", op: FilterOp::Contains },
        ParamSpec { param: "calories", field: "calories", op: FilterOp::Eq },
        ParamSpec { param: "calories_min", field: "calories", op: FilterOp::Gte },
        ParamSpec { param: "calories_max", field: "calories", op: FilterOp::Lte },
        ParamSpec { param: "protein_min", field: "protein", op: FilterOp::Gte },
        ParamSpec { param: "protein_max", field: "protein", op: FilterOp::Lte },
        ParamSpec { param: "fat_min", field: "fat", op: FilterOp::Gte },
        ParamSpec { param: "fat_max", field: "fat", op: FilterOp::Lte },
        ParamSpec { param: "carbs_min", field: "carbohydrates", op: FilterOp::Gte },
        ParamSpec { param: "carbs_max", field: "carbohydrates", op: FilterOp::Lte },
    ],
    orderings: &[
        OrderSpec { name: "name", column: "name" },
        OrderSpec { name: "calories", column: "calories" },
        OrderSpec { name: "carbohydrates", column: "carbohydrates" },
        OrderSpec { name: "protein", column: "protein" },
        OrderSpec { name: "fat", column: "fat" },
    ],
    default_order: "name ASC",
};

/// Whether a food other than `exclude` already uses `name`, ignoring case.
pub async fn name_taken<'e, E: PgExecutor<'e>>(
    exec: E,
    name: &str,
    exclude: Option<Uuid>,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM foods
             WHERE lower(name) = lower($1)
               AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(exec)
    .await
}

pub async fn insert<'e, E: PgExecutor<'e>>(exec: E, draft: &FoodDraft) -> sqlx::Result<Food> {
    sqlx::query_as::<_, Food>(&format!(
        r#"
        INSERT INTO foods (name, quantity, calories, carbohydrates, protein, fat,
                           serving_size, fat_saturated, sodium, potassium, cholesterol, fiber, sugar)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {FOOD_COLUMNS}
        "#
    ))
    .bind(&draft.name)
    .bind(draft.quantity)
    .bind(draft.calories)
    .bind(draft.carbohydrates)
    .bind(draft.protein)
    .bind(draft.fat)
    .bind(draft.serving_size)
    .bind(draft.fat_saturated)
    .bind(draft.sodium)
    .bind(draft.potassium)
    .bind(draft.cholesterol)
    .bind(draft.fiber)
    .bind(draft.sugar)
    .fetch_one(exec)
    .await
}

pub async fn update<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
    draft: &FoodDraft,
) -> sqlx::Result<Option<Food>> {
    sqlx::query_as::<_, Food>(&format!(
        r#"
        UPDATE foods
           SET name = $2, quantity = $3, calories = $4, carbohydrates = $5, protein = $6,
               fat = $7, serving_size = $8, fat_saturated = $9, sodium = $10,
               potassium = $11, cholesterol = $12, fiber = $13, sugar = $14
         WHERE id = $1
        RETURNING {FOOD_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&draft.name)
    .bind(draft.quantity)
    .bind(draft.calories)
    .bind(draft.carbohydrates)
    .bind(draft.protein)
    .bind(draft.fat)
    .bind(draft.serving_size)
    .bind(draft.fat_saturated)
    .bind(draft.sodium)
    .bind(draft.potassium)
    .bind(draft.cholesterol)
    .bind(draft.fiber)
    .bind(draft.sugar)
    .fetch_optional(exec)
    .await
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(exec: E, id: Uuid) -> sqlx::Result<Option<Food>> {
    sqlx::query_as::<_, Food>(&format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id = $1"))
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Read a food and hold a share lock on it until the surrounding transaction
/// ends, so an intake snapshot and its row commit together.
pub async fn find_for_share<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
) -> sqlx::Result<Option<Food>> {
    sqlx::query_as::<_, Food>(&format!(
        "SELECT {FOOD_COLUMNS} FROM foods WHERE id = $1 FOR SHARE"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await
}

/// Deletes the food; dependent intake rows go with it via `ON DELETE CASCADE`.
pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query("DELETE FROM foods WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn list(db: &PgPool, query: &ListQuery) -> AppResult<Vec<Food>> {
    let filters = FOOD_FILTER.resolve(query)?;
    let order = FOOD_FILTER.order_by(query.ordering.as_deref())?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {FOOD_COLUMNS} FROM foods WHERE TRUE"));
    filters.push_conditions(&mut qb);
    qb.push(" ORDER BY ").push(order).push(", id");
    query.page.push(&mut qb);

    let rows = qb.build_query_as::<Food>().fetch_all(db).await?;
    Ok(rows)
}
