use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use time::Date;
use uuid::Uuid;

use super::model::{DailyIntake, IntakeDraft, Snapshot};
use crate::error::AppResult;
use crate::filters::{EntityFilter, FieldKind, FieldSpec, FilterOp, ListQuery, OrderSpec, ParamSpec};

const INTAKE_SELECT: &str = r#"
    SELECT i.id, i.user_id, i.food_id, f.name AS food_name, i.food_quantity, i.entry_date,
           i.calories, i.carbohydrates, i.protein, i.fat, i.created_at
      FROM daily_intakes i
      JOIN foods f ON f.id = i.food_id
"#;

pub const INTAKE_FILTER: EntityFilter = EntityFilter {
    fields: &[
        FieldSpec {
            name: "date",
            column: "i.entry_date",
            kind: FieldKind::Date,
        },
        FieldSpec {
            name: "calories",
            column: "f.calories",
            kind: FieldKind::Number,
        },
        FieldSpec {
            name: "food_name",
            column: "f.name",
            kind: FieldKind::Text,
        },
    ],
    params: &[
        ParamSpec { param: "date_min", field: "date", op: FilterOp::Gte },
        ParamSpec { param: "date_max", field: "date", op: FilterOp::Lte },
        ParamSpec { param: "calories_min", field: "calories", op: FilterOp::Gte },
        ParamSpec { param: "calories_max", field: "calories", op: FilterOp::Lte },
        ParamSpec { param: "food_name", field: "food_name", op: FilterOp::Contains },
    ],
    orderings: &[
        OrderSpec { name: "date", column: "i.entry_date" },
        OrderSpec { name: "calories", column: "i.calories" },
        OrderSpec { name: "food_name", column: "f.name" },
        OrderSpec { name: "food_quantity", column: "i.food_quantity" },
    ],
    default_order: "i.entry_date DESC, i.created_at DESC",
};

pub async fn insert<'e, E: PgExecutor<'e>>(
    exec: E,
    user_id: Uuid,
    draft: &IntakeDraft,
    snap: &Snapshot,
) -> sqlx::Result<DailyIntake> {
    sqlx::query_as::<_, DailyIntake>(
        r#"
        WITH i AS (
            INSERT INTO daily_intakes (user_id, food_id, food_quantity, entry_date,
                                       calories, carbohydrates, protein, fat)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
        )
        SELECT i.id, i.user_id, i.food_id, f.name AS food_name, i.food_quantity, i.entry_date,
               i.calories, i.carbohydrates, i.protein, i.fat, i.created_at
          FROM i
          JOIN foods f ON f.id = i.food_id
        "#,
    )
    .bind(user_id)
    .bind(draft.food_id)
    .bind(draft.food_quantity)
    .bind(draft.entry_date)
    .bind(snap.calories)
    .bind(snap.carbohydrates)
    .bind(snap.protein)
    .bind(snap.fat)
    .fetch_one(exec)
    .await
}

pub async fn update<'e, E: PgExecutor<'e>>(
    exec: E,
    user_id: Uuid,
    id: Uuid,
    draft: &IntakeDraft,
    snap: &Snapshot,
) -> sqlx::Result<Option<DailyIntake>> {
    sqlx::query_as::<_, DailyIntake>(
        r#"
        WITH i AS (
            UPDATE daily_intakes
               SET food_id = $3, food_quantity = $4, entry_date = $5,
                   calories = $6, carbohydrates = $7, protein = $8, fat = $9
             WHERE id = $1 AND user_id = $2
            RETURNING *
        )
        SELECT i.id, i.user_id, i.food_id, f.name AS food_name, i.food_quantity, i.entry_date,
               i.calories, i.carbohydrates, i.protein, i.fat, i.created_at
          FROM i
          JOIN foods f ON f.id = i.food_id
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(draft.food_id)
    .bind(draft.food_quantity)
    .bind(draft.entry_date)
    .bind(snap.calories)
    .bind(snap.carbohydrates)
    .bind(snap.protein)
    .bind(snap.fat)
    .fetch_optional(exec)
    .await
}

/// The caller's row, locked until the surrounding transaction ends.
pub async fn find_for_update<'e, E: PgExecutor<'e>>(
    exec: E,
    user_id: Uuid,
    id: Uuid,
) -> sqlx::Result<Option<DailyIntake>> {
    sqlx::query_as::<_, DailyIntake>(&format!(
        "{INTAKE_SELECT} WHERE i.id = $1 AND i.user_id = $2 FOR UPDATE OF i"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(exec)
    .await
}

pub async fn find_by_id(db: &PgPool, user_id: Uuid, id: Uuid) -> sqlx::Result<Option<DailyIntake>> {
    sqlx::query_as::<_, DailyIntake>(&format!(
        "{INTAKE_SELECT} WHERE i.id = $1 AND i.user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query("DELETE FROM daily_intakes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// The caller's entries. Without any date condition only `today` is listed.
pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    query: &ListQuery,
    today: Date,
) -> AppResult<Vec<DailyIntake>> {
    let filters = INTAKE_FILTER.resolve(query)?;
    let order = INTAKE_FILTER.order_by(query.ordering.as_deref())?;

    let mut qb = QueryBuilder::<Postgres>::new(INTAKE_SELECT);
    qb.push(" WHERE i.user_id = ").push_bind(user_id);
    if !filters.constrains("date") {
        qb.push(" AND i.entry_date = ").push_bind(today);
    }
    filters.push_conditions(&mut qb);
    qb.push(" ORDER BY ").push(order).push(", i.id");
    query.page.push(&mut qb);

    let rows = qb.build_query_as::<DailyIntake>().fetch_all(db).await?;
    Ok(rows)
}

/// Summed snapshot nutrients of the caller's entries on `day`.
pub async fn totals_for_day(db: &PgPool, user_id: Uuid, day: Date) -> sqlx::Result<Snapshot> {
    let (calories, carbohydrates, protein, fat) =
        sqlx::query_as::<_, (Decimal, Decimal, Decimal, Decimal)>(
        r#"
        SELECT COALESCE(SUM(calories), 0)::NUMERIC(14, 1),
               COALESCE(SUM(carbohydrates), 0)::NUMERIC(14, 1),
               COALESCE(SUM(protein), 0)::NUMERIC(14, 1),
               COALESCE(SUM(fat), 0)::NUMERIC(14, 1)
          FROM daily_intakes
         WHERE user_id = $1 AND entry_date = $2
        "#,
    )
    .bind(user_id)
    .bind(day)
    .fetch_one(db)
    .await?;
    Ok(Snapshot {
        calories,
        carbohydrates,
        protein,
        fat,
    })
}
