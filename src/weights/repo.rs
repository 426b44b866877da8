use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::model::{WeightDraft, WeightEntry};
use crate::error::AppResult;
use crate::filters::{EntityFilter, FieldKind, FieldSpec, FilterOp, ListQuery, OrderSpec, ParamSpec};

/// One entry per user per calendar day.
pub const USER_DATE_UNIQUE: &str = "weight_entries_user_date_key";

const WEIGHT_COLUMNS: &str = "id, user_id, weight, entry_date, created_at";

pub const WEIGHT_FILTER: EntityFilter = EntityFilter {
    fields: &[
        FieldSpec {
            name: "date",
            column: "entry_date",
            kind: FieldKind::Date,
        },
        FieldSpec {
            name: "weight",
            column: "weight",
            kind: FieldKind::Number,
        },
    ],
    params: &[
        ParamSpec { param: "date_min", field: "date", op: FilterOp::Gte },
        ParamSpec { param: "date_max", field: "date", op: FilterOp::Lte },
        ParamSpec { param: "weight_min", field: "weight", op: FilterOp::Gte },
        ParamSpec { param: "weight_max", field: "weight", op: FilterOp::Lte },
    ],
    orderings: &[
        OrderSpec { name: "date", column: "entry_date" },
        OrderSpec { name: "weight", column: "weight" },
    ],
    default_order: "entry_date DESC",
};

pub async fn insert<'e, E: PgExecutor<'e>>(
    exec: E,
    user_id: Uuid,
    draft: &WeightDraft,
) -> sqlx::Result<WeightEntry> {
    sqlx::query_as::<_, WeightEntry>(&format!(
        r#"
        INSERT INTO weight_entries (user_id, weight, entry_date)
        VALUES ($1, $2, $3)
        RETURNING {WEIGHT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(draft.weight)
    .bind(draft.entry_date)
    .fetch_one(exec)
    .await
}

pub async fn update<'e, E: PgExecutor<'e>>(
    exec: E,
    user_id: Uuid,
    id: Uuid,
    draft: &WeightDraft,
) -> sqlx::Result<Option<WeightEntry>> {
    sqlx::query_as::<_, WeightEntry>(&format!(
        r#"
        UPDATE weight_entries
           SET weight = $3, entry_date = $4
         WHERE id = $1 AND user_id = $2
        RETURNING {WEIGHT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(draft.weight)
    .bind(draft.entry_date)
    .fetch_optional(exec)
    .await
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    exec: E,
    user_id: Uuid,
    id: Uuid,
) -> sqlx::Result<Option<WeightEntry>> {
    sqlx::query_as::<_, WeightEntry>(&format!(
        "SELECT {WEIGHT_COLUMNS} FROM weight_entries WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(exec)
    .await
}

/// Most recent entry by date.
pub async fn latest(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<WeightEntry>> {
    sqlx::query_as::<_, WeightEntry>(&format!(
        r#"
        SELECT {WEIGHT_COLUMNS} FROM weight_entries
         WHERE user_id = $1
         ORDER BY entry_date DESC
         LIMIT 1
        "#
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query("DELETE FROM weight_entries WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn list(db: &PgPool, user_id: Uuid, query: &ListQuery) -> AppResult<Vec<WeightEntry>> {
    let filters = WEIGHT_FILTER.resolve(query)?;
    let order = WEIGHT_FILTER.order_by(query.ordering.as_deref())?;

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {WEIGHT_COLUMNS} FROM weight_entries WHERE user_id = "
    ));
    qb.push_bind(user_id);
    filters.push_conditions(&mut qb);
    qb.push(" ORDER BY ").push(order).push(", id");
    query.page.push(&mut qb);

    let rows = qb.build_query_as::<WeightEntry>().fetch_all(db).await?;
    Ok(rows)
}
