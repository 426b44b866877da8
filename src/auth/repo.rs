use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const USERNAME_UNIQUE: &str = "users_username_key";

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, username, password_hash, profile_picture, created_at";

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(username) = lower($1)"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create(db: &PgPool, username: &str, password_hash: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Change username and/or password hash; `None` keeps the stored value.
    pub async fn update_credentials(
        db: &PgPool,
        id: Uuid,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   password_hash = COALESCE($3, password_hash)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .fetch_optional(db)
        .await
    }

    /// Store a new picture key, returning the one it replaced.
    pub async fn replace_profile_picture(
        db: &PgPool,
        id: Uuid,
        key: &str,
    ) -> sqlx::Result<Option<Option<String>>> {
        sqlx::query_scalar::<_, Option<String>>(
            r#"
            UPDATE users u
               SET profile_picture = $2
              FROM (SELECT profile_picture FROM users WHERE id = $1 FOR UPDATE) old
             WHERE u.id = $1
            RETURNING old.profile_picture
            "#,
        )
        .bind(id)
        .bind(key)
        .fetch_optional(db)
        .await
    }

    /// Delete the user (intake and weight rows cascade). Returns the picture
    /// key so the object can be removed too.
    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Option<String>>> {
        sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM users WHERE id = $1 RETURNING profile_picture",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}
