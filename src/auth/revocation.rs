use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

/// Refresh tokens that were logged out before they expired.
#[async_trait]
pub trait TokenDenylist: Send + Sync {
    async fn revoke(&self, jti: Uuid, user_id: Uuid, expires_at: OffsetDateTime)
        -> anyhow::Result<()>;
    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool>;
}

pub struct PgDenylist {
    db: PgPool,
}

impl PgDenylist {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenDenylist for PgDenylist {
    async fn revoke(
        &self,
        jti: Uuid,
        user_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, user_id, expires_at)
            SELECT $1, $2, $3
             WHERE EXISTS (SELECT 1 FROM users WHERE id = $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        // Expired rows can never match a valid token again.
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < now()")
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.db)
        .await?;
        Ok(found)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryDenylist {
        revoked: Mutex<HashSet<Uuid>>,
    }

    #[async_trait]
    impl TokenDenylist for MemoryDenylist {
        async fn revoke(
            &self,
            jti: Uuid,
            _user_id: Uuid,
            _expires_at: OffsetDateTime,
        ) -> anyhow::Result<()> {
            self.revoked.lock().unwrap().insert(jti);
            Ok(())
        }

        async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
            Ok(self.revoked.lock().unwrap().contains(&jti))
        }
    }

    #[tokio::test]
    async fn memory_denylist_remembers_revoked_ids() {
        let list = MemoryDenylist::default();
        let jti = Uuid::new_v4();
        assert!(!list.is_revoked(jti).await.unwrap());
        list.revoke(jti, Uuid::new_v4(), OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert!(list.is_revoked(jti).await.unwrap());
        assert!(!list.is_revoked(Uuid::new_v4()).await.unwrap());
    }
}
