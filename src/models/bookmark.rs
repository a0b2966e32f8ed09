use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Inserts a bookmark. Returns `None` when it already exists.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let bookmark = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO bookmarks (user_id, provider_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, provider_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(provider_id)
        .fetch_optional(pool)
        .await?;

        Ok(bookmark)
    }

    pub async fn find(
        pool: &PgPool,
        user_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let bookmark = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM bookmarks WHERE user_id = $1 AND provider_id = $2
            "#,
        )
        .bind(user_id)
        .bind(provider_id)
        .fetch_optional(pool)
        .await?;

        Ok(bookmark)
    }

    /// Returns false when there was no such bookmark
    pub async fn delete(pool: &PgPool, user_id: Uuid, provider_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM bookmarks WHERE user_id = $1 AND provider_id = $2
            "#,
        )
        .bind(user_id)
        .bind(provider_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
