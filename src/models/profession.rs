use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::catalog::CatalogEntry;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profession {
    pub id: i32,
    pub name: String,     // canonical, lowercase
    pub raw_name: String, // display form
    pub created_at: DateTime<Utc>,
}

impl CatalogEntry for Profession {
    const TABLE: &'static str = "professions";
    const LABEL: &'static str = "Profession";
}

impl Profession {
    /// Links a profession to a provider. Returns false when already linked.
    pub async fn link_to_provider(
        pool: &PgPool,
        provider_id: Uuid,
        profession_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO provider_professions (provider_id, profession_id)
            VALUES ($1, $2)
            ON CONFLICT (provider_id, profession_id) DO NOTHING
            "#,
        )
        .bind(provider_id)
        .bind(profession_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Removes a link. Returns false when there was nothing to remove.
    pub async fn unlink_from_provider(
        pool: &PgPool,
        provider_id: Uuid,
        profession_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM provider_professions
            WHERE provider_id = $1 AND profession_id = $2
            "#,
        )
        .bind(provider_id)
        .bind(profession_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list_for_provider(
        pool: &PgPool,
        provider_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let professions = sqlx::query_as::<_, Self>(
            r#"
            SELECT p.*
            FROM professions p
            JOIN provider_professions pp ON pp.profession_id = p.id
            WHERE pp.provider_id = $1
            ORDER BY p.raw_name ASC
            "#,
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await?;

        Ok(professions)
    }
}
