use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub city_id: Option<i32>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub hourly_rate: Option<i32>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provider joined with its user, city and professions, as shown in search
/// results and profile pages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProviderCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub city_id: Option<i32>,
    pub city: Option<String>,
    pub professions: Vec<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub hourly_rate: Option<i32>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProviderData {
    pub city_id: Option<i32>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub hourly_rate: Option<i32>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderSearch {
    pub profession_id: Option<i32>,
    pub city_id: Option<i32>,
    pub limit: i64,
    pub offset: i64,
}

const CARD_SELECT: &str = r#"
    SELECT
        p.id,
        p.user_id,
        u.full_name,
        u.phone,
        p.city_id,
        c.raw_name AS city,
        COALESCE(
            ARRAY_AGG(pr.raw_name ORDER BY pr.raw_name) FILTER (WHERE pr.id IS NOT NULL),
            ARRAY[]::TEXT[]
        ) AS professions,
        p.bio,
        p.experience_years,
        p.hourly_rate,
        p.is_available,
        p.created_at
    FROM providers p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN cities c ON c.id = p.city_id
    LEFT JOIN provider_professions pp ON pp.provider_id = p.id
    LEFT JOIN professions pr ON pr.id = pp.profession_id
"#;

const CARD_GROUP_BY: &str = "GROUP BY p.id, u.id, c.id";

impl Provider {
    /// Creates an empty profile for a user
    pub async fn create<'e, E>(executor: E, user_id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let provider = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO providers (user_id)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(provider)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let provider = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM providers WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(provider)
    }

    pub async fn find_by_user_id<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let provider = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM providers WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(provider)
    }

    /// Updates profile fields, leaving `None` values untouched
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateProviderData,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let provider = sqlx::query_as::<_, Self>(
            r#"
            UPDATE providers
            SET
                city_id = COALESCE($2, city_id),
                bio = COALESCE($3, bio),
                experience_years = COALESCE($4, experience_years),
                hourly_rate = COALESCE($5, hourly_rate),
                is_available = COALESCE($6, is_available),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.city_id)
        .bind(&data.bio)
        .bind(data.experience_years)
        .bind(data.hourly_rate)
        .bind(data.is_available)
        .fetch_one(executor)
        .await?;

        Ok(provider)
    }
}

impl ProviderCard {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("{} WHERE p.id = $1 {}", CARD_SELECT, CARD_GROUP_BY);

        sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("{} WHERE p.user_id = $1 {}", CARD_SELECT, CARD_GROUP_BY);

        sqlx::query_as::<_, Self>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Available providers first, then newest
    pub async fn search(pool: &PgPool, filter: &ProviderSearch) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            {select}
            WHERE ($1::INT IS NULL OR EXISTS (
                    SELECT 1 FROM provider_professions f
                    WHERE f.provider_id = p.id AND f.profession_id = $1
                ))
              AND ($2::INT IS NULL OR p.city_id = $2)
            {group_by}
            ORDER BY p.is_available DESC, p.created_at DESC, p.id ASC
            LIMIT $3 OFFSET $4
            "#,
            select = CARD_SELECT,
            group_by = CARD_GROUP_BY
        );

        sqlx::query_as::<_, Self>(&sql)
            .bind(filter.profession_id)
            .bind(filter.city_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_search(pool: &PgPool, filter: &ProviderSearch) -> Result<i64, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM providers p
            WHERE ($1::INT IS NULL OR EXISTS (
                    SELECT 1 FROM provider_professions f
                    WHERE f.provider_id = p.id AND f.profession_id = $1
                ))
              AND ($2::INT IS NULL OR p.city_id = $2)
            "#,
        )
        .bind(filter.profession_id)
        .bind(filter.city_id)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    /// Providers bookmarked by a user, most recent bookmark first
    pub async fn list_bookmarked(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            {select}
            JOIN bookmarks b ON b.provider_id = p.id
            WHERE b.user_id = $1
            {group_by}, b.created_at
            ORDER BY b.created_at DESC
            "#,
            select = CARD_SELECT,
            group_by = CARD_GROUP_BY
        );

        sqlx::query_as::<_, Self>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
