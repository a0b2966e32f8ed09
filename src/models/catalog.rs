//! Shared queries for the name catalogs (professions and cities).
//!
//! Both tables have the same shape: a serial id, a canonical `name` carrying
//! the unique constraint, and a display `raw_name`.

use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgConnection, PgPool};

pub trait CatalogEntry: for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin {
    /// Table name, never user input
    const TABLE: &'static str;
    /// Human-readable kind used in error messages
    const LABEL: &'static str;
}

/// Lookup keys for a catalog entry; any one matching is enough.
#[derive(Debug, Clone, Default)]
pub struct CatalogLookup {
    pub canonical: Option<String>,
    pub raw: Option<String>,
    pub id: Option<i32>,
    /// Digits only; such input refers to an id and never names a new entry
    pub numeric: bool,
}

pub async fn find_matching<T: CatalogEntry>(
    conn: &mut PgConnection,
    lookup: &CatalogLookup,
) -> Result<Option<T>, sqlx::Error> {
    // An id match wins over a name match
    let sql = format!(
        r#"
        SELECT * FROM {table}
        WHERE name = $1 OR LOWER(raw_name) = LOWER($2) OR id = $3
        ORDER BY (id = $3) IS TRUE DESC, id ASC
        LIMIT 1
        "#,
        table = T::TABLE
    );

    sqlx::query_as::<_, T>(&sql)
        .bind(&lookup.canonical)
        .bind(&lookup.raw)
        .bind(lookup.id)
        .fetch_optional(conn)
        .await
}

/// Inserts unless the canonical name already exists; `None` on conflict.
pub async fn insert_if_absent<T: CatalogEntry>(
    conn: &mut PgConnection,
    canonical: &str,
    display: &str,
) -> Result<Option<T>, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO {table} (name, raw_name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO NOTHING
        RETURNING *
        "#,
        table = T::TABLE
    );

    sqlx::query_as::<_, T>(&sql)
        .bind(canonical)
        .bind(display)
        .fetch_optional(conn)
        .await
}

pub async fn find_by_id<T: CatalogEntry>(pool: &PgPool, id: i32) -> Result<Option<T>, sqlx::Error> {
    let sql = format!("SELECT * FROM {} WHERE id = $1", T::TABLE);

    sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_name<T: CatalogEntry>(
    pool: &PgPool,
    canonical: &str,
) -> Result<Option<T>, sqlx::Error> {
    let sql = format!("SELECT * FROM {} WHERE name = $1", T::TABLE);

    sqlx::query_as::<_, T>(&sql)
        .bind(canonical)
        .fetch_optional(pool)
        .await
}

/// Lists entries alphabetically, optionally filtered by a substring of the
/// canonical name.
pub async fn list<T: CatalogEntry>(
    pool: &PgPool,
    contains: Option<&str>,
    limit: i64,
) -> Result<Vec<T>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT * FROM {table}
        WHERE $1::text IS NULL OR name LIKE '%' || $1 || '%'
        ORDER BY name ASC
        LIMIT $2
        "#,
        table = T::TABLE
    );

    sqlx::query_as::<_, T>(&sql)
        .bind(contains.map(escape_like))
        .bind(limit)
        .fetch_all(pool)
        .await
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
