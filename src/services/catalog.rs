use sqlx::PgPool;

use crate::error::AppError;
use crate::models::catalog::{self, CatalogEntry, CatalogLookup};
use crate::services::normalize::{
    canonical_name, collapse_whitespace, display_name, is_numeric, parse_id,
};

/// Result of a find-or-create call.
#[derive(Debug)]
pub struct Resolved<T> {
    pub entry: T,
    pub created: bool,
}

/// Builds the lookup keys for free-text input, rejecting blank input.
pub fn lookup_for(input: &str, label: &str) -> Result<CatalogLookup, AppError> {
    let canonical = canonical_name(input)
        .ok_or_else(|| AppError::Validation(format!("{} name is required", label)))?;

    Ok(CatalogLookup {
        canonical: Some(canonical),
        raw: Some(collapse_whitespace(input)),
        id: parse_id(input),
        numeric: is_numeric(input),
    })
}

/// Finds a catalog entry by canonical name, display name or numeric id, and
/// creates it when absent. Runs in a single transaction.
#[tracing::instrument(skip(pool), fields(kind = T::LABEL))]
pub async fn find_or_create<T: CatalogEntry>(
    pool: &PgPool,
    input: &str,
) -> Result<Resolved<T>, AppError> {
    let lookup = lookup_for(input, T::LABEL)?;

    let mut tx = pool.begin().await?;

    if let Some(entry) = catalog::find_matching::<T>(&mut *tx, &lookup).await? {
        tx.commit().await?;
        return Ok(Resolved {
            entry,
            created: false,
        });
    }

    // A bare number that matched no id is a reference, not a new name
    if lookup.numeric {
        tx.rollback().await?;
        return Err(AppError::NotFound(format!(
            "{} {} not found",
            T::LABEL,
            input.trim()
        )));
    }

    let canonical = lookup.canonical.as_deref().unwrap_or_default();
    let raw_name = display_name(input).unwrap_or_else(|| canonical.to_string());

    let (entry, created) = match catalog::insert_if_absent::<T>(&mut *tx, canonical, &raw_name).await? {
        Some(entry) => (entry, true),
        None => {
            // Lost a race with a concurrent insert of the same name
            let entry = catalog::find_matching::<T>(&mut *tx, &lookup)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            (entry, false)
        }
    };

    tx.commit().await?;

    if created {
        tracing::info!(name = %raw_name, "Created catalog entry");
    }

    Ok(Resolved { entry, created })
}

/// Resolves an existing entry without creating one. Used for search filters.
pub async fn find_existing<T: CatalogEntry>(
    pool: &PgPool,
    input: &str,
) -> Result<Option<T>, AppError> {
    let lookup = lookup_for(input, T::LABEL)?;

    if let Some(id) = lookup.id {
        if let Some(entry) = catalog::find_by_id::<T>(pool, id).await? {
            return Ok(Some(entry));
        }
    }

    let canonical = lookup.canonical.as_deref().unwrap_or_default();
    Ok(catalog::find_by_name::<T>(pool, canonical).await?)
}

pub async fn list<T: CatalogEntry>(
    pool: &PgPool,
    query: Option<&str>,
    limit: i64,
) -> Result<Vec<T>, AppError> {
    let filter = query.and_then(canonical_name);
    Ok(catalog::list::<T>(pool, filter.as_deref(), limit).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_for_name() {
        let lookup = lookup_for("  House   Cleaning ", "Profession").unwrap();

        assert_eq!(lookup.canonical.as_deref(), Some("house cleaning"));
        assert_eq!(lookup.raw.as_deref(), Some("House Cleaning"));
        assert_eq!(lookup.id, None);
        assert!(!lookup.numeric);
    }

    #[test]
    fn test_lookup_for_numeric_input() {
        let lookup = lookup_for("17", "City").unwrap();

        assert_eq!(lookup.id, Some(17));
        assert!(lookup.numeric);
        assert_eq!(lookup.canonical.as_deref(), Some("17"));
    }

    #[test]
    fn test_lookup_for_zero_is_numeric_without_id() {
        let lookup = lookup_for("00", "City").unwrap();

        assert_eq!(lookup.id, None);
        assert!(lookup.numeric);
    }

    #[test]
    fn test_lookup_for_blank_input_rejected() {
        let err = lookup_for("   ", "City").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "City name is required"));
    }
}
