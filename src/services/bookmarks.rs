use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    bookmark::Bookmark,
    provider::{Provider, ProviderCard},
};

/// Bookmarks a provider. Returns the bookmark and whether it was new.
pub async fn add(
    pool: &PgPool,
    user_id: Uuid,
    provider_id: Uuid,
) -> Result<(Bookmark, bool), AppError> {
    let provider = Provider::find_by_id(pool, provider_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Provider not found".to_string()))?;

    if provider.user_id == user_id {
        return Err(AppError::Validation(
            "You cannot bookmark your own profile".to_string(),
        ));
    }

    if let Some(bookmark) = Bookmark::create(pool, user_id, provider_id).await? {
        tracing::info!(%user_id, %provider_id, "Bookmark added");
        return Ok((bookmark, true));
    }

    let existing = Bookmark::find(pool, user_id, provider_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok((existing, false))
}

pub async fn remove(pool: &PgPool, user_id: Uuid, provider_id: Uuid) -> Result<(), AppError> {
    if !Bookmark::delete(pool, user_id, provider_id).await? {
        return Err(AppError::NotFound("Bookmark not found".to_string()));
    }

    tracing::info!(%user_id, %provider_id, "Bookmark removed");
    Ok(())
}

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<ProviderCard>, AppError> {
    Ok(ProviderCard::list_bookmarked(pool, user_id).await?)
}
