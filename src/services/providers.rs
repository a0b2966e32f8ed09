use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    city::City,
    profession::Profession,
    provider::{Provider, ProviderCard, ProviderSearch, UpdateProviderData},
    user::{User, UserRole},
};
use crate::services::catalog;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
const MAX_BIO_LEN: usize = 2000;

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub profession: Option<String>,
    pub city: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub items: Vec<ProviderCard>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub hourly_rate: Option<i32>,
    pub is_available: Option<bool>,
    pub city: Option<String>,
}

/// Clamps page/limit into range and returns `(page, limit, offset)`.
pub fn paginate(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    // Huge pages saturate to an offset past every row
    (page, limit, (page - 1).saturating_mul(limit))
}

/// Drops blank query values so `?city=` behaves like no filter.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub fn validate_profile(input: &ProfileInput) -> Result<(), AppError> {
    if matches!(input.experience_years, Some(years) if years < 0) {
        return Err(AppError::Validation(
            "Experience years cannot be negative".to_string(),
        ));
    }
    if matches!(input.hourly_rate, Some(rate) if rate < 0) {
        return Err(AppError::Validation(
            "Hourly rate cannot be negative".to_string(),
        ));
    }
    if let Some(bio) = &input.bio {
        if bio.chars().count() > MAX_BIO_LEN {
            return Err(AppError::Validation(format!(
                "Bio must be at most {} characters",
                MAX_BIO_LEN
            )));
        }
    }
    Ok(())
}

pub async fn search(pool: &PgPool, params: &SearchParams) -> Result<SearchPage, AppError> {
    let (page, limit, offset) = paginate(params.page, params.limit);
    let empty = || SearchPage {
        items: Vec::new(),
        page,
        limit,
        total: 0,
    };

    // An unknown profession or city can match nothing
    let profession_id = match non_blank(params.profession.as_deref()) {
        Some(input) => match catalog::find_existing::<Profession>(pool, input).await? {
            Some(profession) => Some(profession.id),
            None => return Ok(empty()),
        },
        None => None,
    };

    let city_id = match non_blank(params.city.as_deref()) {
        Some(input) => match catalog::find_existing::<City>(pool, input).await? {
            Some(city) => Some(city.id),
            None => return Ok(empty()),
        },
        None => None,
    };

    let filter = ProviderSearch {
        profession_id,
        city_id,
        limit,
        offset,
    };

    let total = ProviderCard::count_search(pool, &filter).await?;
    let items = if offset < total {
        ProviderCard::search(pool, &filter).await?
    } else {
        Vec::new()
    };

    tracing::debug!(?profession_id, ?city_id, total, page, "Provider search");

    Ok(SearchPage {
        items,
        page,
        limit,
        total,
    })
}

pub async fn get_card(pool: &PgPool, provider_id: Uuid) -> Result<ProviderCard, AppError> {
    ProviderCard::find_by_id(pool, provider_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Provider not found".to_string()))
}

pub async fn get_own_card(pool: &PgPool, user_id: Uuid) -> Result<ProviderCard, AppError> {
    ProviderCard::find_by_user_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Provider profile not found".to_string()))
}

/// Creates or updates the caller's provider profile. Creating one promotes
/// the user to the provider role.
#[tracing::instrument(skip(pool, input))]
pub async fn upsert_profile(
    pool: &PgPool,
    user_id: Uuid,
    input: ProfileInput,
) -> Result<ProviderCard, AppError> {
    validate_profile(&input)?;

    // Resolve the city before opening the profile transaction
    let city_id = match non_blank(input.city.as_deref()) {
        Some(city) => Some(catalog::find_or_create::<City>(pool, city).await?.entry.id),
        None => None,
    };

    let mut tx = pool.begin().await?;

    let provider = match Provider::find_by_user_id(&mut *tx, user_id).await? {
        Some(existing) => existing,
        None => {
            let created = Provider::create(&mut *tx, user_id).await?;
            User::set_role(&mut *tx, user_id, UserRole::Provider).await?;
            tracing::info!(provider_id = %created.id, "Provider profile created");
            created
        }
    };

    let bio = input.bio.map(|b| b.trim().to_string());
    Provider::update(
        &mut *tx,
        provider.id,
        &UpdateProviderData {
            city_id,
            bio,
            experience_years: input.experience_years,
            hourly_rate: input.hourly_rate,
            is_available: input.is_available,
        },
    )
    .await?;

    tx.commit().await?;

    get_card(pool, provider.id).await
}

/// Returns the caller's provider row, or 403 when they have no profile.
pub async fn require_provider(pool: &PgPool, user_id: Uuid) -> Result<Provider, AppError> {
    Provider::find_by_user_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Only providers can manage professions".to_string()))
}

/// Finds or creates a profession and links it to the caller's profile.
pub async fn link_profession(
    pool: &PgPool,
    user_id: Uuid,
    profession: &str,
) -> Result<Profession, AppError> {
    let provider = require_provider(pool, user_id).await?;
    let resolved = catalog::find_or_create::<Profession>(pool, profession).await?;

    let linked = Profession::link_to_provider(pool, provider.id, resolved.entry.id).await?;
    tracing::info!(
        provider_id = %provider.id,
        profession_id = resolved.entry.id,
        linked,
        "Profession link requested"
    );

    Ok(resolved.entry)
}

pub async fn unlink_profession(
    pool: &PgPool,
    user_id: Uuid,
    profession_id: i32,
) -> Result<(), AppError> {
    let provider = require_provider(pool, user_id).await?;

    if !Profession::unlink_from_provider(pool, provider.id, profession_id).await? {
        return Err(AppError::NotFound(
            "Profession is not linked to your profile".to_string(),
        ));
    }

    tracing::info!(provider_id = %provider.id, profession_id, "Profession unlinked");
    Ok(())
}

pub async fn list_own_professions(pool: &PgPool, user_id: Uuid) -> Result<Vec<Profession>, AppError> {
    let provider = require_provider(pool, user_id).await?;
    Ok(Profession::list_for_provider(pool, provider.id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_defaults() {
        assert_eq!(paginate(None, None), (1, 20, 0));
    }

    #[test]
    fn test_paginate_clamps() {
        assert_eq!(paginate(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(paginate(Some(3), Some(500)), (3, 100, 200));
        assert_eq!(paginate(Some(-4), Some(10)), (1, 10, 0));
    }

    #[test]
    fn test_paginate_huge_page_saturates() {
        assert_eq!(
            paginate(Some(i64::MAX), Some(100)),
            (i64::MAX, 100, i64::MAX)
        );
        assert_eq!(
            paginate(Some(i64::MAX / 50), Some(100)),
            (i64::MAX / 50, 100, i64::MAX)
        );
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  lagos ")), Some("lagos"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_validate_profile() {
        assert!(validate_profile(&ProfileInput::default()).is_ok());
        assert!(validate_profile(&ProfileInput {
            experience_years: Some(-1),
            ..Default::default()
        })
        .is_err());
        assert!(validate_profile(&ProfileInput {
            hourly_rate: Some(-10),
            ..Default::default()
        })
        .is_err());
        assert!(validate_profile(&ProfileInput {
            bio: Some("x".repeat(2001)),
            ..Default::default()
        })
        .is_err());
    }
}
