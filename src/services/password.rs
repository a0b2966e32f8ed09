use tokio::sync::OnceCell;

use crate::error::AppError;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Rejects passwords that are too short, too long, or lack a letter or digit.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LEN
        )));
    }
    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AppError::Validation(
            "Password must contain at least one letter and one digit".to_string(),
        ));
    }
    Ok(())
}

/// Hashes off the async runtime; bcrypt is deliberately slow.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(AppError::from)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(AppError::from)
}

static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Spends the same bcrypt work as a real check when no account matched, so
/// response timing does not reveal which identifiers are registered.
pub async fn verify_dummy_password(password: &str, cost: u32) -> Result<(), AppError> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash_password("unmatched-account-0", cost))
        .await?;
    verify_password(password, hash).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("onlyletters").is_err());
        assert!(validate_password("1234567890").is_err());
        assert!(validate_password(&"a1".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse 1", 4).await.unwrap();

        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse 1", &hash).await.unwrap());
        assert!(!verify_password("wrong horse 1", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_dummy_verification_runs_bcrypt() {
        verify_dummy_password("anything at all 1", 4).await.unwrap();

        let hash = DUMMY_HASH.get().expect("dummy hash initialized");
        assert!(hash.starts_with("$2"));
        assert!(!verify_password("anything at all 1", hash).await.unwrap());
    }
}
