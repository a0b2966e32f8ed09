use chrono::{Duration, Utc};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::models::refresh_token::RefreshToken;
use crate::services::otp::OtpStore;

/// Every minute, at second zero
pub const OTP_SWEEP_SCHEDULE: &str = "0 * * * * *";
/// Every hour, at minute zero
pub const TOKEN_PURGE_SCHEDULE: &str = "0 0 * * * *";

/// Revoked or expired refresh tokens are kept this long before deletion
const TOKEN_RETENTION_HOURS: i64 = 24;

/// Drops expired one-time passwords from the in-memory store
pub fn sweep_expired_otps(otp: &OtpStore) -> usize {
    let removed = otp.sweep();
    if removed > 0 {
        tracing::debug!(removed, "Expired OTP entries swept");
    }
    removed
}

/// Deletes refresh tokens that expired or were revoked over a day ago
pub async fn purge_stale_refresh_tokens(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - Duration::hours(TOKEN_RETENTION_HOURS);
    let deleted = RefreshToken::purge_stale(pool, cutoff).await?;

    tracing::info!(deleted, "Stale refresh tokens purged");
    Ok(deleted)
}

/// Registers the cleanup jobs and starts the scheduler
pub async fn start_scheduler(pool: PgPool, otp: OtpStore) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let otp_job = Job::new(OTP_SWEEP_SCHEDULE, move |_uuid, _lock| {
        sweep_expired_otps(&otp);
    })?;
    scheduler.add(otp_job).await?;

    let purge_job = Job::new_async(TOKEN_PURGE_SCHEDULE, move |_uuid, _lock| {
        let pool = pool.clone();
        Box::pin(async move {
            if let Err(e) = purge_stale_refresh_tokens(&pool).await {
                tracing::error!(error = %e, "Refresh token purge failed");
            }
        })
    })?;
    scheduler.add(purge_job).await?;

    scheduler.start().await?;
    tracing::info!("Cleanup jobs scheduled");

    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::otp::OtpPurpose;

    #[test]
    fn test_sweep_expired_otps() {
        let otp = OtpStore::new(Duration::minutes(10), 5);
        otp.generate_at(
            "old@example.com",
            OtpPurpose::PasswordReset,
            Utc::now() - Duration::minutes(30),
        )
        .unwrap();
        otp.generate("new@example.com", OtpPurpose::PasswordReset)
            .unwrap();

        assert_eq!(sweep_expired_otps(&otp), 1);
        assert_eq!(otp.len(), 1);
    }

    #[tokio::test]
    async fn test_schedules_parse() {
        for expr in [OTP_SWEEP_SCHEDULE, TOKEN_PURGE_SCHEDULE] {
            assert!(Job::new(expr, |_uuid, _lock| {}).is_ok(), "{}", expr);
        }
    }
}
