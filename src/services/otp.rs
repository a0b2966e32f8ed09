//! In-memory one-time password store.
//!
//! Entries are keyed by `email:purpose`, expire after a fixed lifetime and
//! allow a bounded number of wrong guesses. Nothing is persisted, so pending
//! codes are lost on restart.

use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

const OTP_DIGITS: u32 = 6;
const OTP_SPACE: u32 = 10u32.pow(OTP_DIGITS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpPurpose {
    PasswordReset,
    EmailVerification,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::PasswordReset => "password_reset",
            OtpPurpose::EmailVerification => "email_verification",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum OtpError {
    #[error("No pending code for this email. Request a new one.")]
    NotFound,

    #[error("The code has expired. Request a new one.")]
    Expired,

    #[error("Too many incorrect attempts. Request a new code.")]
    TooManyAttempts,

    #[error("Incorrect code, {remaining} attempt(s) remaining")]
    Invalid { remaining: u32 },

    #[error("Failed to generate code")]
    Generation,
}

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

#[derive(Clone)]
pub struct OtpStore {
    entries: Arc<Mutex<HashMap<String, OtpEntry>>>,
    rng: SystemRandom,
    ttl: Duration,
    max_attempts: u32,
}

impl OtpStore {
    pub fn new(ttl: Duration, max_attempts: u32) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            rng: SystemRandom::new(),
            ttl,
            max_attempts,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a fresh code, replacing any pending one for the same key.
    pub fn generate(&self, email: &str, purpose: OtpPurpose) -> Result<String, OtpError> {
        self.generate_at(email, purpose, Utc::now())
    }

    pub fn generate_at(
        &self,
        email: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<String, OtpError> {
        let code = self.random_code()?;

        self.lock().insert(
            key(email, purpose),
            OtpEntry {
                code: code.clone(),
                expires_at: now + self.ttl,
                attempts: 0,
            },
        );

        Ok(code)
    }

    /// Checks a submitted code. A successful match consumes the entry.
    pub fn validate(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<(), OtpError> {
        self.validate_at(email, purpose, code, Utc::now())
    }

    pub fn validate_at(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        let key = key(email, purpose);
        let mut entries = self.lock();

        let entry = entries.get_mut(&key).ok_or(OtpError::NotFound)?;

        if entry.expires_at <= now {
            entries.remove(&key);
            return Err(OtpError::Expired);
        }

        if entry.attempts >= self.max_attempts {
            entries.remove(&key);
            return Err(OtpError::TooManyAttempts);
        }

        if entry.code != code.trim() {
            entry.attempts += 1;
            let remaining = self.max_attempts - entry.attempts;
            if remaining == 0 {
                entries.remove(&key);
                return Err(OtpError::TooManyAttempts);
            }
            return Err(OtpError::Invalid { remaining });
        }

        entries.remove(&key);
        Ok(())
    }

    /// Drops a pending code without checking it.
    pub fn invalidate(&self, email: &str, purpose: OtpPurpose) {
        self.lock().remove(&key(email, purpose));
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OtpEntry>> {
        // A panic while holding the lock cannot leave an entry half-written
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn random_code(&self) -> Result<String, OtpError> {
        // Rejection sampling keeps the distribution uniform over 000000..=999999
        let limit = u32::MAX - (u32::MAX % OTP_SPACE);
        loop {
            let mut buf = [0u8; 4];
            self.rng.fill(&mut buf).map_err(|_| OtpError::Generation)?;
            let value = u32::from_be_bytes(buf);
            if value < limit {
                return Ok(format!(
                    "{:0width$}",
                    value % OTP_SPACE,
                    width = OTP_DIGITS as usize
                ));
            }
        }
    }
}

fn key(email: &str, purpose: OtpPurpose) -> String {
    format!("{}:{}", email.trim().to_lowercase(), purpose)
}
