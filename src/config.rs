use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Deserialize};

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // JWT
    pub jwt_access_secret: Secret<String>,
    pub jwt_refresh_secret: Secret<String>,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,

    // One-time passwords
    pub otp_ttl_minutes: i64,
    pub otp_max_attempts: u32,

    // Security
    pub bcrypt_cost: u32,
    pub cookie_secure: bool,
    pub cors_origin: Option<String>,

    // Outgoing mail (logged instead of sent when smtp_host is unset)
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Self::from_settings(&settings)
    }

    pub fn from_settings(config: &config::Config) -> Result<Self, config::ConfigError> {
        let smtp = match optional::<String>(config, "smtp_host")? {
            Some(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: or_default(config, "smtp_port", 587)?,
                username: optional(config, "smtp_username")?,
                password: optional::<String>(config, "smtp_password")?.map(Secret::new),
            }),
            _ => None,
        };

        let cfg = Self {
            database_url: config.get("database_url")?,
            host: or_default(config, "host", "127.0.0.1".to_string())?,
            port: or_default(config, "port", 3000)?,

            jwt_access_secret: Secret::new(config.get("jwt_access_secret")?),
            jwt_refresh_secret: Secret::new(config.get("jwt_refresh_secret")?),
            access_token_ttl_minutes: or_default(config, "access_token_ttl_minutes", 15)?,
            refresh_token_ttl_days: or_default(config, "refresh_token_ttl_days", 7)?,

            otp_ttl_minutes: or_default(config, "otp_ttl_minutes", 10)?,
            otp_max_attempts: or_default(config, "otp_max_attempts", 5)?,

            bcrypt_cost: or_default(config, "bcrypt_cost", 10)?,
            cookie_secure: or_default(config, "cookie_secure", true)?,
            cors_origin: optional::<String>(config, "cors_origin")?
                .filter(|s| !s.trim().is_empty()),

            smtp,
            mail_from: or_default(
                config,
                "mail_from",
                "ProFinder <no-reply@profinder.app>".to_string(),
            )?,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let access = self.jwt_access_secret.expose_secret();
        let refresh = self.jwt_refresh_secret.expose_secret();

        if access.len() < MIN_JWT_SECRET_LEN || refresh.len() < MIN_JWT_SECRET_LEN {
            return Err(config::ConfigError::Message(format!(
                "JWT secrets must be at least {} bytes",
                MIN_JWT_SECRET_LEN
            )));
        }
        if access == refresh {
            return Err(config::ConfigError::Message(
                "jwt_access_secret and jwt_refresh_secret must differ".to_string(),
            ));
        }
        if self.otp_max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "otp_max_attempts must be at least 1".to_string(),
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(config::ConfigError::Message(
                "bcrypt_cost must be between 4 and 31".to_string(),
            ));
        }
        if self.access_token_ttl_minutes <= 0
            || self.refresh_token_ttl_days <= 0
            || self.otp_ttl_minutes <= 0
        {
            return Err(config::ConfigError::Message(
                "token and OTP lifetimes must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Reads an optional key. Missing is `None`; a malformed value is an error.
fn optional<T: DeserializeOwned>(
    config: &config::Config,
    key: &str,
) -> Result<Option<T>, config::ConfigError> {
    match config.get::<T>(key) {
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn or_default<T: DeserializeOwned>(
    config: &config::Config,
    key: &str,
    default: T,
) -> Result<T, config::ConfigError> {
    Ok(optional(config, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = "access-secret-access-secret-access-secret";
    const REFRESH: &str = "refresh-secret-refresh-secret-refresh-secret";

    fn settings(overrides: &[(&str, &str)]) -> config::Config {
        let mut builder = config::Config::builder()
            .set_override("database_url", "postgres://localhost/profinder")
            .unwrap()
            .set_override("jwt_access_secret", ACCESS)
            .unwrap()
            .set_override("jwt_refresh_secret", REFRESH)
            .unwrap();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = Config::from_settings(&settings(&[])).unwrap();

        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.access_token_ttl_minutes, 15);
        assert_eq!(cfg.refresh_token_ttl_days, 7);
        assert_eq!(cfg.otp_ttl_minutes, 10);
        assert_eq!(cfg.otp_max_attempts, 5);
        assert!(cfg.cookie_secure);
        assert!(cfg.smtp.is_none());
        assert!(cfg.cors_origin.is_none());
    }

    #[test]
    fn test_smtp_section_built_from_host() {
        let cfg = Config::from_settings(&settings(&[
            ("smtp_host", "smtp.example.com"),
            ("smtp_port", "2525"),
            ("smtp_username", "mailer"),
        ]))
        .unwrap();

        let smtp = cfg.smtp.expect("smtp configured");
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.username.as_deref(), Some("mailer"));
        assert!(smtp.password.is_none());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = Config::from_settings(&settings(&[("jwt_access_secret", "short")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let result = Config::from_settings(&settings(&[("jwt_refresh_secret", ACCESS)]));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_database_url_rejected() {
        let settings = config::Config::builder()
            .set_override("jwt_access_secret", ACCESS)
            .unwrap()
            .set_override("jwt_refresh_secret", REFRESH)
            .unwrap()
            .build()
            .unwrap();

        assert!(Config::from_settings(&settings).is_err());
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(Config::from_settings(&settings(&[("port", "abc")])).is_err());
        assert!(Config::from_settings(&settings(&[("bcrypt_cost", "ten")])).is_err());
        assert!(Config::from_settings(&settings(&[("cookie_secure", "maybe")])).is_err());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let cfg = Config::from_settings(&settings(&[
            ("port", "8080"),
            ("bcrypt_cost", "12"),
            ("cookie_secure", "false"),
        ]))
        .unwrap();

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.bcrypt_cost, 12);
        assert!(!cfg.cookie_secure);
    }

    #[test]
    fn test_zero_otp_attempts_rejected() {
        let result = Config::from_settings(&settings(&[("otp_max_attempts", "0")]));
        assert!(result.is_err());
    }
}
