use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use ring::digest::{digest, SHA256};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::models::user::UserRole;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token is invalid: {0}")]
    Invalid(String),

    #[error("Unexpected token type")]
    WrongType,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub typ: String,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token together with its expiry timestamp.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: SignedToken,
    pub refresh: SignedToken,
}

/// Signs and verifies the access/refresh JWT pair.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_access_secret.expose_secret().as_bytes(),
            config.jwt_refresh_secret.expose_secret().as_bytes(),
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.refresh_token_ttl_days),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_pair(&self, user_id: Uuid, role: UserRole) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.sign(user_id, role, TOKEN_TYPE_ACCESS)?,
            refresh: self.sign(user_id, role, TOKEN_TYPE_REFRESH)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TOKEN_TYPE_ACCESS)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TOKEN_TYPE_REFRESH)
    }

    fn sign(&self, user_id: Uuid, role: UserRole, typ: &str) -> Result<SignedToken, TokenError> {
        let (key, ttl) = match typ {
            TOKEN_TYPE_ACCESS => (&self.access_encoding, self.access_ttl),
            _ => (&self.refresh_encoding, self.refresh_ttl),
        };

        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = Claims {
            sub: user_id,
            role,
            typ: typ.to_string(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SignedToken { token, expires_at })
    }

    fn verify(&self, token: &str, typ: &str) -> Result<Claims, TokenError> {
        let key = match typ {
            TOKEN_TYPE_ACCESS => &self.access_decoding,
            _ => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, key, &validation)?;
        if data.claims.typ != typ {
            return Err(TokenError::WrongType);
        }

        Ok(data.claims)
    }
}

/// SHA-256 hex digest of a refresh token; only this is stored.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(digest(&SHA256, token.as_bytes()))
}
