//! Dashboard JWT verification
//!
//! Dashboard logins carry a `jwt`-scheme Authorization header. Tokens are
//! HS256-signed with the configured secret; the `sub` claim is the user id
//! and the `aud` claim must match the configured audience when one is set.

use std::fmt;

use chrono::{TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT verification error. The message of the underlying library error is
/// preserved for diagnostics; callers always classify these as Unauthorized.
#[derive(Debug)]
pub enum JwtError {
    Expired,
    InvalidSignature,
    InvalidAudience,
    Invalid(String),
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "jwt expired"),
            Self::InvalidSignature => write!(f, "invalid jwt signature"),
            Self::InvalidAudience => write!(f, "jwt audience is not valid"),
            Self::Invalid(msg) => write!(f, "invalid jwt: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// Claims carried by a dashboard access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl AccessClaims {
    pub fn new(user_id: &str, audience: Option<&str>, ttl: TimeDelta) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            aud: audience.map(str::to_string),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Sign an access token. Used by the dashboard login flow and tests.
pub fn sign_access_token(claims: &AccessClaims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::Invalid(e.to_string()))
}

/// Verify signature, expiry and (when configured) audience, and decode the
/// claims.
pub fn verify_access_token(
    token: &str,
    secret: &str,
    audience: Option<&str>,
) -> Result<AccessClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }

    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::InvalidAudience => JwtError::InvalidAudience,
        _ => JwtError::Invalid(e.to_string()),
    })
}
