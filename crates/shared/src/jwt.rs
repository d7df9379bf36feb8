//! Signing and checking bearer tokens.
//!
//! Access and refresh tokens share one HS256 secret. The `kind` claim keeps
//! a refresh token from being accepted as an access token and vice versa.

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{Claims, TokenKind, TokenPair};
use crate::config::JwtSettings;

/// Longest lifetime a token may be issued with: ten years.
pub const MAX_TTL_SECS: i64 = 10 * 365 * 86_400;

fn ttl_secs(secs: u64) -> i64 {
    i64::try_from(secs).map_or(MAX_TTL_SECS, |secs| secs.min(MAX_TTL_SECS))
}

/// Token lifetimes and signing secret.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 secret.
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
}

impl From<&JwtSettings> for JwtConfig {
    fn from(settings: &JwtSettings) -> Self {
        Self {
            secret: settings.secret.clone(),
            access_ttl_secs: ttl_secs(settings.access_token_expiry_secs),
            refresh_ttl_secs: ttl_secs(settings.refresh_token_expiry_secs),
        }
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Encoding(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Bad signature, malformed token or missing claims.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// A valid token presented where the other kind is required.
    #[error("expected an {expected} token")]
    WrongKind {
        /// Kind the caller asked for.
        expected: TokenKind,
    },
}

/// Issues and verifies tokens.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_ttl_secs", &self.config.access_ttl_secs)
            .field("refresh_ttl_secs", &self.config.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Signs a token of `kind` for a user.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Encoding` if signing fails.
    pub fn issue(&self, user_id: Uuid, role: &str, kind: TokenKind) -> Result<String, JwtError> {
        let ttl = match kind {
            TokenKind::Access => self.config.access_ttl_secs,
            TokenKind::Refresh => self.config.refresh_ttl_secs,
        };
        let ttl = Duration::seconds(ttl.clamp(-MAX_TTL_SECS, MAX_TTL_SECS));
        let claims = Claims::new(user_id, role, kind, ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Signs an access and a refresh token for a user.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Encoding` if signing fails.
    pub fn issue_pair(&self, user_id: Uuid, role: &str) -> Result<TokenPair, JwtError> {
        Ok(TokenPair::new(
            self.issue(user_id, role, TokenKind::Access)?,
            self.issue(user_id, role, TokenKind::Refresh)?,
            self.config.access_ttl_secs.clamp(-MAX_TTL_SECS, MAX_TTL_SECS),
        ))
    }

    /// Checks the signature, expiry and kind of a token.
    ///
    /// # Errors
    ///
    /// `Expired`, `Invalid`, or `WrongKind` when the token is of the other kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })?;

        if claims.kind == expected {
            Ok(claims)
        } else {
            Err(JwtError::WrongKind { expected })
        }
    }
}
