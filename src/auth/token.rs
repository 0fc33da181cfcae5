//! Compact HMAC-signed tokens (`header.claims.signature`).
//!
//! Access and refresh tokens are signed with different secrets, so a leaked
//! refresh secret cannot mint access tokens and the reverse. Verification
//! reports a specific [`AuthError`] kind for logging; callers collapse it
//! before anything reaches a client.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::{fmt, str::FromStr, time::Duration};
use tracing::error;

use super::{
    config::{Algorithm, AuthConfig},
    error::AuthError,
};

const TOKEN_TYP: &str = "JWT";
const JTI_BYTES: usize = 16;
const MIN_JTI_HEX_LENGTH: usize = JTI_BYTES * 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "access" => Ok(Self::Access),
            "refresh" => Ok(Self::Refresh),
            other => Err(format!("unknown token type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Decoded claim set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Principal identifier.
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
    /// Random hex identifier, used as the revocation key.
    pub jti: String,
}

impl Claims {
    /// Seconds until expiry relative to `now`, zero once expired.
    #[must_use]
    pub fn remaining_seconds(&self, now_unix_seconds: i64) -> u64 {
        let remaining = self.exp.saturating_sub(now_unix_seconds);
        u64::try_from(remaining).unwrap_or(0)
    }
}

pub struct TokenCodec {
    algorithm: Algorithm,
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    /// Build a codec from validated settings.
    ///
    /// # Errors
    /// Returns `AuthError::Misconfigured` if the settings fail validation.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self {
            algorithm: config.algorithm(),
            access_secret: config.access_secret().clone(),
            refresh_secret: config.refresh_secret().clone(),
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        })
    }

    /// Default lifetime for a token type.
    #[must_use]
    pub fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a token that expires after `ttl`, or the type default.
    ///
    /// # Errors
    /// Returns `AuthError::Misconfigured` for an empty subject or a TTL below one
    /// second, and `AuthError::SigningFailure` if signing fails.
    pub fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        ttl: Option<Duration>,
    ) -> Result<String, AuthError> {
        self.issue_at(subject, token_type, ttl, Utc::now().timestamp())
    }

    /// Same as [`TokenCodec::issue`] with an explicit issue time.
    ///
    /// # Errors
    /// See [`TokenCodec::issue`].
    pub fn issue_at(
        &self,
        subject: &str,
        token_type: TokenType,
        ttl: Option<Duration>,
        now_unix_seconds: i64,
    ) -> Result<String, AuthError> {
        self.build_token(subject, token_type, ttl, now_unix_seconds)
            .inspect_err(|err| error!("Failed to issue {token_type} token: {err}"))
    }

    fn build_token(
        &self,
        subject: &str,
        token_type: TokenType,
        ttl: Option<Duration>,
        now_unix_seconds: i64,
    ) -> Result<String, AuthError> {
        if subject.is_empty() {
            return Err(AuthError::Misconfigured(
                "token subject must not be empty".to_string(),
            ));
        }

        let ttl = ttl.unwrap_or_else(|| self.ttl(token_type));
        let ttl_seconds = i64::try_from(ttl.as_secs())
            .ok()
            .filter(|seconds| *seconds > 0)
            .ok_or_else(|| {
                AuthError::Misconfigured("token ttl must be at least one second".to_string())
            })?;
        let exp = now_unix_seconds
            .checked_add(ttl_seconds)
            .ok_or_else(|| AuthError::Misconfigured("token ttl overflows".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            token_type,
            iat: now_unix_seconds,
            exp,
            jti: generate_jti()?,
        };

        self.sign_claims(&claims)
    }

    /// Decode and verify a token against the secret for `expected`.
    ///
    /// # Errors
    /// Returns `TokenMalformed`, `TokenSignatureInvalid`, `TokenWrongType` or
    /// `TokenExpired` (the latter only when `check_expiry` is set).
    pub fn verify(
        &self,
        token: &str,
        expected: TokenType,
        check_expiry: bool,
    ) -> Result<Claims, AuthError> {
        self.verify_at(token, expected, check_expiry, Utc::now().timestamp())
    }

    /// Same as [`TokenCodec::verify`] with an explicit clock.
    ///
    /// # Errors
    /// See [`TokenCodec::verify`].
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenType,
        check_expiry: bool,
        now_unix_seconds: i64,
    ) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(AuthError::TokenMalformed)?;
        let claims_b64 = parts.next().ok_or(AuthError::TokenMalformed)?;
        let sig_b64 = parts.next().ok_or(AuthError::TokenMalformed)?;
        if parts.next().is_some() {
            return Err(AuthError::TokenMalformed);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != self.algorithm.as_str() || header.typ != TOKEN_TYP {
            return Err(AuthError::TokenMalformed);
        }

        let signature =
            Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| AuthError::TokenMalformed)?;
        let signing_input = format!("{header_b64}.{claims_b64}");
        if !signature_matches(
            self.algorithm,
            self.secret(expected).expose_secret().as_bytes(),
            signing_input.as_bytes(),
            &signature,
        ) {
            return Err(AuthError::TokenSignatureInvalid);
        }

        let claims: Claims = b64d_json(claims_b64)?;
        if claims.sub.is_empty() || claims.exp <= claims.iat || !valid_jti(&claims.jti) {
            return Err(AuthError::TokenMalformed);
        }
        if claims.token_type != expected {
            return Err(AuthError::TokenWrongType);
        }
        if check_expiry && now_unix_seconds >= claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    pub(crate) fn sign_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        let header = TokenHeader {
            alg: self.algorithm.as_str().to_string(),
            typ: TOKEN_TYP.to_string(),
        };
        let header_b64 = b64e_json(&header)?;
        let claims_b64 = b64e_json(claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let signature = sign(
            self.algorithm,
            self.secret(claims.token_type).expose_secret().as_bytes(),
            signing_input.as_bytes(),
        )?;
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    fn secret(&self, token_type: TokenType) -> &SecretString {
        match token_type {
            TokenType::Access => &self.access_secret,
            TokenType::Refresh => &self.refresh_secret,
        }
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value)
        .map_err(|err| AuthError::SigningFailure(format!("claims encoding failed: {err}")))?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, AuthError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| AuthError::TokenMalformed)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::TokenMalformed)
}

fn generate_jti() -> Result<String, AuthError> {
    let mut bytes = [0u8; JTI_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| AuthError::SigningFailure(format!("failed to generate jti: {err}")))?;
    Ok(hex::encode(bytes))
}

fn valid_jti(jti: &str) -> bool {
    jti.len() >= MIN_JTI_HEX_LENGTH && jti.bytes().all(|b| b.is_ascii_hexdigit())
}

fn sign(algorithm: Algorithm, key: &[u8], input: &[u8]) -> Result<Vec<u8>, AuthError> {
    let invalid_key = |_| AuthError::SigningFailure("invalid signing key".to_string());
    let signature = match algorithm {
        Algorithm::HS256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(invalid_key)?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::HS384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(key).map_err(invalid_key)?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::HS512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key).map_err(invalid_key)?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(signature)
}

// `verify_slice` compares in constant time.
fn signature_matches(algorithm: Algorithm, key: &[u8], input: &[u8], signature: &[u8]) -> bool {
    match algorithm {
        Algorithm::HS256 => Hmac::<Sha256>::new_from_slice(key).is_ok_and(|mut mac| {
            mac.update(input);
            mac.verify_slice(signature).is_ok()
        }),
        Algorithm::HS384 => Hmac::<Sha384>::new_from_slice(key).is_ok_and(|mut mac| {
            mac.update(input);
            mac.verify_slice(signature).is_ok()
        }),
        Algorithm::HS512 => Hmac::<Sha512>::new_from_slice(key).is_ok_and(|mut mac| {
            mac.update(input);
            mac.verify_slice(signature).is_ok()
        }),
    }
}
