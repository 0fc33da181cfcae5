//! Bearer token to principal resolution.
//!
//! Flow Overview: verify the access token, refuse revoked identifiers, load the
//! subject from the user directory, then gate on the active flag. Every token
//! or lookup failure surfaces as `Unauthenticated`, including unknown subjects,
//! so callers cannot discover which identifiers exist. An inactive principal has
//! proven its identity and is reported as `Forbidden`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use super::{
    error::{AuthError, Rejection},
    revocation::RevocationStore,
    token::{Claims, TokenCodec, TokenType},
};

/// Application identity as owned by the user directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub active: bool,
}

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<String>, active: bool) -> Self {
        Self {
            id: id.into(),
            email: None,
            active,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Read-only lookup into the system that owns user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// # Errors
    /// Returns `AuthError::Backend` if the directory cannot be queried.
    async fn find_by_id(&self, subject: &str) -> Result<Option<Principal>, AuthError>;
}

/// In-memory directory for tests and single-binary setups.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    principals: RwLock<HashMap<String, Principal>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, principal: Principal) {
        self.principals
            .write()
            .await
            .insert(principal.id.clone(), principal);
    }

    pub async fn remove(&self, id: &str) -> Option<Principal> {
        self.principals.write().await.remove(id)
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_id(&self, subject: &str) -> Result<Option<Principal>, AuthError> {
        Ok(self.principals.read().await.get(subject).cloned())
    }
}

/// Terminal state of one resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Authenticated(Principal),
    Unauthenticated,
    Forbidden,
}

impl Resolution {
    /// # Errors
    /// Returns the matching `Rejection` for anything but `Authenticated`.
    pub fn into_result(self) -> Result<Principal, Rejection> {
        match self {
            Self::Authenticated(principal) => Ok(principal),
            Self::Unauthenticated => Err(Rejection::Unauthenticated),
            Self::Forbidden => Err(Rejection::Forbidden),
        }
    }
}

pub struct PrincipalResolver {
    codec: Arc<TokenCodec>,
    revocations: Arc<dyn RevocationStore>,
    directory: Arc<dyn UserDirectory>,
}

impl PrincipalResolver {
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<dyn RevocationStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            codec,
            revocations,
            directory,
        }
    }

    /// Resolve a bearer token in a single pass.
    ///
    /// # Errors
    /// Only operational failures (revocation store or directory unreachable)
    /// are returned as errors; they must be treated as a 5xx, never as success.
    #[instrument(skip_all)]
    pub async fn resolve(&self, bearer_token: &str) -> Result<Resolution, AuthError> {
        match self.authenticate(bearer_token).await {
            Ok(principal) => Ok(Resolution::Authenticated(principal)),
            Err(err) => match err.rejection() {
                Rejection::Unauthenticated => {
                    debug!("bearer token rejected: {err}");
                    Ok(Resolution::Unauthenticated)
                }
                Rejection::Forbidden => {
                    debug!("principal denied: {err}");
                    Ok(Resolution::Forbidden)
                }
                Rejection::Internal => {
                    error!("principal resolution failed: {err}");
                    Err(err)
                }
            },
        }
    }

    /// Resolve with the detailed failure kind; for logging and tests only.
    ///
    /// # Errors
    /// Returns the specific `AuthError` for the first failed check.
    pub async fn authenticate(&self, bearer_token: &str) -> Result<Principal, AuthError> {
        let claims = self.codec.verify(bearer_token, TokenType::Access, true)?;
        self.check_not_revoked(&claims).await?;
        self.load_active(&claims.sub).await
    }

    async fn check_not_revoked(&self, claims: &Claims) -> Result<(), AuthError> {
        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(AuthError::TokenRevoked);
        }
        Ok(())
    }

    pub(crate) async fn load_active(&self, subject: &str) -> Result<Principal, AuthError> {
        let principal = self
            .directory
            .find_by_id(subject)
            .await?
            .ok_or(AuthError::SubjectNotFound)?;
        if !principal.active {
            return Err(AuthError::PrincipalInactive);
        }
        Ok(principal)
    }
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{config::AuthConfig, revocation::MemoryRevocationStore};
    use secrecy::SecretString;
    use std::time::Duration;

    struct FailingDirectory;

    #[async_trait]
    impl UserDirectory for FailingDirectory {
        async fn find_by_id(&self, _subject: &str) -> Result<Option<Principal>, AuthError> {
            Err(AuthError::Backend("directory offline".to_string()))
        }
    }

    fn codec() -> Result<Arc<TokenCodec>, AuthError> {
        let config = AuthConfig::new(
            SecretString::from("access-secret-for-tests-0123456789abcdef"),
            SecretString::from("refresh-secret-for-tests-0123456789abcdef"),
        );
        Ok(Arc::new(TokenCodec::new(&config)?))
    }

    type Fixture = (PrincipalResolver, Arc<TokenCodec>, Arc<MemoryRevocationStore>);

    async fn resolver() -> Result<Fixture, AuthError> {
        let codec = codec()?;
        let revocations = Arc::new(MemoryRevocationStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory
            .insert(Principal::new("u1", true).with_email("u1@example.com"))
            .await;
        directory.insert(Principal::new("u2", false)).await;
        let resolver = PrincipalResolver::new(codec.clone(), revocations.clone(), directory);
        Ok((resolver, codec, revocations))
    }

    #[tokio::test]
    async fn active_principal_is_authenticated() -> Result<(), AuthError> {
        let (resolver, codec, _) = resolver().await?;
        let token = codec.issue("u1", TokenType::Access, None)?;
        let resolution = resolver.resolve(&token).await?;
        assert_eq!(
            resolution,
            Resolution::Authenticated(Principal::new("u1", true).with_email("u1@example.com"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn inactive_principal_is_forbidden() -> Result<(), AuthError> {
        let (resolver, codec, _) = resolver().await?;
        let token = codec.issue("u2", TokenType::Access, None)?;
        assert_eq!(
            resolver.resolve(&token).await?,
            Resolution::Forbidden
        );
        assert!(matches!(
            resolver.authenticate(&token).await,
            Err(AuthError::PrincipalInactive)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_subject_is_unauthenticated() -> Result<(), AuthError> {
        let (resolver, codec, _) = resolver().await?;
        let token = codec.issue("ghost", TokenType::Access, None)?;
        assert_eq!(
            resolver.resolve(&token).await?,
            Resolution::Unauthenticated
        );
        assert!(matches!(
            resolver.authenticate(&token).await,
            Err(AuthError::SubjectNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn revoked_token_is_unauthenticated() -> Result<(), AuthError> {
        let (resolver, codec, revocations) = resolver().await?;
        let token = codec.issue("u1", TokenType::Access, None)?;
        let claims = codec.verify(&token, TokenType::Access, true)?;
        revocations.revoke(&claims.jti, claims.exp).await?;

        assert_eq!(
            resolver.resolve(&token).await?,
            Resolution::Unauthenticated
        );
        assert!(matches!(
            resolver.authenticate(&token).await,
            Err(AuthError::TokenRevoked)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_token_is_not_a_bearer() -> Result<(), AuthError> {
        let (resolver, codec, _) = resolver().await?;
        let token = codec.issue("u1", TokenType::Refresh, None)?;
        assert_eq!(
            resolver.resolve(&token).await?,
            Resolution::Unauthenticated
        );
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated() -> Result<(), AuthError> {
        let (resolver, codec, _) = resolver().await?;
        let issued_at = chrono::Utc::now().timestamp() - 3600;
        let token = codec.issue_at(
            "u1",
            TokenType::Access,
            Some(Duration::from_secs(60)),
            issued_at,
        )?;
        assert_eq!(
            resolver.resolve(&token).await?,
            Resolution::Unauthenticated
        );
        assert!(matches!(
            resolver.authenticate(&token).await,
            Err(AuthError::TokenExpired)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn directory_outage_is_an_error() -> Result<(), AuthError> {
        let codec = codec()?;
        let resolver = PrincipalResolver::new(
            codec.clone(),
            Arc::new(MemoryRevocationStore::new()),
            Arc::new(FailingDirectory),
        );
        let token = codec.issue("u1", TokenType::Access, None)?;
        let result = resolver.resolve(&token).await;
        assert!(matches!(result, Err(AuthError::Backend(_))));
        Ok(())
    }

    #[test]
    fn resolution_maps_to_rejection() {
        assert_eq!(
            Resolution::Unauthenticated.into_result(),
            Err(Rejection::Unauthenticated)
        );
        assert_eq!(
            Resolution::Forbidden.into_result(),
            Err(Rejection::Forbidden)
        );
        assert_eq!(
            Resolution::Authenticated(Principal::new("u1", true)).into_result(),
            Ok(Principal::new("u1", true))
        );
    }
}
