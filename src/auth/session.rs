//! Token pair lifecycle: login, rotation, logout.
//!
//! Refresh tokens are single use. Rotation consumes the presented `jti`
//! through `RevocationStore::try_revoke`, so when two requests race with the
//! same refresh token only one of them receives a new pair.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::{
    error::AuthError,
    password::CredentialHasher,
    principal::{PrincipalResolver, UserDirectory},
    revocation::RevocationStore,
    token::{TokenCodec, TokenType},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

pub struct SessionManager {
    codec: Arc<TokenCodec>,
    revocations: Arc<dyn RevocationStore>,
    resolver: PrincipalResolver,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<dyn RevocationStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let resolver = PrincipalResolver::new(codec.clone(), revocations.clone(), directory);
        Self {
            codec,
            revocations,
            resolver,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &PrincipalResolver {
        &self.resolver
    }

    /// Issue an access/refresh pair for an already authenticated subject.
    ///
    /// # Errors
    /// Returns `AuthError::SigningFailure` or `AuthError::Misconfigured` if a
    /// token cannot be signed.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        let access_token = self.codec.issue(subject, TokenType::Access, None)?;
        let refresh_token = self.codec.issue(subject, TokenType::Refresh, None)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.codec.ttl(TokenType::Access).as_secs(),
        })
    }

    /// Check a password against the subject's stored hash and issue a pair.
    ///
    /// # Errors
    /// `InvalidCredentials` on mismatch, `SubjectNotFound` or
    /// `PrincipalInactive` from the directory, `Backend` if it is unreachable.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        hasher: &CredentialHasher,
        subject: &str,
        password: &str,
        stored_hash: &str,
    ) -> Result<TokenPair, AuthError> {
        hasher.check(password, stored_hash)?;
        let principal = self
            .resolver
            .load_active(subject)
            .await
            .inspect_err(log_backend_failure)?;
        self.issue_pair(&principal.id)
    }

    /// Trade a refresh token for a new pair, revoking the old one.
    ///
    /// # Errors
    /// Token failures, `TokenRevoked` (already used), `SubjectNotFound` and
    /// `PrincipalInactive` reject the request; `Backend` means the store or
    /// directory is unreachable.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.rotate(refresh_token).await.inspect_err(log_backend_failure)
    }

    // The old jti is consumed last: a failure before that leaves the refresh
    // token usable for a retry.
    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.codec.verify(refresh_token, TokenType::Refresh, true)?;
        let principal = self.resolver.load_active(&claims.sub).await?;
        let pair = self.issue_pair(&principal.id)?;

        if !self.revocations.try_revoke(&claims.jti, claims.exp).await? {
            debug!("refresh token reuse rejected");
            return Err(AuthError::TokenRevoked);
        }
        Ok(pair)
    }

    /// Revoke the presented tokens until their natural expiry.
    ///
    /// Invalid or already expired tokens are skipped, so logout succeeds
    /// regardless of what the client sends.
    ///
    /// # Errors
    /// Returns `AuthError::Backend` if the store cannot record a revocation.
    #[instrument(skip_all)]
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let presented = std::iter::once((access_token, TokenType::Access))
            .chain(refresh_token.map(|token| (token, TokenType::Refresh)));

        for (token, token_type) in presented {
            match self.codec.verify(token, token_type, true) {
                Ok(claims) => self
                    .revocations
                    .revoke(&claims.jti, claims.exp)
                    .await
                    .inspect_err(log_backend_failure)?,
                Err(err) => debug!("skipping {token_type} token on logout: {err}"),
            }
        }
        Ok(())
    }

    /// Revoke a single token of either type; `false` if it was not live.
    ///
    /// # Errors
    /// Returns `AuthError::Backend` if the store cannot record a revocation.
    pub async fn revoke_token(
        &self,
        token: &str,
        token_type: TokenType,
    ) -> Result<bool, AuthError> {
        let Ok(claims) = self.codec.verify(token, token_type, true) else {
            return Ok(false);
        };
        self.revocations
            .try_revoke(&claims.jti, claims.exp)
            .await
            .inspect_err(log_backend_failure)
    }
}

// Signing failures are logged by the codec itself.
fn log_backend_failure(err: &AuthError) {
    if matches!(err, AuthError::Backend(_)) {
        error!("session operation failed: {err}");
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        config::{AuthConfig, HashCost},
        principal::{MemoryDirectory, Principal, Resolution},
        revocation::MemoryRevocationStore,
    };
    use secrecy::SecretString;

    async fn manager() -> Result<(SessionManager, Arc<MemoryDirectory>), AuthError> {
        let config = AuthConfig::new(
            SecretString::from("access-secret-for-tests-0123456789abcdef"),
            SecretString::from("refresh-secret-for-tests-0123456789abcdef"),
        );
        let codec = Arc::new(TokenCodec::new(&config)?);
        let directory = Arc::new(MemoryDirectory::new());
        directory.insert(Principal::new("u1", true)).await;
        let manager = SessionManager::new(
            codec,
            Arc::new(MemoryRevocationStore::new()),
            directory.clone(),
        );
        Ok((manager, directory))
    }

    #[tokio::test]
    async fn pair_resolves() -> Result<(), AuthError> {
        let (manager, _) = manager().await?;
        let pair = manager.issue_pair("u1")?;
        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 900);
        assert!(matches!(
            manager.resolver().resolve(&pair.access_token).await?,
            Resolution::Authenticated(_)
        ));
        assert_eq!(
            manager.resolver().resolve(&pair.refresh_token).await?,
            Resolution::Unauthenticated
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_checks_password_then_principal() -> Result<(), AuthError> {
        let (manager, directory) = manager().await?;
        let hasher = CredentialHasher::new(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })?;
        let stored = hasher.hash("pw")?;

        let pair = manager.login(&hasher, "u1", "pw", &stored).await?;
        assert!(matches!(
            manager.resolver().resolve(&pair.access_token).await?,
            Resolution::Authenticated(_)
        ));
        assert!(matches!(
            manager.login(&hasher, "u1", "nope", &stored).await,
            Err(AuthError::InvalidCredentials)
        ));

        directory.insert(Principal::new("u1", false)).await;
        assert!(matches!(
            manager.login(&hasher, "u1", "pw", &stored).await,
            Err(AuthError::PrincipalInactive)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_rotates_once() -> Result<(), AuthError> {
        let (manager, _) = manager().await?;
        let pair = manager.issue_pair("u1")?;

        let rotated = manager.refresh(&pair.refresh_token).await?;
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert!(matches!(
            manager.resolver().resolve(&rotated.access_token).await?,
            Resolution::Authenticated(_)
        ));

        let reused = manager.refresh(&pair.refresh_token).await;
        assert!(matches!(reused, Err(AuthError::TokenRevoked)));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() -> Result<(), AuthError> {
        let (manager, _) = manager().await?;
        let pair = manager.issue_pair("u1")?;
        assert!(manager.refresh(&pair.access_token).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_checks_principal() -> Result<(), AuthError> {
        let (manager, directory) = manager().await?;
        let pair = manager.issue_pair("u1")?;

        directory.insert(Principal::new("u1", false)).await;
        assert!(matches!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::PrincipalInactive)
        ));

        let pair = manager.issue_pair("u1")?;
        directory.remove("u1").await;
        assert!(matches!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::SubjectNotFound)
        ));
        Ok(())
    }

    struct OfflineDirectory;

    #[async_trait::async_trait]
    impl UserDirectory for OfflineDirectory {
        async fn find_by_id(&self, _subject: &str) -> Result<Option<Principal>, AuthError> {
            Err(AuthError::Backend("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_refresh_keeps_token_usable() -> Result<(), AuthError> {
        let (healthy, _) = manager().await?;
        let revocations = Arc::new(MemoryRevocationStore::new());
        let config = AuthConfig::new(
            SecretString::from("access-secret-for-tests-0123456789abcdef"),
            SecretString::from("refresh-secret-for-tests-0123456789abcdef"),
        );
        let codec = Arc::new(TokenCodec::new(&config)?);
        let directory = Arc::new(MemoryDirectory::new());
        directory.insert(Principal::new("u1", true)).await;

        let outage = SessionManager::new(
            codec.clone(),
            revocations.clone(),
            Arc::new(OfflineDirectory),
        );
        let recovered = SessionManager::new(codec, revocations.clone(), directory);
        let pair = healthy.issue_pair("u1")?;

        assert!(matches!(
            outage.refresh(&pair.refresh_token).await,
            Err(AuthError::Backend(_))
        ));
        assert!(revocations.is_empty().await);

        let rotated = recovered.refresh(&pair.refresh_token).await?;
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert!(matches!(
            recovered.refresh(&pair.refresh_token).await,
            Err(AuthError::TokenRevoked)
        ));
        Ok(())
    }

    #[test]
    fn issue_pair_surfaces_operational_failure() -> Result<(), AuthError> {
        let config = AuthConfig::new(
            SecretString::from("access-secret-for-tests-0123456789abcdef"),
            SecretString::from("refresh-secret-for-tests-0123456789abcdef"),
        );
        let manager = SessionManager::new(
            Arc::new(TokenCodec::new(&config)?),
            Arc::new(MemoryRevocationStore::new()),
            Arc::new(MemoryDirectory::new()),
        );
        let err = manager.issue_pair("").err();
        assert!(err.as_ref().is_some_and(AuthError::is_operational));
        assert!(matches!(err, Some(AuthError::Misconfigured(_))));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_refresh_has_one_winner() -> Result<(), AuthError> {
        let (manager, _) = manager().await?;
        let manager = Arc::new(manager);
        let pair = manager.issue_pair("u1")?;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = manager.clone();
            let token = pair.refresh_token.clone();
            handles.push(tokio::spawn(async move { manager.refresh(&token).await }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle
                .await
                .map_err(|err| AuthError::Backend(err.to_string()))?
            {
                Ok(_) => successes += 1,
                Err(AuthError::TokenRevoked) => {}
                Err(err) => return Err(err),
            }
        }
        assert_eq!(successes, 1);
        Ok(())
    }

    #[tokio::test]
    async fn logout_revokes_both_tokens() -> Result<(), AuthError> {
        let (manager, _) = manager().await?;
        let pair = manager.issue_pair("u1")?;

        manager
            .logout(&pair.access_token, Some(&pair.refresh_token))
            .await?;

        assert_eq!(
            manager.resolver().resolve(&pair.access_token).await?,
            Resolution::Unauthenticated
        );
        assert!(matches!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::TokenRevoked)
        ));

        // Repeating logout, or sending garbage, is not an error.
        manager
            .logout(&pair.access_token, Some(&pair.refresh_token))
            .await?;
        manager.logout("garbage", None).await?;
        Ok(())
    }

    #[tokio::test]
    async fn revoke_token_reports_first_revocation() -> Result<(), AuthError> {
        let (manager, _) = manager().await?;
        let pair = manager.issue_pair("u1")?;
        assert!(
            manager
                .revoke_token(&pair.access_token, TokenType::Access)
                .await?
        );
        assert!(
            !manager
                .revoke_token(&pair.access_token, TokenType::Access)
                .await?
        );
        assert!(!manager.revoke_token("garbage", TokenType::Access).await?);
        Ok(())
    }
}
