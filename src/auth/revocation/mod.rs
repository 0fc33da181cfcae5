//! Revoked token identifiers.
//!
//! Flow Overview:
//! 1) Logout or refresh rotation records the token `jti` with the token's own
//!    `exp`.
//! 2) Every authenticated request asks whether its `jti` is revoked.
//! 3) Entries past `exp` count as absent and may be purged; the token would
//!    already fail its expiry check.
//!
//! `MemoryRevocationStore` only suits a single instance (state is lost on
//! restart). Multi-instance deployments need a shared backend such as
//! [`PgRevocationStore`] so a revocation is visible everywhere.

mod memory;
mod postgres;

pub use self::memory::MemoryRevocationStore;
pub use self::postgres::PgRevocationStore;

use async_trait::async_trait;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::interval};
use tracing::{debug, error};

use super::error::AuthError;

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `jti` as revoked until `expires_at` (Unix seconds).
    ///
    /// Returns `true` only for the call that moved the identifier from
    /// "not revoked" to "revoked"; concurrent callers racing on the same `jti`
    /// see exactly one `true`.
    ///
    /// # Errors
    /// Returns `AuthError::Backend` if the store cannot be reached.
    async fn try_revoke(&self, jti: &str, expires_at: i64) -> Result<bool, AuthError>;

    /// Whether `jti` is currently revoked.
    ///
    /// # Errors
    /// Returns `AuthError::Backend` if the store cannot be reached.
    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError>;

    /// Drop entries whose `expires_at` has passed and return how many went.
    ///
    /// # Errors
    /// Returns `AuthError::Backend` if the store cannot be reached.
    async fn purge_expired(&self) -> Result<u64, AuthError>;

    /// Idempotent revoke; re-revoking is a no-op.
    ///
    /// # Errors
    /// Returns `AuthError::Backend` if the store cannot be reached.
    async fn revoke(&self, jti: &str, expires_at: i64) -> Result<(), AuthError> {
        self.try_revoke(jti, expires_at).await.map(|_| ())
    }
}

pub(crate) fn now_unix_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Periodically purge expired entries in the background.
///
/// # Errors
/// Returns `AuthError::Misconfigured` if `every` is zero.
pub fn spawn_purge_task(
    store: Arc<dyn RevocationStore>,
    every: Duration,
) -> Result<JoinHandle<()>, AuthError> {
    if every.is_zero() {
        return Err(AuthError::Misconfigured(
            "purge interval must be non-zero".into(),
        ));
    }
    let mut purge_interval = interval(every);

    Ok(tokio::spawn(async move {
        loop {
            purge_interval.tick().await;

            match store.purge_expired().await {
                Ok(purged) => debug!("purged {purged} expired revocation entries"),
                Err(err) => error!("Failed to purge revocation entries: {err}"),
            }
        }
    }))
}
