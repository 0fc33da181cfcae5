use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{now_unix_seconds, RevocationStore};
use crate::auth::error::AuthError;

/// Process-local revocation list, `jti` → `expires_at`.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<String, i64>>,
}

impl MemoryRevocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub(crate) async fn try_revoke_at(&self, jti: &str, expires_at: i64, now: i64) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get(jti) {
            // A live entry keeps its first expiry, as in the Postgres store.
            Some(current) if *current > now => false,
            _ => {
                entries.insert(jti.to_string(), expires_at);
                expires_at > now
            }
        }
    }

    pub(crate) async fn is_revoked_at(&self, jti: &str, now: i64) -> bool {
        self.entries
            .read()
            .await
            .get(jti)
            .is_some_and(|expires_at| *expires_at > now)
    }

    pub(crate) async fn purge_expired_at(&self, now: i64) -> u64 {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        u64::try_from(before - entries.len()).unwrap_or(u64::MAX)
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn try_revoke(&self, jti: &str, expires_at: i64) -> Result<bool, AuthError> {
        let now = now_unix_seconds();
        Ok(self.try_revoke_at(jti, expires_at, now).await)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        Ok(self.is_revoked_at(jti, now_unix_seconds()).await)
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(self.purge_expired_at(now_unix_seconds()).await)
    }
}
