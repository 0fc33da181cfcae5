use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::{now_unix_seconds, RevocationStore};
use crate::auth::error::AuthError;

const SCHEMA: &str = include_str!("../../../sql/revocation.sql");

/// Revocation list shared by every instance through Postgres.
#[derive(Debug, Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `revoked_tokens` table and its expiry index if missing.
    ///
    /// # Errors
    /// Returns `AuthError::Backend` if the statements fail.
    pub async fn migrate(&self) -> Result<(), AuthError> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE"
        );
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn try_revoke(&self, jti: &str, expires_at: i64) -> Result<bool, AuthError> {
        // A stale row for the same jti can only belong to an expired token, so
        // it is replaced; a live row leaves the statement without a result.
        let query = r"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO UPDATE
                SET expires_at = EXCLUDED.expires_at
                WHERE revoked_tokens.expires_at <= $3
            RETURNING jti
        ";
        let now = now_unix_seconds();
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        let row = sqlx::query(query)
            .bind(jti)
            .bind(expires_at)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.is_some() && expires_at > now)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        let query = r"
            SELECT EXISTS(
                SELECT 1 FROM revoked_tokens WHERE jti = $1 AND expires_at > $2
            ) AS revoked
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(query)
            .bind(jti)
            .bind(now_unix_seconds())
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.try_get("revoked")?)
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        let query = "DELETE FROM revoked_tokens WHERE expires_at <= $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE"
        );
        let result = sqlx::query(query)
            .bind(now_unix_seconds())
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(result.rows_affected())
    }
}
