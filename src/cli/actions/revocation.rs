use crate::auth::{
    AuthConfig, AuthError, PgRevocationStore, RevocationStore, TokenCodec, TokenType,
};
use anyhow::{Context, Result};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
pub struct RevokeArgs {
    pub config: AuthConfig,
    pub dsn: SecretString,
    pub token: String,
    pub token_type: TokenType,
}

#[derive(Debug)]
pub struct PurgeArgs {
    pub dsn: SecretString,
}

async fn connect(dsn: &SecretString) -> Result<PgRevocationStore> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let store = PgRevocationStore::new(pool);
    store.migrate().await?;
    Ok(store)
}

/// Revoke a token until its natural expiry.
///
/// # Errors
/// Returns an error if the token is invalid or the database is unreachable.
pub async fn revoke(args: RevokeArgs) -> Result<()> {
    let codec = TokenCodec::new(&args.config)?;
    let claims = match codec.verify(&args.token, args.token_type, true) {
        Ok(claims) => claims,
        Err(AuthError::TokenExpired) => {
            println!("token already expired");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let store = connect(&args.dsn).await?;
    debug!("revoking {} token for {}", claims.token_type, claims.sub);

    if store.try_revoke(&claims.jti, claims.exp).await? {
        info!("revoked token {}", claims.jti);
        println!(
            "revoked {} (entry expires in {}s)",
            claims.jti,
            claims.remaining_seconds(Utc::now().timestamp())
        );
    } else {
        println!("already revoked {}", claims.jti);
    }
    Ok(())
}

/// Delete expired entries from the shared revocation list.
///
/// # Errors
/// Returns an error if the database is unreachable.
pub async fn purge(args: PurgeArgs) -> Result<()> {
    let store = connect(&args.dsn).await?;
    let purged = store.purge_expired().await?;
    info!("purged {purged} expired revocation entries");
    println!("{purged}");
    Ok(())
}
