use crate::auth::{CredentialHasher, HashCost};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct HashArgs {
    pub cost: HashCost,
    pub password: Option<SecretString>,
}

#[derive(Debug)]
pub struct VerifyArgs {
    pub cost: HashCost,
    pub hash: String,
    pub password: Option<SecretString>,
}

/// Password from the argument, or the first line of stdin.
async fn read_password(password: Option<SecretString>) -> Result<SecretString> {
    if let Some(password) = password {
        return Ok(password);
    }

    let line = BufReader::new(stdin())
        .lines()
        .next_line()
        .await
        .context("failed to read password from stdin")?
        .ok_or_else(|| anyhow!("no password given"))?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n'])))
}

/// Hash the password and print the PHC string.
///
/// # Errors
/// Returns an error if the cost is invalid or hashing fails.
pub async fn hash(args: HashArgs) -> Result<()> {
    let hasher = CredentialHasher::new(args.cost)?;
    let password = read_password(args.password).await?;

    println!("{}", hasher.hash(password.expose_secret())?);
    Ok(())
}

/// Verify the password against the hash; a mismatch is an error so the exit
/// status reflects it.
///
/// # Errors
/// Returns an error if the password does not match.
pub async fn verify(args: VerifyArgs) -> Result<()> {
    let hasher = CredentialHasher::new(args.cost)?;
    let password = read_password(args.password).await?;

    check(&hasher, password.expose_secret(), &args.hash)?;
    println!("ok");
    Ok(())
}

fn check(hasher: &CredentialHasher, password: &str, hash: &str) -> Result<()> {
    if let Err(err) = hasher.check(password, hash) {
        debug!("password verification failed: {err}");
        return Err(anyhow!("password does not match"));
    }
    if hasher.needs_rehash(hash) {
        warn!("hash was made with different settings and should be replaced");
    }
    Ok(())
}
