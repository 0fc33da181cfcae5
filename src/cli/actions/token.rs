use crate::auth::{
    AuthConfig, MemoryDirectory, MemoryRevocationStore, SessionManager, TokenCodec, TokenType,
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};

#[derive(Debug)]
pub struct IssueArgs {
    pub config: AuthConfig,
    pub subject: String,
    pub token_type: TokenType,
    pub ttl: Option<Duration>,
    pub pair: bool,
}

#[derive(Debug)]
pub struct InspectArgs {
    pub config: AuthConfig,
    pub token: String,
    pub token_type: TokenType,
    pub allow_expired: bool,
}

/// Print a single token, or a JSON token pair with `--pair`.
///
/// # Errors
/// Returns an error if the configuration is invalid or signing fails.
pub fn issue(args: &IssueArgs) -> Result<()> {
    println!("{}", render_issue(args)?);
    Ok(())
}

fn render_issue(args: &IssueArgs) -> Result<String> {
    let codec = Arc::new(TokenCodec::new(&args.config)?);

    if args.pair {
        // Issuing needs neither revocation state nor the directory.
        let sessions = SessionManager::new(
            codec,
            Arc::new(MemoryRevocationStore::new()),
            Arc::new(MemoryDirectory::new()),
        );
        let pair = sessions.issue_pair(&args.subject)?;
        return Ok(serde_json::to_string_pretty(&pair)?);
    }

    Ok(codec.issue(&args.subject, args.token_type, args.ttl)?)
}

/// Verify a token and print its claims as JSON.
///
/// # Errors
/// Returns the verification failure if the token is not valid.
pub fn inspect(args: &InspectArgs) -> Result<()> {
    println!("{}", render_inspect(args)?);
    Ok(())
}

fn render_inspect(args: &InspectArgs) -> Result<String> {
    let codec = TokenCodec::new(&args.config)?;
    let claims = codec.verify(&args.token, args.token_type, !args.allow_expired)?;
    Ok(serde_json::to_string_pretty(&claims)?)
}
