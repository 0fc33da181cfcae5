use crate::cli::actions::{password, revocation, token, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::HashPassword(args) => password::hash(args).await,
        Action::VerifyPassword(args) => password::verify(args).await,
        Action::Issue(args) => token::issue(&args),
        Action::Inspect(args) => token::inspect(&args),
        Action::Revoke(args) => revocation::revoke(args).await,
        Action::Purge(args) => revocation::purge(args).await,
    }
}
