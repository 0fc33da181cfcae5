pub mod password;
pub mod revocation;
pub mod token;

// Internal "interpreter" for `Action`.
mod run;

#[derive(Debug)]
pub enum Action {
    HashPassword(password::HashArgs),
    VerifyPassword(password::VerifyArgs),
    Issue(token::IssueArgs),
    Inspect(token::InspectArgs),
    Revoke(revocation::RevokeArgs),
    Purge(revocation::PurgeArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
