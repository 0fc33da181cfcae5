//! Map parsed arguments to an [`Action`].
//!
//! Settings that only some subcommands need (signing secrets, the database
//! DSN) are optional at the clap level and enforced here.

use crate::auth::{AuthConfig, CredentialHasher, HashCost, TokenType};
use crate::cli::actions::{
    password::{HashArgs, VerifyArgs},
    revocation::{PurgeArgs, RevokeArgs},
    token::{InspectArgs, IssueArgs},
    Action,
};
use crate::cli::commands::{
    database, keys, ARG_ALLOW_EXPIRED, ARG_HASH, ARG_PAIR, ARG_PASSWORD, ARG_SUBJECT, ARG_TOKEN,
    ARG_TOKEN_TYPE, ARG_TTL_SECONDS, CMD_HASH_PASSWORD, CMD_INSPECT, CMD_ISSUE, CMD_PURGE,
    CMD_REVOKE, CMD_VERIFY_PASSWORD,
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::time::Duration;

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: <{id}>"))
}

fn token_type(matches: &ArgMatches) -> Result<TokenType> {
    matches
        .get_one::<String>(ARG_TOKEN_TYPE)
        .map_or(Ok(TokenType::Access), |value| value.parse())
        .map_err(|err: String| anyhow!(err))
}

fn password(matches: &ArgMatches) -> Option<SecretString> {
    matches
        .get_one::<String>(ARG_PASSWORD)
        .map(|value| SecretString::from(value.as_str()))
}

fn hash_cost(matches: &ArgMatches) -> Result<HashCost> {
    let cost = keys::parse_hash_cost(matches);
    CredentialHasher::new(cost)?;
    Ok(cost)
}

fn auth_config(matches: &ArgMatches) -> Result<AuthConfig> {
    keys::Options::parse(matches)?.into_config(hash_cost(matches)?)
}

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let Some((name, sub)) = matches.subcommand() else {
        return Err(anyhow!("missing subcommand"));
    };

    match name {
        CMD_HASH_PASSWORD => Ok(Action::HashPassword(HashArgs {
            cost: hash_cost(sub)?,
            password: password(sub),
        })),
        CMD_VERIFY_PASSWORD => Ok(Action::VerifyPassword(VerifyArgs {
            cost: hash_cost(sub)?,
            hash: required(sub, ARG_HASH)?,
            password: password(sub),
        })),
        CMD_ISSUE => Ok(Action::Issue(IssueArgs {
            config: auth_config(sub)?,
            subject: required(sub, ARG_SUBJECT)?,
            token_type: token_type(sub)?,
            ttl: sub
                .get_one::<u64>(ARG_TTL_SECONDS)
                .map(|seconds| Duration::from_secs(*seconds)),
            pair: sub.get_flag(ARG_PAIR),
        })),
        CMD_INSPECT => Ok(Action::Inspect(InspectArgs {
            config: auth_config(sub)?,
            token: required(sub, ARG_TOKEN)?,
            token_type: token_type(sub)?,
            allow_expired: sub.get_flag(ARG_ALLOW_EXPIRED),
        })),
        CMD_REVOKE => Ok(Action::Revoke(RevokeArgs {
            config: auth_config(sub)?,
            dsn: SecretString::from(database::parse(sub)?),
            token: required(sub, ARG_TOKEN)?,
            token_type: token_type(sub)?,
        })),
        CMD_PURGE => Ok(Action::Purge(PurgeArgs {
            dsn: SecretString::from(database::parse(sub)?),
        })),
        other => Err(anyhow!("unknown subcommand: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    const ACCESS: &str = "access-secret-for-tests-0123456789abcdef";
    const REFRESH: &str = "refresh-secret-for-tests-0123456789abcdef";

    fn with_env<F, R>(vars: [(&str, Option<&str>); 3], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        temp_env::with_vars(vars, f)
    }

    #[test]
    fn access_secret_required_for_tokens() {
        with_env(
            [
                ("TESSERA_ACCESS_SECRET", None),
                ("TESSERA_REFRESH_SECRET", Some(REFRESH)),
                ("TESSERA_DSN", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["tessera", "issue", "u1"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --access-secret"));
                }
            },
        );
    }

    #[test]
    fn short_secret_is_rejected() {
        with_env(
            [
                ("TESSERA_ACCESS_SECRET", Some("short")),
                ("TESSERA_REFRESH_SECRET", Some(REFRESH)),
                ("TESSERA_DSN", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["tessera", "issue", "u1"]);
                assert!(handler(&matches).is_err());
            },
        );
    }

    #[test]
    fn issue_action() {
        with_env(
            [
                ("TESSERA_ACCESS_SECRET", Some(ACCESS)),
                ("TESSERA_REFRESH_SECRET", Some(REFRESH)),
                ("TESSERA_DSN", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "tessera",
                    "issue",
                    "u1",
                    "--type",
                    "refresh",
                    "--ttl-seconds",
                    "120",
                ]);
                match handler(&matches) {
                    Ok(Action::Issue(args)) => {
                        assert_eq!(args.subject, "u1");
                        assert_eq!(args.token_type, TokenType::Refresh);
                        assert_eq!(args.ttl, Some(Duration::from_secs(120)));
                        assert!(!args.pair);
                    }
                    other => panic!("unexpected dispatch result: {other:?}"),
                }
            },
        );
    }

    #[test]
    fn hash_password_needs_no_secrets() {
        with_env(
            [
                ("TESSERA_ACCESS_SECRET", None),
                ("TESSERA_REFRESH_SECRET", None),
                ("TESSERA_DSN", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "tessera",
                    "hash-password",
                    "--hash-memory-kib",
                    "1024",
                    "--hash-iterations",
                    "1",
                ]);
                match handler(&matches) {
                    Ok(Action::HashPassword(args)) => {
                        assert_eq!(args.cost.memory_kib, 1024);
                        assert_eq!(args.cost.iterations, 1);
                    }
                    other => panic!("unexpected dispatch result: {other:?}"),
                }
            },
        );
    }

    #[test]
    fn purge_requires_dsn() {
        with_env(
            [
                ("TESSERA_ACCESS_SECRET", None),
                ("TESSERA_REFRESH_SECRET", None),
                ("TESSERA_DSN", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["tessera", "purge"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --dsn"));
                }
            },
        );
    }
}
