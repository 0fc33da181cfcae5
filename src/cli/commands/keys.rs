use crate::auth::{Algorithm, AuthConfig, HashCost};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_ACCESS_SECRET: &str = "access-secret";
pub const ARG_REFRESH_SECRET: &str = "refresh-secret";
pub const ARG_ALGORITHM: &str = "algorithm";
pub const ARG_ACCESS_TTL_SECONDS: &str = "access-ttl-seconds";
pub const ARG_REFRESH_TTL_SECONDS: &str = "refresh-ttl-seconds";
pub const ARG_HASH_MEMORY_KIB: &str = "hash-memory-kib";
pub const ARG_HASH_ITERATIONS: &str = "hash-iterations";
pub const ARG_HASH_PARALLELISM: &str = "hash-parallelism";

/// Token signing settings.
pub struct Options {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Options {
    /// Parse signing arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a secret is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_secret = |id: &str| -> anyhow::Result<SecretString> {
            matches
                .get_one::<String>(id)
                .filter(|v| !v.is_empty())
                .map(|v| SecretString::from(v.as_str()))
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            access_secret: read_secret(ARG_ACCESS_SECRET)?,
            refresh_secret: read_secret(ARG_REFRESH_SECRET)?,
            algorithm: matches
                .get_one::<Algorithm>(ARG_ALGORITHM)
                .copied()
                .unwrap_or_default(),
            access_ttl: Duration::from_secs(
                matches
                    .get_one::<u64>(ARG_ACCESS_TTL_SECONDS)
                    .copied()
                    .unwrap_or(900),
            ),
            refresh_ttl: Duration::from_secs(
                matches
                    .get_one::<u64>(ARG_REFRESH_TTL_SECONDS)
                    .copied()
                    .unwrap_or(604_800),
            ),
        })
    }

    /// Build the validated `AuthConfig` these options describe.
    ///
    /// # Errors
    /// Returns an error if the resulting configuration is rejected.
    pub fn into_config(self, cost: HashCost) -> anyhow::Result<AuthConfig> {
        let config = AuthConfig::new(self.access_secret, self.refresh_secret)
            .with_algorithm(self.algorithm)
            .with_access_ttl(self.access_ttl)
            .with_refresh_ttl(self.refresh_ttl)
            .with_hash_cost(cost);
        config.validate()?;
        Ok(config)
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("access_secret", &"***")
            .field("refresh_secret", &"***")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Argon2id cost from matches; defaults follow `HashCost::default`.
#[must_use]
pub fn parse_hash_cost(matches: &ArgMatches) -> HashCost {
    let defaults = HashCost::default();
    HashCost {
        memory_kib: matches
            .get_one::<u32>(ARG_HASH_MEMORY_KIB)
            .copied()
            .unwrap_or(defaults.memory_kib),
        iterations: matches
            .get_one::<u32>(ARG_HASH_ITERATIONS)
            .copied()
            .unwrap_or(defaults.iterations),
        parallelism: matches
            .get_one::<u32>(ARG_HASH_PARALLELISM)
            .copied()
            .unwrap_or(defaults.parallelism),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_signing_args(command);
    with_hash_args(command)
}

fn with_signing_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_SECRET)
                .long(ARG_ACCESS_SECRET)
                .help("HMAC secret for access tokens (at least 32 bytes)")
                .env("TESSERA_ACCESS_SECRET")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_SECRET)
                .long(ARG_REFRESH_SECRET)
                .help("HMAC secret for refresh tokens, distinct from the access secret")
                .env("TESSERA_REFRESH_SECRET")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_ALGORITHM)
                .long(ARG_ALGORITHM)
                .help("Token signing algorithm: HS256, HS384 or HS512")
                .env("TESSERA_ALGORITHM")
                .default_value("HS256")
                .global(true)
                .value_parser(clap::value_parser!(Algorithm)),
        )
        .arg(
            Arg::new(ARG_ACCESS_TTL_SECONDS)
                .long(ARG_ACCESS_TTL_SECONDS)
                .help("Access token TTL in seconds")
                .env("TESSERA_ACCESS_TTL_SECONDS")
                .default_value("900")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL_SECONDS)
                .long(ARG_REFRESH_TTL_SECONDS)
                .help("Refresh token TTL in seconds")
                .env("TESSERA_REFRESH_TTL_SECONDS")
                .default_value("604800")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

fn with_hash_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HASH_MEMORY_KIB)
                .long(ARG_HASH_MEMORY_KIB)
                .help("Argon2id memory cost in KiB")
                .env("TESSERA_HASH_MEMORY_KIB")
                .default_value("19456")
                .global(true)
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_HASH_ITERATIONS)
                .long(ARG_HASH_ITERATIONS)
                .help("Argon2id iteration count")
                .env("TESSERA_HASH_ITERATIONS")
                .default_value("2")
                .global(true)
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_HASH_PARALLELISM)
                .long(ARG_HASH_PARALLELISM)
                .help("Argon2id lanes")
                .env("TESSERA_HASH_PARALLELISM")
                .default_value("1")
                .global(true)
                .value_parser(clap::value_parser!(u32)),
        )
}
