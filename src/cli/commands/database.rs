use clap::{Arg, ArgMatches, Command};

pub const ARG_DSN: &str = "dsn";

/// Postgres connection string, only needed by the revocation commands.
///
/// # Errors
/// Returns an error if `--dsn` is missing or blank.
pub fn parse(matches: &ArgMatches) -> anyhow::Result<String> {
    matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_DSN}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_DSN)
            .short('d')
            .long(ARG_DSN)
            .help("Database connection string for the shared revocation list")
            .env("TESSERA_DSN")
            .global(true),
    )
}
