pub mod database;
pub mod keys;
pub mod logging;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        PossibleValuesParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub const CMD_HASH_PASSWORD: &str = "hash-password";
pub const CMD_VERIFY_PASSWORD: &str = "verify-password";
pub const CMD_ISSUE: &str = "issue";
pub const CMD_INSPECT: &str = "inspect";
pub const CMD_REVOKE: &str = "revoke";
pub const CMD_PURGE: &str = "purge";

pub const ARG_PASSWORD: &str = "password";
pub const ARG_HASH: &str = "hash";
pub const ARG_SUBJECT: &str = "subject";
pub const ARG_TOKEN: &str = "token";
pub const ARG_TOKEN_TYPE: &str = "type";
pub const ARG_TTL_SECONDS: &str = "ttl-seconds";
pub const ARG_PAIR: &str = "pair";
pub const ARG_ALLOW_EXPIRED: &str = "allow-expired";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("tessera")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(hash_password())
        .subcommand(verify_password())
        .subcommand(issue())
        .subcommand(inspect())
        .subcommand(revoke())
        .subcommand(purge());

    let command = keys::with_args(command);
    let command = database::with_args(command);
    logging::with_args(command)
}

fn token_type_arg() -> Arg {
    Arg::new(ARG_TOKEN_TYPE)
        .short('t')
        .long(ARG_TOKEN_TYPE)
        .help("Token type")
        .default_value("access")
        .value_parser(PossibleValuesParser::new(["access", "refresh"]))
}

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .help("Plaintext password; read from stdin when omitted")
        .env("TESSERA_PASSWORD")
        .hide_env_values(true)
}

fn hash_password() -> Command {
    Command::new(CMD_HASH_PASSWORD)
        .about("Hash a password with Argon2id")
        .arg(password_arg())
}

fn verify_password() -> Command {
    Command::new(CMD_VERIFY_PASSWORD)
        .about("Check a password against a stored hash")
        .arg(
            Arg::new(ARG_HASH)
                .help("PHC formatted hash")
                .required(true),
        )
        .arg(password_arg())
}

fn issue() -> Command {
    Command::new(CMD_ISSUE)
        .about("Issue a signed token for a subject")
        .arg(
            Arg::new(ARG_SUBJECT)
                .help("Subject identifier (sub claim)")
                .required(true),
        )
        .arg(token_type_arg())
        .arg(
            Arg::new(ARG_TTL_SECONDS)
                .long(ARG_TTL_SECONDS)
                .help("Override the configured TTL for this token")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PAIR)
                .long(ARG_PAIR)
                .help("Issue an access/refresh pair as JSON")
                .action(ArgAction::SetTrue)
                .conflicts_with(ARG_TTL_SECONDS),
        )
}

fn inspect() -> Command {
    Command::new(CMD_INSPECT)
        .about("Verify a token and print its claims")
        .arg(Arg::new(ARG_TOKEN).help("Compact token").required(true))
        .arg(token_type_arg())
        .arg(
            Arg::new(ARG_ALLOW_EXPIRED)
                .long(ARG_ALLOW_EXPIRED)
                .help("Skip the expiry check")
                .action(ArgAction::SetTrue),
        )
}

fn revoke() -> Command {
    Command::new(CMD_REVOKE)
        .about("Revoke a token in the shared revocation list")
        .arg(Arg::new(ARG_TOKEN).help("Compact token").required(true))
        .arg(token_type_arg())
}

fn purge() -> Command {
    Command::new(CMD_PURGE).about("Drop expired entries from the shared revocation list")
}
