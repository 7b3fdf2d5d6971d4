use clap::{builder::PossibleValuesParser, Arg, ArgAction, Command};

use crate::auth::config::{AuthType, DEFAULT_EXCLUDED_PATHS, DEFAULT_SESSION_NAME};

pub const ARG_AUTH_TYPE: &str = "auth-type";
pub const ARG_SESSION_NAME: &str = "session-name";
pub const ARG_SESSION_DURATION: &str = "session-duration";
pub const ARG_SESSION_FILE: &str = "session-file";
pub const ARG_EXCLUDED_PATH: &str = "excluded-path";

pub const DEFAULT_SESSION_FILE: &str = ".db_UserSession.json";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_TYPE)
                .long("auth-type")
                .help("Authentication strategy; when unset the API is not gated")
                .env("TURNSTILE_AUTH_TYPE")
                .value_parser(PossibleValuesParser::new(AuthType::NAMES)),
        )
        .arg(
            Arg::new(ARG_SESSION_NAME)
                .long("session-name")
                .help("Name of the session cookie")
                .env("TURNSTILE_SESSION_NAME")
                .default_value(DEFAULT_SESSION_NAME),
        )
        .arg(
            // Kept as a string: invalid values disable expiry instead of failing startup.
            Arg::new(ARG_SESSION_DURATION)
                .long("session-duration")
                .help("Session lifetime in seconds, 0 or unset means sessions never expire")
                .env("TURNSTILE_SESSION_DURATION"),
        )
        .arg(
            Arg::new(ARG_SESSION_FILE)
                .long("session-file")
                .help("JSON file for persistent sessions when no DSN is configured")
                .env("TURNSTILE_SESSION_FILE")
                .default_value(DEFAULT_SESSION_FILE),
        )
        .arg(
            Arg::new(ARG_EXCLUDED_PATH)
                .long("excluded-path")
                .help("Path that does not require authentication, a trailing * matches a prefix")
                .env("TURNSTILE_EXCLUDED_PATHS")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .default_values(DEFAULT_EXCLUDED_PATHS),
        )
}
