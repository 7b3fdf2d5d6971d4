use crate::auth::{config::parse_session_duration, AuthConfig, AuthType, ExcludedPaths};
use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth::{
    ARG_AUTH_TYPE, ARG_EXCLUDED_PATH, ARG_SESSION_DURATION, ARG_SESSION_FILE, ARG_SESSION_NAME,
    DEFAULT_SESSION_FILE,
};
use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// # Errors
/// Returns an error if the arguments can not be turned into a configuration.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>("dsn").cloned();

    let auth_type = matches
        .get_one::<String>(ARG_AUTH_TYPE)
        .map(|name| name.parse::<AuthType>())
        .transpose()
        .map_err(|err| anyhow!(err))?;

    let excluded_paths = ExcludedPaths::new(
        matches
            .get_many::<String>(ARG_EXCLUDED_PATH)
            .into_iter()
            .flatten()
            .map(|path| path.trim())
            .filter(|path| !path.is_empty()),
    );

    let mut auth = AuthConfig::new()
        .with_auth_type(auth_type)
        .with_session_duration(parse_session_duration(
            matches
                .get_one::<String>(ARG_SESSION_DURATION)
                .map(String::as_str),
        ))
        .with_excluded_paths(excluded_paths);
    if let Some(name) = matches.get_one::<String>(ARG_SESSION_NAME) {
        auth = auth.with_session_name(name.clone());
    }

    let session_file = matches
        .get_one::<String>(ARG_SESSION_FILE)
        .map_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from);

    Ok(Action::Server(Args {
        port,
        dsn,
        auth,
        session_file,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn action_from(args: &[&str]) -> Args {
        let matches = commands::new().get_matches_from(args.iter().copied());
        match handler(&matches).unwrap() {
            Action::Server(args) => args,
        }
    }

    #[test]
    fn test_handler_builds_auth_config() {
        temp_env::with_vars(
            [
                ("TURNSTILE_AUTH_TYPE", None::<&str>),
                ("TURNSTILE_SESSION_DURATION", None),
                ("TURNSTILE_EXCLUDED_PATHS", None),
                ("TURNSTILE_DSN", None),
            ],
            || {
                let args = action_from(&[
                    "turnstile",
                    "--auth-type",
                    "session_db_auth",
                    "--session-duration",
                    "120",
                    "--session-name",
                    "sid",
                    "--session-file",
                    "/tmp/sessions.json",
                    "--excluded-path",
                    "/api/v1/status/",
                ]);
                assert_eq!(args.port, 8080);
                assert!(args.dsn.is_none());
                assert_eq!(args.auth.auth_type(), Some(AuthType::SessionPersistent));
                assert_eq!(args.auth.session_duration(), 120);
                assert_eq!(args.auth.session_name(), "sid");
                assert_eq!(args.session_file, PathBuf::from("/tmp/sessions.json"));
                assert!(!args.auth.excluded_paths().requires_auth("/api/v1/status"));
                assert!(args.auth.excluded_paths().requires_auth("/api/v1/forbidden"));
            },
        );
    }

    #[test]
    fn test_handler_degrades_invalid_duration() {
        temp_env::with_vars(
            [
                ("TURNSTILE_AUTH_TYPE", None::<&str>),
                ("TURNSTILE_SESSION_DURATION", Some("soon")),
            ],
            || {
                let args = action_from(&["turnstile"]);
                assert_eq!(args.auth.auth_type(), None);
                assert_eq!(args.auth.session_duration(), 0);
            },
        );
    }
}
