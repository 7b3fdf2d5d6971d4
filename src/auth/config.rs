//! Authentication configuration resolved once at startup.

use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::paths::ExcludedPaths;

pub const DEFAULT_SESSION_NAME: &str = "_my_session_id";
pub const DEFAULT_EXCLUDED_PATHS: [&str; 4] = [
    "/api/v1/status/",
    "/api/v1/unauthorized/",
    "/api/v1/forbidden/",
    "/api/v1/auth_session/login/",
];

/// Which strategy guards the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    Auth,
    Basic,
    Session,
    SessionExpiry,
    SessionPersistent,
}

impl AuthType {
    pub const NAMES: [&'static str; 5] = [
        "auth",
        "basic_auth",
        "session_auth",
        "session_exp_auth",
        "session_db_auth",
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Basic => "basic_auth",
            Self::Session => "session_auth",
            Self::SessionExpiry => "session_exp_auth",
            Self::SessionPersistent => "session_db_auth",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auth" => Ok(Self::Auth),
            "basic_auth" => Ok(Self::Basic),
            "session_auth" => Ok(Self::Session),
            "session_exp_auth" => Ok(Self::SessionExpiry),
            "session_db_auth" => Ok(Self::SessionPersistent),
            other => Err(format!("unknown auth type: {other}")),
        }
    }
}

/// Parse a session duration in seconds.
///
/// Missing or unparsable values degrade to `0` (sessions never expire)
/// instead of failing startup.
#[must_use]
pub fn parse_session_duration(value: Option<&str>) -> i64 {
    let Some(raw) = value else {
        return 0;
    };
    raw.trim().parse::<i64>().unwrap_or_else(|_| {
        warn!("invalid session duration {raw:?}, sessions will not expire");
        0
    })
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    auth_type: Option<AuthType>,
    session_name: String,
    session_duration: i64,
    excluded_paths: ExcludedPaths,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            auth_type: None,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            session_duration: 0,
            excluded_paths: ExcludedPaths::new(DEFAULT_EXCLUDED_PATHS),
        }
    }

    #[must_use]
    pub const fn with_auth_type(mut self, auth_type: Option<AuthType>) -> Self {
        self.auth_type = auth_type;
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, name: String) -> Self {
        self.session_name = name;
        self
    }

    #[must_use]
    pub const fn with_session_duration(mut self, seconds: i64) -> Self {
        self.session_duration = seconds;
        self
    }

    #[must_use]
    pub fn with_excluded_paths(mut self, excluded_paths: ExcludedPaths) -> Self {
        self.excluded_paths = excluded_paths;
        self
    }

    #[must_use]
    pub const fn auth_type(&self) -> Option<AuthType> {
        self.auth_type
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Seconds; `<= 0` means sessions never expire.
    #[must_use]
    pub const fn session_duration(&self) -> i64 {
        self.session_duration
    }

    #[must_use]
    pub const fn excluded_paths(&self) -> &ExcludedPaths {
        &self.excluded_paths
    }
}
