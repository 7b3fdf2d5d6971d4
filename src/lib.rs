//! # Turnstile
//!
//! `turnstile` decides, once per inbound request, whether credentials are
//! required, extracts them, resolves the current principal and manages the
//! server-side session lifecycle.
//!
//! ## Strategies
//!
//! The strategy is picked once at startup and never changes afterwards:
//!
//! - `auth`: every non-excluded path requires credentials, none ever resolve.
//! - `basic_auth`: `Authorization: Basic <base64(email:password)>`.
//! - `session_auth`: in-memory `session id -> user id` map read from a cookie.
//! - `session_exp_auth`: same map, entries expire after a configured duration.
//! - `session_db_auth`: sessions live in a durable store and expired records
//!   are deleted when they are found.
//!
//! Denial is a normal outcome, not a fault: the core collapses every parsing,
//! lookup and storage failure into "no principal", and only the request gate
//! turns that into `401 Unauthorized` or `403 Forbidden`.

pub mod accounts;
pub mod auth;
pub mod cli;
pub mod store;
pub mod turnstile;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }
}
