use super::request::AuthRequest;

/// Behavior shared by every strategy: header and cookie extraction.
///
/// On its own it never resolves a principal, so every path that is not
/// excluded is denied.
#[derive(Clone, Debug)]
pub struct Auth {
    session_name: String,
}

impl Auth {
    #[must_use]
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
        }
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// The `Authorization` header, verbatim. An empty header counts as absent.
    pub fn authorization_header<'r, R: AuthRequest + ?Sized>(&self, request: &'r R) -> Option<&'r str> {
        request.authorization().filter(|value| !value.is_empty())
    }

    /// The configured session cookie. An empty value counts as absent.
    pub fn session_cookie<'r, R: AuthRequest + ?Sized>(&self, request: &'r R) -> Option<&'r str> {
        request
            .cookie(&self.session_name)
            .filter(|value| !value.is_empty())
    }
}
