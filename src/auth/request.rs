//! Read-only view over an inbound request.

use axum::http::{header, request::Parts, HeaderMap, Request};

/// What the authenticators need from a request.
pub trait AuthRequest {
    fn path(&self) -> &str;

    fn headers(&self) -> &HeaderMap;

    /// Raw `Authorization` header value.
    fn authorization(&self) -> Option<&str> {
        self.headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Value of the cookie `name`, searching every `Cookie` header.
    fn cookie(&self, name: &str) -> Option<&str> {
        self.headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                (key.trim() == name).then(|| value.trim())
            })
    }
}

impl AuthRequest for Parts {
    fn path(&self) -> &str {
        self.uri.path()
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl<B> AuthRequest for Request<B> {
    fn path(&self) -> &str {
        self.uri().path()
    }

    fn headers(&self) -> &HeaderMap {
        Request::headers(self)
    }
}
