//! Bearer-token authentication
//!
//! A single static token configured at startup; a request is authorized iff
//! its `Authorization` header equals `Bearer <token>` verbatim.

use axum::http::{header, HeaderMap};
use gate_core::{Error, Result};

/// The process-wide shared secret
#[derive(Debug, Clone)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Check the request's bearer credential
    pub fn authorize(&self, headers: &HeaderMap) -> Result<()> {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(Error::Unauthorized)?;

        if presented == format!("Bearer {}", self.0) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_exact_match_authorized() {
        let token = AuthToken::new("secret");
        assert!(token.authorize(&headers_with("Bearer secret")).is_ok());
    }

    #[test]
    fn test_missing_header_unauthorized() {
        let token = AuthToken::new("secret");
        let err = token.authorize(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[test]
    fn test_mismatch_unauthorized() {
        let token = AuthToken::new("secret");
        assert!(token.authorize(&headers_with("Bearer wrong")).is_err());
        // Scheme matters as much as the token itself
        assert!(token.authorize(&headers_with("secret")).is_err());
        assert!(token.authorize(&headers_with("bearer secret")).is_err());
    }
}
