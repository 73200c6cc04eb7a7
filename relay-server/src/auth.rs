//! The auth provider interface and a placeholder implementation.
//!
//! Grounded on `original_source/auth/auth.go`, which declares the interface
//! with no production implementation checked into this slice of the source
//! (the real backend lives outside the retrieved tree). `NoopAuthProvider`
//! extracts the uid from a request header and accepts every request,
//! matching the "placeholder, not a security boundary" shape of the
//! original's own stub.

use async_trait::async_trait;
use axum::http::HeaderMap;
use engine::EngineError;

/// Verifies credentials on a request and extracts the authenticated uid.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Checks that `headers` authenticate successfully. Returns the uid on
    /// success.
    async fn authenticate_request(&self, headers: &HeaderMap) -> Result<String, EngineError>;

    /// Extracts the uid without performing a full authentication pass —
    /// used on the upgrade path, where no separate authenticated context is
    /// threaded through.
    async fn uid_from_request(&self, headers: &HeaderMap) -> Result<String, EngineError>;
}

/// Trusts a single `x-player-id` header. Suitable for local development
/// only; a real deployment replaces this with a provider backed by the
/// identity system referenced by `original_source/auth/auth.go`.
pub struct NoopAuthProvider;

const PLAYER_ID_HEADER: &str = "x-player-id";

fn extract(headers: &HeaderMap) -> Result<String, EngineError> {
    headers
        .get(PLAYER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EngineError::Unauthorized(format!("missing {PLAYER_ID_HEADER} header")))
}

#[async_trait]
impl AuthProvider for NoopAuthProvider {
    async fn authenticate_request(&self, headers: &HeaderMap) -> Result<String, EngineError> {
        extract(headers)
    }

    async fn uid_from_request(&self, headers: &HeaderMap) -> Result<String, EngineError> {
        extract(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_request_without_header() {
        let headers = HeaderMap::new();
        let result = NoopAuthProvider.authenticate_request(&headers).await;
        assert!(matches!(result, Err(EngineError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn accepts_request_with_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-player-id", "p1".parse().unwrap());
        let uid = NoopAuthProvider.authenticate_request(&headers).await.unwrap();
        assert_eq!(uid, "p1");
    }
}
