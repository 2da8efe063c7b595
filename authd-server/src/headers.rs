//! Response-caching directives for credential-bearing responses.

use axum::response::Response;
use http::header::{CACHE_CONTROL, PRAGMA};
use http::HeaderValue;

/// Mark a response as uncacheable. Token and revocation responses carry
/// credentials and must never land in a shared cache (RFC 6749 §5.1).
pub fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_no_store_directives() {
        let response = no_store("ok".into_response());
        assert_eq!(
            response.headers().get(CACHE_CONTROL).unwrap(),
            &HeaderValue::from_static("no-store")
        );
        assert_eq!(
            response.headers().get(PRAGMA).unwrap(),
            &HeaderValue::from_static("no-cache")
        );
    }
}
