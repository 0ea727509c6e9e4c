use axum::http::{header, HeaderMap};

/// Pick the capability token for a write request.
///
/// The `key` query parameter wins; otherwise an `Authorization: Bearer` header
/// is accepted. Empty values count as absent.
pub fn capability_token(query_key: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(key) = query_key.filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_query_key_preferred_over_header() {
        let token = capability_token(Some("from-query"), &bearer("from-header"));
        assert_eq!(token.as_deref(), Some("from-query"));
    }

    #[test]
    fn test_header_used_when_query_missing_or_empty() {
        assert_eq!(
            capability_token(None, &bearer("abc")).as_deref(),
            Some("abc")
        );
        assert_eq!(
            capability_token(Some(""), &bearer("abc")).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_absent_everywhere() {
        assert_eq!(capability_token(None, &HeaderMap::new()), None);
        assert_eq!(capability_token(Some(""), &HeaderMap::new()), None);
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(capability_token(None, &headers), None);
    }
}
