//! Per-invocation context built from transport metadata.

use http::HeaderMap;

/// Custom header carrying the target endpoint for the GraphQL adapter.
pub const GRAPHQL_URL_HEADER: &str = "x-graphql-url";

/// Credentials and routing hints extracted from a single tool invocation.
///
/// Created fresh per request from transport headers and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// Bearer token from the `Authorization` header, if any.
    pub auth_token: Option<String>,
    /// Target endpoint from the `X-GraphQL-URL` header, if any.
    pub graphql_url: Option<String>,
}

impl InvocationContext {
    /// Builds a context from HTTP request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let auth_token = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let graphql_url = headers
            .get(GRAPHQL_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Self {
            auth_token,
            graphql_url,
        }
    }

    /// Returns the bearer token, falling back to a configured credential.
    pub fn token_or<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.auth_token.as_deref().or(fallback)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_from_headers_extracts_token_and_url() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        headers.insert(
            "X-GraphQL-URL",
            HeaderValue::from_static("https://example.com/graphql"),
        );

        let ctx = InvocationContext::from_headers(&headers);
        assert_eq!(ctx.auth_token.as_deref(), Some("abc123"));
        assert_eq!(
            ctx.graphql_url.as_deref(),
            Some("https://example.com/graphql")
        );
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));

        let ctx = InvocationContext::from_headers(&headers);
        assert_eq!(ctx, InvocationContext::default());
    }

    #[test]
    fn test_token_or_prefers_request_token() {
        let ctx = InvocationContext {
            auth_token: Some("request".into()),
            graphql_url: None,
        };
        assert_eq!(ctx.token_or(Some("config")), Some("request"));
        assert_eq!(
            InvocationContext::default().token_or(Some("config")),
            Some("config")
        );
        assert_eq!(InvocationContext::default().token_or(None), None);
    }
}
