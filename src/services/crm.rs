//! REST client for the CRM API.
//!
//! Every request is authorized with the caller's bearer token, or with the
//! configured API key when the caller supplied none.

use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use url::Url;

use crate::config::CrmConfig;
use crate::context::InvocationContext;
use crate::error::AppError;

/// HTTP client for the CRM `/v2` API.
#[derive(Debug, Clone)]
pub struct CrmClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    /// Object type assumed for notes, tasks and comments when none is given.
    pub default_object: String,
    /// Upper bound for paginated `limit` arguments.
    pub search_limit: u32,
}

impl CrmClient {
    /// Creates a client from configuration.
    pub fn new(config: &CrmConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::Internal(format!("invalid CRM base URL: {}", e)))?;

        Ok(Self {
            http: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            default_object: config.default_object.clone(),
            search_limit: config.search_limit,
        })
    }

    /// Builds a URL from unescaped path segments.
    fn url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("CRM base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        ctx: &InvocationContext,
    ) -> Result<RequestBuilder, AppError> {
        let token = ctx.token_or(self.api_key.as_deref()).ok_or_else(|| {
            AppError::MissingCredential(
                "CRM API key is required: send an `Authorization: Bearer <key>` header or set crm.api_key"
                    .to_string(),
            )
        })?;

        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "CRM request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(request: RequestBuilder) -> Result<Value, AppError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Executes a GET request.
    pub async fn get(
        &self,
        ctx: &InvocationContext,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, AppError> {
        Self::send(self.request(Method::GET, segments, ctx)?.query(query)).await
    }

    /// Executes a POST request with a JSON body.
    pub async fn post(
        &self,
        ctx: &InvocationContext,
        segments: &[&str],
        body: &Value,
    ) -> Result<Value, AppError> {
        Self::send(self.request(Method::POST, segments, ctx)?.json(body)).await
    }

    /// Executes a PATCH request with a JSON body.
    pub async fn patch(
        &self,
        ctx: &InvocationContext,
        segments: &[&str],
        body: &Value,
    ) -> Result<Value, AppError> {
        Self::send(self.request(Method::PATCH, segments, ctx)?.json(body)).await
    }

    /// Executes a PUT request with query parameters and a JSON body.
    pub async fn put(
        &self,
        ctx: &InvocationContext,
        segments: &[&str],
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, AppError> {
        Self::send(self.request(Method::PUT, segments, ctx)?.query(query).json(body)).await
    }

    /// Executes a DELETE request, discarding any response body.
    pub async fn delete(&self, ctx: &InvocationContext, segments: &[&str]) -> Result<(), AppError> {
        Self::send(self.request(Method::DELETE, segments, ctx)?).await?;
        Ok(())
    }
}

/// Extracts the `message` field from an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, api_key: Option<&str>) -> CrmClient {
        CrmClient::new(&CrmConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
            ..CrmConfig::default()
        })
        .unwrap()
    }

    fn ctx(token: &str) -> InvocationContext {
        InvocationContext {
            auth_token: Some(token.to_string()),
            graphql_url: None,
        }
    }

    #[tokio::test]
    async fn test_get_uses_request_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/objects"))
            .and(header("Authorization", "Bearer request-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let crm = client(&server.uri(), Some("config-key"));
        let result = crm.get(&ctx("request-key"), &["v2", "objects"], &[]).await.unwrap();
        assert_eq!(result, json!({"data": []}));
    }

    #[tokio::test]
    async fn test_falls_back_to_configured_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/self"))
            .and(header("Authorization", "Bearer config-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": true})))
            .mount(&server)
            .await;

        let crm = client(&server.uri(), Some("config-key"));
        let result = crm
            .get(&InvocationContext::default(), &["v2", "self"], &[])
            .await
            .unwrap();
        assert_eq!(result["active"], true);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_request() {
        let crm = client("http://127.0.0.1:9", None);
        let err = crm
            .get(&InvocationContext::default(), &["v2", "self"], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_put_sends_query_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/objects/people/records"))
            .and(query_param("matching_attribute", "email_addresses"))
            .and(body_json(json!({"data": {"values": {"name": "Ada"}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 1}})))
            .mount(&server)
            .await;

        let crm = client(&server.uri(), None);
        let result = crm
            .put(
                &ctx("k"),
                &["v2", "objects", "people", "records"],
                &[("matching_attribute", "email_addresses".to_string())],
                &json!({"data": {"values": {"name": "Ada"}}}),
            )
            .await
            .unwrap();
        assert_eq!(result["data"]["id"], 1);
    }

    #[tokio::test]
    async fn test_error_status_extracts_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/objects/unknown/attributes"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"status_code": 404, "message": "Object not found"})),
            )
            .mount(&server)
            .await;

        let crm = client(&server.uri(), None);
        let err = crm
            .get(&ctx("k"), &["v2", "objects", "unknown", "attributes"], &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error (404): Object not found");
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v2/notes/n-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let crm = client(&server.uri(), None);
        crm.delete(&ctx("k"), &["v2", "notes", "n-1"]).await.unwrap();
    }

    #[test]
    fn test_segments_are_escaped() {
        let crm = client("https://crm.example.com", None);
        let url = crm.url(&["v2", "objects", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "https://crm.example.com/v2/objects/a%20b%2Fc");
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("gateway timeout "), "gateway timeout");
    }
}
