//! Client for user-supplied GraphQL endpoints.

use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::GraphqlConfig;
use crate::context::InvocationContext;
use crate::error::AppError;

/// Standard introspection query used for schema discovery.
pub const INTROSPECTION_QUERY: &str = r#"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types {
      kind
      name
      description
      fields(includeDeprecated: true) {
        name
        description
        args { name type { ...TypeRef } defaultValue }
        type { ...TypeRef }
        isDeprecated
        deprecationReason
      }
      inputFields { name type { ...TypeRef } defaultValue }
      enumValues(includeDeprecated: true) { name description isDeprecated }
      possibleTypes { name }
    }
  }
}

fragment TypeRef on __Type {
  kind
  name
  ofType { kind name ofType { kind name ofType { kind name ofType { kind name } } } }
}
"#;

/// Query describing a single named type.
pub const TYPE_QUERY: &str = r#"
query DescribeType($name: String!) {
  __type(name: $name) {
    kind
    name
    description
    fields(includeDeprecated: true) {
      name
      description
      args { name description type { kind name ofType { kind name ofType { kind name } } } }
      type { kind name ofType { kind name ofType { kind name } } }
    }
    inputFields { name description type { kind name ofType { kind name } } }
    enumValues(includeDeprecated: true) { name description }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Map<String, Value>>,
}

/// Sends GraphQL documents to the endpoint named by the invocation context.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: Client,
    default_url: Option<String>,
}

impl GraphqlClient {
    pub fn new(config: &GraphqlConfig) -> Self {
        Self {
            http: Client::new(),
            default_url: config.default_url.clone(),
        }
    }

    /// Resolves the endpoint: `X-GraphQL-URL` header first, then configuration.
    pub fn endpoint<'a>(&'a self, ctx: &'a InvocationContext) -> Result<&'a str, AppError> {
        ctx.graphql_url
            .as_deref()
            .or(self.default_url.as_deref())
            .ok_or_else(|| {
                AppError::MissingCredential(
                    "GraphQL endpoint is required: send an `X-GraphQL-URL` header or set graphql.default_url"
                        .to_string(),
                )
            })
    }

    /// Executes a document and returns its `data` member.
    ///
    /// A response carrying a non-empty `errors` array is treated as a failure
    /// even when partial data is present.
    pub async fn execute(
        &self,
        ctx: &InvocationContext,
        query: &str,
        variables: Option<&Map<String, Value>>,
    ) -> Result<Value, AppError> {
        let endpoint = self.endpoint(ctx)?;
        tracing::debug!(%endpoint, "GraphQL request");

        let mut request = self
            .http
            .post(endpoint)
            .json(&GraphqlRequest { query, variables });
        if let Some(token) = &ctx.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let payload: Value = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(AppError::Api {
                    status: status.as_u16(),
                    message: body.trim().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(AppError::GraphQl(join_error_messages(errors)));
            }
        }

        if !status.is_success() {
            return Err(AppError::Api {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        Ok(payload.get("data").cloned().unwrap_or(Value::Null))
    }
}

fn join_error_messages(errors: &[Value]) -> String {
    errors
        .iter()
        .map(|e| {
            e.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string())
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Kind of the first operation in a GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Detects the first operation keyword in a document, skipping comments,
/// string literals and fragments.
///
/// A document starting with `{` is a shorthand query. Keywords are names, so
/// `mutation{ .. }` and `mutation M($x: Int)` are both recognised.
pub fn operation_kind(document: &str) -> OperationKind {
    let mut depth = 0usize;
    let mut first = true;
    let mut chars = document.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '#' => {
                while chars.next_if(|&n| n != '\n').is_some() {}
            }
            '"' => {
                while let Some(n) = chars.next() {
                    match n {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
                first = false;
            }
            '{' | '(' | '[' => {
                if first && c == '{' {
                    return OperationKind::Query;
                }
                first = false;
                depth += 1;
            }
            '}' | ')' | ']' => depth = depth.saturating_sub(1),
            '$' => {
                while chars.next_if(|&n| n.is_alphanumeric() || n == '_').is_some() {}
                first = false;
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::from(c);
                while let Some(n) = chars.next_if(|&n| n.is_alphanumeric() || n == '_') {
                    name.push(n);
                }
                first = false;

                if depth == 0 {
                    match name.as_str() {
                        "mutation" => return OperationKind::Mutation,
                        "subscription" => return OperationKind::Subscription,
                        "query" => return OperationKind::Query,
                        _ => {}
                    }
                }
            }
            c if c.is_whitespace() || c == ',' => {}
            _ => first = false,
        }
    }
    OperationKind::Query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx(url: Option<String>, token: Option<&str>) -> InvocationContext {
        InvocationContext {
            auth_token: token.map(str::to_string),
            graphql_url: url,
        }
    }

    #[tokio::test]
    async fn test_execute_returns_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("Authorization", "Bearer t"))
            .and(body_partial_json(json!({"query": "{ viewer { login } }"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"viewer": {"login": "ada"}}})),
            )
            .mount(&server)
            .await;

        let client = GraphqlClient::new(&GraphqlConfig::default());
        let data = client
            .execute(
                &ctx(Some(format!("{}/graphql", server.uri())), Some("t")),
                "{ viewer { login } }",
                None,
            )
            .await
            .unwrap();
        assert_eq!(data["viewer"]["login"], "ada");
    }

    #[tokio::test]
    async fn test_error_array_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{"message": "Cannot query field \"nope\""}, {"message": "second"}]
            })))
            .mount(&server)
            .await;

        let client = GraphqlClient::new(&GraphqlConfig::default());
        let err = client
            .execute(&ctx(Some(server.uri()), None), "{ nope }", None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Cannot query field \"nope\"; second"
        );
    }

    #[tokio::test]
    async fn test_non_json_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = GraphqlClient::new(&GraphqlConfig::default());
        let err = client
            .execute(&ctx(Some(server.uri()), None), "{ a }", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api { status: 502, .. }));
    }

    #[test]
    fn test_endpoint_resolution() {
        let client = GraphqlClient::new(&GraphqlConfig {
            default_url: Some("https://fallback/graphql".into()),
        });
        assert_eq!(
            client.endpoint(&ctx(Some("https://header/graphql".into()), None)).unwrap(),
            "https://header/graphql"
        );
        assert_eq!(
            client.endpoint(&ctx(None, None)).unwrap(),
            "https://fallback/graphql"
        );

        let bare = GraphqlClient::new(&GraphqlConfig::default());
        assert!(matches!(
            bare.endpoint(&ctx(None, None)),
            Err(AppError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_operation_kind_detection() {
        assert_eq!(operation_kind("{ users { id } }"), OperationKind::Query);
        assert_eq!(operation_kind("query Q { a }"), OperationKind::Query);
        assert_eq!(
            operation_kind("# comment mutation\nmutation Add($x: Int) { add(x: $x) }"),
            OperationKind::Mutation
        );
        assert_eq!(
            operation_kind("fragment F on User { id }\nmutation M { a { ...F } }"),
            OperationKind::Mutation
        );
        assert_eq!(
            operation_kind("subscription { ticks }"),
            OperationKind::Subscription
        );
    }

    #[test]
    fn test_operation_kind_without_whitespace() {
        assert_eq!(
            operation_kind("mutation{ deleteAll { ok } }"),
            OperationKind::Mutation
        );
        assert_eq!(operation_kind("mutation M{ deleteAll }"), OperationKind::Mutation);
        assert_eq!(operation_kind("query{ users { id } }"), OperationKind::Query);
        assert_eq!(
            operation_kind("subscription{ ticks }"),
            OperationKind::Subscription
        );
        assert_eq!(
            operation_kind("mutation@audit{ deleteAll }"),
            OperationKind::Mutation
        );
    }

    #[test]
    fn test_operation_kind_ignores_names_in_strings_and_selections() {
        assert_eq!(
            operation_kind("{ search(text: \"mutation { x }\") { mutation } }"),
            OperationKind::Query
        );
        assert_eq!(
            operation_kind("fragment F on Query { mutation }\nsubscription S { ticks }"),
            OperationKind::Subscription
        );
    }
}
