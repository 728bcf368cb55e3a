//! Tool registry: binds catalog entries to action handlers and dispatches invocations.
//!
//! A registry is assembled once at start-up with [`ToolRegistryBuilder`] and
//! is immutable afterwards. Each handler receives its arguments already
//! parsed into a typed parameter struct.
//!
//! # Example
//!
//! ```ignore
//! let registry = ToolRegistry::builder(Arc::new(client))
//!     .tool("get_record", "Get a record by ID", "getting record", get_record)
//!     .build()?;
//!
//! let outcome = registry.invoke("get_record", Some(args), ctx).await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rmcp::model::JsonObject;
use rmcp::schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::context::InvocationContext;
use crate::error::AppError;
use crate::mcp::protocol::ToolOutcome;
use crate::tools::catalog::{ToolCatalog, ToolDefinition};

/// Type-erased action handler stored in the registry.
type Action =
    Arc<dyn Fn(JsonObject, InvocationContext) -> BoxFuture<'static, Result<String, AppError>> + Send + Sync>;

/// Catalog plus action set for one adapter.
pub struct ToolRegistry {
    catalog: ToolCatalog,
    actions: HashMap<&'static str, Action>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.catalog.manifest())
            .finish()
    }
}

impl ToolRegistry {
    /// Starts a builder whose handlers share `state`.
    pub fn builder<S: ?Sized + Send + Sync + 'static>(state: Arc<S>) -> ToolRegistryBuilder<S> {
        ToolRegistryBuilder {
            state,
            definitions: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// The read-only tool catalog.
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Invokes a tool by name.
    ///
    /// Returns `Err` only for protocol-level failures: an unknown tool name or
    /// arguments that do not parse. Handler failures, including panics, come
    /// back as [`ToolOutcome::Failure`].
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        ctx: InvocationContext,
    ) -> Result<ToolOutcome, AppError> {
        let definition = self
            .catalog
            .get(name)
            .ok_or_else(|| AppError::ToolNotFound(name.to_string()))?;
        let action = self
            .actions
            .get(definition.name)
            .ok_or_else(|| AppError::ToolNotFound(name.to_string()))?;

        let arguments = arguments.unwrap_or_default();
        tracing::debug!(tool = %name, "Invoking tool");

        let result = AssertUnwindSafe(action(arguments, ctx)).catch_unwind().await;

        match result {
            Ok(Ok(text)) => Ok(ToolOutcome::Success(text)),
            Ok(Err(AppError::InvalidArguments(message))) => {
                tracing::debug!(tool = %name, %message, "Rejected tool arguments");
                Err(AppError::InvalidArguments(message))
            }
            Ok(Err(err)) => {
                tracing::warn!(tool = %name, error = %err, "Tool invocation failed");
                Ok(ToolOutcome::failure(definition.operation, err.to_string()))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(tool = %name, %message, "Tool handler panicked");
                Ok(ToolOutcome::failure(definition.operation, message))
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Parses raw arguments into a typed parameter struct.
pub fn parse_arguments<P: DeserializeOwned>(arguments: JsonObject) -> Result<P, AppError> {
    serde_json::from_value(serde_json::Value::Object(arguments))
        .map_err(|e| AppError::InvalidArguments(e.to_string()))
}

/// Builder collecting `(definition, handler)` pairs for a registry.
pub struct ToolRegistryBuilder<S: ?Sized> {
    state: Arc<S>,
    definitions: Vec<ToolDefinition>,
    actions: Vec<(&'static str, Action)>,
}

impl<S: ?Sized + Send + Sync + 'static> ToolRegistryBuilder<S> {
    /// Registers a tool whose arguments deserialize into `P`.
    pub fn tool<P, F, Fut>(
        mut self,
        name: &'static str,
        description: &'static str,
        operation: &'static str,
        handler: F,
    ) -> Self
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(Arc<S>, P, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, AppError>> + Send + 'static,
    {
        self.definitions
            .push(ToolDefinition::new::<P>(name, description, operation));

        let state = self.state.clone();
        let action: Action = Arc::new(move |arguments: JsonObject, ctx: InvocationContext| {
            match parse_arguments::<P>(arguments) {
                Ok(params) => handler(state.clone(), params, ctx).boxed(),
                Err(err) => futures::future::ready(Err(err)).boxed(),
            }
        });
        self.actions.push((name, action));
        self
    }

    /// Finalizes the registry, failing on duplicate tool names.
    pub fn build(self) -> Result<ToolRegistry, AppError> {
        let catalog = ToolCatalog::new(self.definitions)?;
        let actions = self.actions.into_iter().collect();
        Ok(ToolRegistry { catalog, actions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::schemars::{self, JsonSchema};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoParams {
        text: String,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct NoParams {}

    struct Prefix(&'static str);

    async fn echo(state: Arc<Prefix>, p: EchoParams, ctx: InvocationContext) -> Result<String, AppError> {
        let token = ctx.auth_token.unwrap_or_default();
        Ok(format!("{}{}{}", state.0, p.text, token))
    }

    async fn fail(_: Arc<Prefix>, _: NoParams, _: InvocationContext) -> Result<String, AppError> {
        Err(AppError::Api {
            status: 500,
            message: "upstream exploded".into(),
        })
    }

    async fn explode(_: Arc<Prefix>, _: NoParams, _: InvocationContext) -> Result<String, AppError> {
        panic!("handler bug")
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::builder(Arc::new(Prefix("> ")))
            .tool("echo", "Echo text", "echoing text", echo)
            .tool("fail", "Always fails", "calling upstream", fail)
            .tool("explode", "Panics", "exploding", explode)
            .build()
            .unwrap()
    }

    fn args(value: serde_json::Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    #[tokio::test]
    async fn test_success_passes_text_through() {
        let ctx = InvocationContext {
            auth_token: Some("!".into()),
            graphql_url: None,
        };
        let outcome = registry()
            .invoke("echo", args(json!({"text": "hi"})), ctx)
            .await
            .unwrap();
        assert_eq!(outcome, ToolOutcome::Success("> hi!".into()));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let err = registry()
            .invoke("missing", None, InvocationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ToolNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_absent_arguments_become_empty_object() {
        let outcome = registry()
            .invoke("fail", None, InvocationContext::default())
            .await
            .unwrap();
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_missing_required_field_is_rejected() {
        let err = registry()
            .invoke("echo", None, InvocationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArguments(msg) if msg.contains("text")));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_error_envelope() {
        let outcome = registry()
            .invoke("fail", args(json!({})), InvocationContext::default())
            .await
            .unwrap();
        assert_eq!(
            outcome.text(),
            "Error calling upstream: API error (500): upstream exploded"
        );
    }

    #[tokio::test]
    async fn test_handler_panic_is_caught() {
        let outcome = registry()
            .invoke("explode", None, InvocationContext::default())
            .await
            .unwrap();
        assert!(outcome.text().starts_with("Error exploding: "));
        assert!(outcome.text().contains("handler bug"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = ToolRegistry::builder(Arc::new(Prefix("")))
            .tool("echo", "Echo text", "echoing text", echo)
            .tool("echo", "Echo again", "echoing text", echo)
            .build();
        assert!(matches!(result, Err(AppError::DuplicateTool(_))));
    }
}
