//! JSON-RPC 2.0 envelopes and dispatch.
//!
//! The wire contract follows the 2.0 spec: requests are
//! `{jsonrpc: "2.0", method, params, id}` objects, responses carry either
//! `result` or `error: {code, message, data}`, and a JSON array in produces
//! an array of responses in the same order. Requests without an `id` are
//! notifications and produce no response entry.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::error::{ReservedCodeError, check_application_code};
use crate::registry::{MethodRegistry, RegistryError};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// A JSON-RPC error object.
///
/// Application handlers build these through [`JsonRpcError::application`],
/// which rejects the protocol-reserved code space at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Build an application-level error. Reserved protocol codes are
    /// rejected; code 0 and anything outside -32768..-32000 is fine.
    pub fn application(code: i64, message: impl Into<String>, data: Option<Value>) -> Result<Self, ReservedCodeError> {
        check_application_code(code)?;
        Ok(Self { code, message: message.into(), data })
    }

    fn protocol(code: i64, message: &str, data: Option<Value>) -> Self {
        Self { code, message: message.to_string(), data }
    }

    fn parse_error(detail: impl ToString) -> Self {
        Self::protocol(PARSE_ERROR, "Parse error", Some(Value::String(detail.to_string())))
    }

    fn invalid_request(detail: &str) -> Self {
        Self::protocol(INVALID_REQUEST, "Invalid Request", Some(Value::String(detail.to_string())))
    }

    fn method_not_found() -> Self {
        Self::protocol(METHOD_NOT_FOUND, "Method not found", None)
    }

    fn invalid_params(detail: &str) -> Self {
        Self::protocol(INVALID_PARAMS, "Invalid params", Some(Value::String(detail.to_string())))
    }

    fn internal_error() -> Self {
        Self::protocol(INTERNAL_ERROR, "Internal error", None)
    }
}

/// Parameters passed to a method handler.
///
/// A JSON array maps to positional parameters, an object to named ones;
/// an absent `params` member is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

/// An async JSON-RPC method handler.
#[async_trait]
pub trait JsonRpcMethod: Send + Sync {
    async fn invoke(&self, params: Params) -> Result<Value, JsonRpcError>;
}

struct FnMethod<F>(F);

#[async_trait]
impl<F> JsonRpcMethod for FnMethod<F>
where
    F: Fn(Params) -> BoxFuture<'static, Result<Value, JsonRpcError>> + Send + Sync,
{
    async fn invoke(&self, params: Params) -> Result<Value, JsonRpcError> {
        (self.0)(params).await
    }
}

/// Adapt an async closure into a [`JsonRpcMethod`].
pub fn method_fn<F, Fut>(f: F) -> impl JsonRpcMethod
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, JsonRpcError>> + Send + 'static,
{
    FnMethod(move |params| Box::pin(f(params)) as BoxFuture<'static, _>)
}

/// A JSON-RPC 2.0 dispatcher over a [`MethodRegistry`].
#[derive(Default)]
pub struct JsonRpcServer {
    registry: MethodRegistry<Box<dyn JsonRpcMethod>>,
}

impl std::fmt::Debug for JsonRpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcServer").finish_non_exhaustive()
    }
}

impl JsonRpcServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M: JsonRpcMethod + 'static>(&mut self, name: impl Into<String>, method: M) -> Result<(), RegistryError> {
        self.registry.register(name, Box::new(method))
    }

    /// Attach another server's methods under a dot-separated prefix.
    pub fn attach(&mut self, prefix: &str, other: JsonRpcServer) -> Result<(), RegistryError> {
        self.registry.attach(prefix, other.registry)
    }

    /// Handle a serialized request body, returning the serialized response
    /// body. `None` means nothing is to be sent (the input consisted only
    /// of notifications).
    pub async fn handle(&self, body: &[u8]) -> Option<Vec<u8>> {
        let parsed: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                debug!(cause = %e, "json-rpc body failed to parse");
                let response = error_response(Value::Null, &JsonRpcError::parse_error(e));
                return serde_json::to_vec(&response).ok();
            }
        };

        let response = match parsed {
            Value::Array(requests) => {
                if requests.is_empty() {
                    error_response(Value::Null, &JsonRpcError::invalid_request("batch must not be empty"))
                } else {
                    let mut responses = Vec::with_capacity(requests.len());
                    for request in requests {
                        if let Some(response) = self.handle_one(request).await {
                            responses.push(response);
                        }
                    }
                    if responses.is_empty() {
                        return None;
                    }
                    Value::Array(responses)
                }
            }
            request => self.handle_one(request).await?,
        };

        serde_json::to_vec(&response).ok()
    }

    /// Handle one request object. Returns `None` for notifications.
    async fn handle_one(&self, request: Value) -> Option<Value> {
        let Value::Object(request) = request else {
            return Some(error_response(Value::Null, &JsonRpcError::invalid_request("the request must be an object")));
        };

        let id = request.get("id").cloned();
        let error_id = id.clone().unwrap_or(Value::Null);
        let is_notification = id.is_none();

        let respond = |response: Value| if is_notification { None } else { Some(response) };

        match request.get("jsonrpc").and_then(Value::as_str) {
            Some("2.0") => {}
            other => {
                let detail = format!("cannot handle protocol version {}", other.unwrap_or("1.0"));
                return respond(error_response(error_id, &JsonRpcError::invalid_request(&detail)));
            }
        }

        let method = match request.get("method").and_then(Value::as_str) {
            Some(method) if !method.is_empty() => method,
            _ => {
                return respond(error_response(error_id, &JsonRpcError::invalid_request("\"method\" must not be empty")));
            }
        };

        let params = match request.get("params") {
            None | Some(Value::Null) => Params::None,
            Some(Value::Array(values)) => Params::Array(values.clone()),
            Some(Value::Object(map)) => Params::Object(map.clone()),
            Some(_) => {
                return respond(error_response(
                    error_id,
                    &JsonRpcError::invalid_params("\"params\" must be an array or object"),
                ));
            }
        };

        let Some(handler) = self.registry.route(method) else {
            debug!(method, "json-rpc method not found");
            return respond(error_response(error_id, &JsonRpcError::method_not_found()));
        };

        // A handler panic must not tear down the dispatch loop; the caller
        // gets an internal error instead.
        match AssertUnwindSafe(handler.invoke(params)).catch_unwind().await {
            Ok(Ok(result)) => respond(json!({"jsonrpc": "2.0", "result": result, "id": id})),
            Ok(Err(error)) => respond(error_response(error_id, &error)),
            Err(_) => {
                error!(method, "json-rpc handler panicked");
                respond(error_response(error_id, &JsonRpcError::internal_error()))
            }
        }
    }
}

fn error_response(id: Value, error: &JsonRpcError) -> Value {
    json!({"jsonrpc": "2.0", "error": error, "id": id})
}
