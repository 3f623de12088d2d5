//! XML-RPC envelopes and dispatch.
//!
//! A call is a `<methodCall>` document with a `<methodName>` and optional
//! `<params>`; the response is a `<methodResponse>` carrying either a
//! `<params>` element with the result value or a `<fault>` struct with
//! `faultCode` and `faultString` members. Fault codes share the reserved
//! protocol space with JSON-RPC.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use quick_xml::escape::partial_escape;
use tracing::{debug, error};

use crate::error::{ReservedCodeError, check_application_code};
use crate::jsonrpc::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
use crate::registry::{MethodRegistry, RegistryError};

mod value;

pub use value::{ValueError, XmlValue, deserialize, serialize};

use value::{Element, parse_document, value_from_element};

/// An XML-RPC fault.
///
/// Application handlers build these through [`XmlRpcFault::application`],
/// which rejects the protocol-reserved code space at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlRpcFault {
    pub code: i64,
    pub message: String,
}

impl XmlRpcFault {
    /// Build an application-level fault. Reserved protocol codes are
    /// rejected.
    pub fn application(code: i64, message: impl Into<String>) -> Result<Self, ReservedCodeError> {
        check_application_code(code)?;
        Ok(Self { code, message: message.into() })
    }

    fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// An async XML-RPC method handler.
#[async_trait]
pub trait XmlRpcMethod: Send + Sync {
    async fn invoke(&self, params: Vec<XmlValue>) -> Result<XmlValue, XmlRpcFault>;
}

struct FnMethod<F>(F);

#[async_trait]
impl<F> XmlRpcMethod for FnMethod<F>
where
    F: Fn(Vec<XmlValue>) -> BoxFuture<'static, Result<XmlValue, XmlRpcFault>> + Send + Sync,
{
    async fn invoke(&self, params: Vec<XmlValue>) -> Result<XmlValue, XmlRpcFault> {
        (self.0)(params).await
    }
}

/// Adapt an async closure into an [`XmlRpcMethod`].
pub fn method_fn<F, Fut>(f: F) -> impl XmlRpcMethod
where
    F: Fn(Vec<XmlValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<XmlValue, XmlRpcFault>> + Send + 'static,
{
    FnMethod(move |params| Box::pin(f(params)) as BoxFuture<'static, _>)
}

/// An XML-RPC dispatcher over a [`MethodRegistry`].
#[derive(Default)]
pub struct XmlRpcServer {
    registry: MethodRegistry<Box<dyn XmlRpcMethod>>,
}

impl std::fmt::Debug for XmlRpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlRpcServer").finish_non_exhaustive()
    }
}

impl XmlRpcServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M: XmlRpcMethod + 'static>(&mut self, name: impl Into<String>, method: M) -> Result<(), RegistryError> {
        self.registry.register(name, Box::new(method))
    }

    /// Attach another server's methods under a dot-separated prefix.
    pub fn attach(&mut self, prefix: &str, other: XmlRpcServer) -> Result<(), RegistryError> {
        self.registry.attach(prefix, other.registry)
    }

    /// Handle a serialized `<methodCall>` body, returning the serialized
    /// `<methodResponse>` body. XML-RPC has no notifications, so there is
    /// always a response.
    pub async fn handle(&self, body: &[u8]) -> Vec<u8> {
        let (method, params) = match parse_method_call(body) {
            Ok(call) => call,
            Err(fault) => return render_fault(&fault).into_bytes(),
        };

        let Some(handler) = self.registry.route(&method) else {
            debug!(method, "xml-rpc method not found");
            return render_fault(&XmlRpcFault::protocol(METHOD_NOT_FOUND, "Method not found")).into_bytes();
        };

        // A handler panic must not tear down the dispatch loop; the caller
        // gets an internal fault instead.
        let response = match AssertUnwindSafe(handler.invoke(params)).catch_unwind().await {
            Ok(Ok(result)) => match serialize(&result) {
                Ok(value) => render_success(&value),
                Err(e) => {
                    debug!(cause = %e, "xml-rpc result failed to serialize");
                    render_fault(&XmlRpcFault::protocol(INTERNAL_ERROR, format!("unserializable result: {e}")))
                }
            },
            Ok(Err(fault)) => render_fault(&fault),
            Err(_) => {
                error!(method, "xml-rpc handler panicked");
                render_fault(&XmlRpcFault::protocol(INTERNAL_ERROR, "Internal error"))
            }
        };
        response.into_bytes()
    }
}

fn parse_method_call(body: &[u8]) -> Result<(String, Vec<XmlValue>), XmlRpcFault> {
    let body = std::str::from_utf8(body)
        .map_err(|e| XmlRpcFault::protocol(PARSE_ERROR, format!("Parse error: {e}")))?;
    let document = parse_document(body)
        .map_err(|e| XmlRpcFault::protocol(PARSE_ERROR, format!("Parse error: {e}")))?;

    if document.tag != "methodCall" {
        return Err(XmlRpcFault::protocol(
            INVALID_REQUEST,
            format!("expected a methodCall document, got <{}>", document.tag),
        ));
    }

    let method = match document.child("methodName").map(|name| name.text.trim()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(XmlRpcFault::protocol(INVALID_REQUEST, "methodName must not be empty")),
    };

    let params = match document.child("params") {
        None => Vec::new(),
        Some(params) => params
            .children
            .iter()
            .filter(|child| child.tag == "param")
            .map(parse_param)
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok((method, params))
}

fn parse_param(param: &Element) -> Result<XmlValue, XmlRpcFault> {
    let value = param
        .child("value")
        .ok_or_else(|| XmlRpcFault::protocol(INVALID_PARAMS, "param without a value"))?;
    value_from_element(value).map_err(|e| XmlRpcFault::protocol(INVALID_PARAMS, format!("invalid parameter: {e}")))
}

fn render_success(value_xml: &str) -> String {
    format!("<?xml version=\"1.0\"?>\n<methodResponse><params><param>{value_xml}</param></params></methodResponse>")
}

fn render_fault(fault: &XmlRpcFault) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse><fault><value><struct>\
         <member><name>faultCode</name><value><i4>{}</i4></value></member>\
         <member><name>faultString</name><value><string>{}</string></value></member>\
         </struct></value></fault></methodResponse>",
        fault.code,
        partial_escape(&fault.message),
    )
}
