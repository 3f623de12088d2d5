use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode};
use mime::Mime;

use plinth_rpc::jsonrpc::JsonRpcServer;

use crate::handler::{BoxError, RequestHandler};
use crate::request::RequestContext;

use super::{body_response, post_only_rejection, wrong_content_type};

/// Serves a [`JsonRpcServer`] over HTTP POST with `application/json` bodies.
///
/// A batch of only notifications produces 204 No Content, since the
/// dispatcher has no response body to send.
#[derive(Debug)]
pub struct JsonRpcEndpoint {
    server: JsonRpcServer,
}

impl JsonRpcEndpoint {
    pub fn new(server: JsonRpcServer) -> Self {
        Self { server }
    }
}

#[async_trait]
impl RequestHandler for JsonRpcEndpoint {
    async fn invoke(&self, request: RequestContext) -> Result<Response<Bytes>, BoxError> {
        if let Some(rejection) = post_only_rejection(&request) {
            return Ok(rejection);
        }
        if request.header().content_type().map(Mime::essence_str) != Some(mime::APPLICATION_JSON.essence_str()) {
            return Ok(wrong_content_type(mime::APPLICATION_JSON.as_ref()));
        }

        match self.server.handle(request.body()).await {
            Some(body) => {
                Ok(body_response(HeaderValue::from_static("application/json"), Bytes::from(body)))
            }
            None => {
                let mut response = Response::new(Bytes::new());
                *response.status_mut() = StatusCode::NO_CONTENT;
                Ok(response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use http::header::CONTENT_TYPE;
    use http::{Method, Request};
    use serde_json::{Value, json};

    use plinth_rpc::jsonrpc::{JsonRpcError, Params, method_fn};

    use crate::request::PathParams;

    use super::*;

    fn endpoint() -> JsonRpcEndpoint {
        let mut server = JsonRpcServer::new();
        server
            .register(
                "echo",
                method_fn(|params: Params| async move {
                    match params {
                        Params::Array(values) => Ok(Value::Array(values)),
                        _ => Err(JsonRpcError::application(1, "positional params required", None).unwrap()),
                    }
                }),
            )
            .unwrap();
        JsonRpcEndpoint::new(server)
    }

    fn rpc_request(method: Method, content_type: Option<&str>, body: &str) -> RequestContext {
        let mut builder = Request::builder().method(method).uri("/rpc");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        let (parts, body) = builder.body(Bytes::from(body.to_string())).unwrap().into_parts();
        RequestContext::new(parts.into(), body, PathParams::default())
    }

    #[tokio::test]
    async fn round_trip() {
        let body = json!({"jsonrpc": "2.0", "method": "echo", "params": [1, 2], "id": 7}).to_string();
        let response =
            endpoint().invoke(rpc_request(Method::POST, Some("application/json"), &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let parsed: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(parsed, json!({"jsonrpc": "2.0", "result": [1, 2], "id": 7}));
    }

    #[tokio::test]
    async fn get_is_rejected() {
        let response = endpoint().invoke(rpc_request(Method::GET, Some("application/json"), "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[http::header::ALLOW], "POST");
    }

    #[tokio::test]
    async fn wrong_content_type_is_rejected() {
        let response = endpoint().invoke(rpc_request(Method::POST, Some("text/plain"), "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = endpoint().invoke(rpc_request(Method::POST, None, "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn charset_parameter_is_tolerated() {
        let body = json!({"jsonrpc": "2.0", "method": "echo", "params": [], "id": 1}).to_string();
        let response = endpoint()
            .invoke(rpc_request(Method::POST, Some("application/json; charset=utf-8"), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn notification_only_input_is_no_content() {
        let body = json!({"jsonrpc": "2.0", "method": "echo", "params": []}).to_string();
        let response =
            endpoint().invoke(rpc_request(Method::POST, Some("application/json"), &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
    }
}
