//! HTTP endpoint adapters for the RPC dispatchers.
//!
//! Both endpoints enforce the transport contract (POST only, the protocol's
//! content type) before handing the body to the protocol dispatcher, and
//! tag the response with the matching content type.

mod jsonrpc;
mod xmlrpc;

pub use jsonrpc::JsonRpcEndpoint;
pub use xmlrpc::XmlRpcEndpoint;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{Response, StatusCode};

use crate::request::RequestContext;

fn post_only_rejection(request: &RequestContext) -> Option<Response<Bytes>> {
    if request.header().method() == http::Method::POST {
        return None;
    }
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
    response.headers_mut().insert(ALLOW, http::HeaderValue::from_static("POST"));
    Some(response)
}

fn wrong_content_type(expected: &str) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(format!("expected content type {expected}")));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

fn body_response(content_type: http::HeaderValue, body: Bytes) -> Response<Bytes> {
    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}
