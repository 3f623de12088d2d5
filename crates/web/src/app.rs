//! Request dispatch: routing, handler invocation, error mapping.

use bytes::Bytes;
use http::header::ALLOW;
use http::{Request, Response, StatusCode};
use tracing::{debug, error};

use crate::request::RequestContext;
use crate::router::{Router, RoutingError};

/// A routed application. Transport-agnostic: any server (or test) that can
/// produce an `http::Request` and consume an `http::Response` can drive it.
#[derive(Debug)]
pub struct App {
    router: Router,
}

impl App {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Dispatch one request. Routing misses become 404/405 and handler
    /// failures 500; this never returns an error to the transport.
    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();

        let matched = match self.router.at(&path, &method) {
            Ok(matched) => matched,
            Err(RoutingError::NotFound) => {
                debug!(%method, path, "no route matched");
                return status_response(StatusCode::NOT_FOUND);
            }
            Err(RoutingError::MethodNotAllowed { allowed }) => {
                debug!(%method, path, "method not allowed");
                let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED);
                let allow = allowed.iter().map(http::Method::as_str).collect::<Vec<_>>().join(", ");
                if let Ok(value) = allow.parse() {
                    response.headers_mut().insert(ALLOW, value);
                }
                return response;
            }
        };

        let context = RequestContext::new(parts.into(), body, matched.params().clone());
        match matched.handler().invoke(context).await {
            Ok(response) => response,
            Err(e) => {
                error!(%method, path, cause = %e, "handler failed");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn status_response(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}
