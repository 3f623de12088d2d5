//! Conversions from handler return values into HTTP responses.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

/// Anything a handler may return.
pub trait Responder {
    fn into_response(self) -> Response<Bytes>;
}

impl Responder for Response<Bytes> {
    fn into_response(self) -> Response<Bytes> {
        self
    }
}

impl Responder for Bytes {
    fn into_response(self) -> Response<Bytes> {
        with_content_type(mime::APPLICATION_OCTET_STREAM.as_ref(), self)
    }
}

impl Responder for String {
    fn into_response(self) -> Response<Bytes> {
        with_content_type(mime::TEXT_PLAIN_UTF_8.as_ref(), Bytes::from(self))
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Response<Bytes> {
        with_content_type(mime::TEXT_PLAIN_UTF_8.as_ref(), Bytes::from_static(self.as_bytes()))
    }
}

impl Responder for StatusCode {
    fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = self;
        response
    }
}

impl Responder for () {
    fn into_response(self) -> Response<Bytes> {
        StatusCode::NO_CONTENT.into_response()
    }
}

impl<R: Responder> Responder for (StatusCode, R) {
    fn into_response(self) -> Response<Bytes> {
        let (status, responder) = self;
        let mut response = responder.into_response();
        *response.status_mut() = status;
        response
    }
}

impl<R: Responder> Responder for Option<R> {
    fn into_response(self) -> Response<Bytes> {
        match self {
            Some(responder) => responder.into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

/// Serializes its payload as a JSON response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn into_response(self) -> Response<Bytes> {
        match serde_json::to_vec(&self.0) {
            Ok(body) => with_content_type(mime::APPLICATION_JSON.as_ref(), Bytes::from(body)),
            Err(e) => {
                error!(cause = %e, "response payload failed to serialize");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn with_content_type(content_type: &str, body: Bytes) -> Response<Bytes> {
    let mut response = Response::new(body);
    if let Ok(value) = content_type.parse() {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}
