use std::error::Error;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::Response;

use crate::request::RequestContext;
use crate::responder::Responder;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// An async request handler.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, request: RequestContext) -> Result<Response<Bytes>, BoxError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> BoxFuture<'static, Result<Response<Bytes>, BoxError>> + Send + Sync,
{
    async fn invoke(&self, request: RequestContext) -> Result<Response<Bytes>, BoxError> {
        (self.0)(request).await
    }
}

/// Adapt an async closure into a [`RequestHandler`]. The closure returns any
/// [`Responder`]; errors become 500s at the dispatch boundary.
pub fn handler_fn<F, Fut, R>(f: F) -> impl RequestHandler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    R: Responder + 'static,
{
    FnHandler(move |request| {
        let fut = f(request);
        Box::pin(async move { fut.await.map(Responder::into_response) }) as BoxFuture<'static, _>
    })
}

#[cfg(test)]
mod tests {
    use http::{Request, StatusCode};

    use crate::request::PathParams;

    use super::*;

    fn context(path: &str) -> RequestContext {
        let (parts, _) = Request::builder().uri(path).body(()).unwrap().into_parts();
        RequestContext::new(parts.into(), Bytes::new(), PathParams::default())
    }

    #[tokio::test]
    async fn closure_handler_responds() {
        let handler = handler_fn(|request: RequestContext| async move {
            Ok::<_, BoxError>(format!("path: {}", request.header().path()))
        });

        let response = handler.invoke(context("/hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "path: /hello");
    }

    #[tokio::test]
    async fn handler_errors_propagate() {
        let handler = handler_fn(|_| async { Err::<String, _>(BoxError::from("boom")) });
        let err = handler.invoke(context("/")).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
