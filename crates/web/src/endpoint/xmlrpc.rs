use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderValue, Response};
use mime::Mime;

use plinth_rpc::xmlrpc::XmlRpcServer;

use crate::handler::{BoxError, RequestHandler};
use crate::request::RequestContext;

use super::{body_response, post_only_rejection, wrong_content_type};

const TEXT_XML: &str = "text/xml";

/// Serves an [`XmlRpcServer`] over HTTP POST with `text/xml` bodies.
#[derive(Debug)]
pub struct XmlRpcEndpoint {
    server: XmlRpcServer,
}

impl XmlRpcEndpoint {
    pub fn new(server: XmlRpcServer) -> Self {
        Self { server }
    }
}

#[async_trait]
impl RequestHandler for XmlRpcEndpoint {
    async fn invoke(&self, request: RequestContext) -> Result<Response<Bytes>, BoxError> {
        if let Some(rejection) = post_only_rejection(&request) {
            return Ok(rejection);
        }
        if request.header().content_type().map(Mime::essence_str) != Some(TEXT_XML) {
            return Ok(wrong_content_type(TEXT_XML));
        }

        let body = self.server.handle(request.body()).await;
        Ok(body_response(HeaderValue::from_static(TEXT_XML), Bytes::from(body)))
    }
}
