//! Path routing with per-route method filters and named routes.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use thiserror::Error;

use crate::handler::RequestHandler;
use crate::request::PathParams;

/// Routing failures, distinguished so dispatch can answer 404 vs 405.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("no route matches the path")]
    NotFound,

    #[error("the path exists but not for this method")]
    MethodNotAllowed { allowed: Vec<Method> },
}

#[derive(Error, Debug)]
pub enum RouterBuildError {
    #[error("invalid route path {path:?}: {cause}")]
    InvalidPath { path: String, cause: String },

    #[error("duplicate route name: {0:?}")]
    DuplicateRouteName(String),
}

struct Route {
    method: Option<Method>,
    handler: Arc<dyn RequestHandler>,
}

/// An immutable routing table; build one with [`Router::builder`].
pub struct Router {
    inner: matchit::Router<Vec<Route>>,
    names: HashMap<String, String>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("names", &self.names).finish_non_exhaustive()
    }
}

/// A successful route lookup.
#[derive(Clone)]
pub struct RouteMatch {
    handler: Arc<dyn RequestHandler>,
    params: PathParams,
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch").field("params", &self.params).finish_non_exhaustive()
    }
}

impl RouteMatch {
    pub fn handler(&self) -> Arc<dyn RequestHandler> {
        Arc::clone(&self.handler)
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Resolve a (path, method) pair to a handler.
    pub fn at(&self, path: &str, method: &Method) -> Result<RouteMatch, RoutingError> {
        let matched = self.inner.at(path).map_err(|_| RoutingError::NotFound)?;

        let params = PathParams::from_matchit(&matched.params);
        for route in matched.value {
            if route.method.as_ref().is_none_or(|m| m == method) {
                return Ok(RouteMatch { handler: Arc::clone(&route.handler), params });
            }
        }

        let mut allowed: Vec<Method> =
            matched.value.iter().filter_map(|route| route.method.clone()).collect();
        allowed.dedup();
        Err(RoutingError::MethodNotAllowed { allowed })
    }

    /// The path pattern registered under the given route name.
    pub fn url_for(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }
}

/// One route under construction: a handler plus its method filter and an
/// optional unique name.
pub struct RouteBuilder {
    method: Option<Method>,
    name: Option<String>,
    handler: Arc<dyn RequestHandler>,
}

impl std::fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBuilder").field("method", &self.method).field("name", &self.name).finish_non_exhaustive()
    }
}

impl RouteBuilder {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

macro_rules! method_route {
    ($fn_name:ident, $method:ident) => {
        pub fn $fn_name<H: RequestHandler + 'static>(handler: H) -> RouteBuilder {
            RouteBuilder { method: Some(Method::$method), name: None, handler: Arc::new(handler) }
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(patch, PATCH);

/// A route that accepts any method.
pub fn any<H: RequestHandler + 'static>(handler: H) -> RouteBuilder {
    RouteBuilder { method: None, name: None, handler: Arc::new(handler) }
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<(String, RouteBuilder)>,
}

impl RouterBuilder {
    pub fn route(mut self, path: impl Into<String>, route: RouteBuilder) -> Self {
        self.routes.push((path.into(), route));
        self
    }

    pub fn build(self) -> Result<Router, RouterBuildError> {
        let mut names = HashMap::new();
        let mut by_path: HashMap<String, Vec<Route>> = HashMap::new();

        for (path, route) in self.routes {
            if let Some(name) = route.name {
                if names.insert(name.clone(), path.clone()).is_some() {
                    return Err(RouterBuildError::DuplicateRouteName(name));
                }
            }
            by_path.entry(path).or_default().push(Route { method: route.method, handler: route.handler });
        }

        let mut inner = matchit::Router::new();
        for (path, routes) in by_path {
            inner
                .insert(path.clone(), routes)
                .map_err(|e| RouterBuildError::InvalidPath { path, cause: e.to_string() })?;
        }

        Ok(Router { inner, names })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{Response, StatusCode};

    use crate::handler::{BoxError, handler_fn};
    use crate::request::RequestContext;

    use super::*;

    fn ok_handler(tag: &'static str) -> impl RequestHandler {
        handler_fn(move |_: RequestContext| async move { Ok::<_, BoxError>(tag) })
    }

    fn router() -> Router {
        Router::builder()
            .route("/", get(ok_handler("root")))
            .route("/", post(ok_handler("root-post")))
            .route("/users/{id}", get(ok_handler("user")).named("user-detail"))
            .route("/health", any(ok_handler("health")))
            .build()
            .unwrap()
    }

    async fn body_of(matched: RouteMatch, path: &str) -> Bytes {
        let (parts, _) = http::Request::builder().uri(path).body(()).unwrap().into_parts();
        let context = RequestContext::new(parts.into(), Bytes::new(), matched.params().clone());
        let response: Response<Bytes> = matched.handler().invoke(context).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.into_body()
    }

    #[tokio::test]
    async fn method_selects_the_route() {
        let router = router();
        assert_eq!(body_of(router.at("/", &Method::GET).unwrap(), "/").await, "root");
        assert_eq!(body_of(router.at("/", &Method::POST).unwrap(), "/").await, "root-post");
    }

    #[test]
    fn path_params_are_captured() {
        let matched = router().at("/users/42", &Method::GET).unwrap();
        assert_eq!(matched.params().get("id"), Some("42"));
    }

    #[test]
    fn any_route_matches_all_methods() {
        let router = router();
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            assert!(router.at("/health", &method).is_ok());
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert!(matches!(router().at("/nope", &Method::GET), Err(RoutingError::NotFound)));
    }

    #[test]
    fn wrong_method_is_method_not_allowed() {
        let Err(RoutingError::MethodNotAllowed { allowed }) = router().at("/users/42", &Method::DELETE) else {
            panic!("expected a method-not-allowed error");
        };
        assert_eq!(allowed, vec![Method::GET]);
    }

    #[test]
    fn named_routes_resolve() {
        let router = router();
        assert_eq!(router.url_for("user-detail"), Some("/users/{id}"));
        assert_eq!(router.url_for("missing"), None);
    }

    #[test]
    fn duplicate_route_names_rejected() {
        let result = Router::builder()
            .route("/a", get(ok_handler("a")).named("dup"))
            .route("/b", get(ok_handler("b")).named("dup"))
            .build();
        assert!(matches!(result, Err(RouterBuildError::DuplicateRouteName(name)) if name == "dup"));
    }

    #[test]
    fn invalid_paths_rejected() {
        let result = Router::builder()
            .route("/a/{id}", get(ok_handler("a")))
            .route("/a/{name}", get(ok_handler("b")))
            .build();
        assert!(matches!(result, Err(RouterBuildError::InvalidPath { .. })));
    }
}
