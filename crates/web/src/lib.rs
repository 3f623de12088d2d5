//! Transport-agnostic web dispatch.
//!
//! This crate ties the workspace together without owning a socket: an
//! [`App`] maps `http::Request<Bytes>` to `http::Response<Bytes>`, so any
//! HTTP server (or a plain test) can drive it.
//!
//! - [`RequestHeader`] gives lazily parsed, memoized views over the request
//!   head (content negotiation, ranges, cookies, content type).
//! - [`Router`] matches paths with per-route method filters and named
//!   routes, distinguishing 404 from 405.
//! - [`endpoint::JsonRpcEndpoint`] and [`endpoint::XmlRpcEndpoint`] expose
//!   the `plinth-rpc` dispatchers over POST.
//! - [`SessionManager`] resolves the session cookie against a
//!   `plinth-session` store and writes dirty sessions back.

pub mod endpoint;
pub mod router;

mod app;
mod handler;
mod request;
mod responder;
mod session;

pub use app::App;
pub use handler::{BoxError, RequestHandler, handler_fn};
pub use request::{PathParams, RequestContext, RequestHeader};
pub use responder::{Json, Responder};
pub use router::{RouteMatch, Router, RouterBuildError, RoutingError};
pub use session::{SessionError, SessionManager};
