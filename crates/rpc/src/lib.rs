//! Transport-agnostic RPC endpoint dispatch.
//!
//! This crate implements the two RPC protocols of the workspace, JSON-RPC
//! 2.0 and XML-RPC, without binding to any particular transport: both
//! dispatchers consume a request body and produce a response body, so any
//! HTTP layer (or a test) can drive them directly.
//!
//! Both protocols share the [`registry::MethodRegistry`], a name-to-handler
//! map supporting dot-separated prefix routing (`math.add` resolves through
//! a registry attached under the `math` prefix).
//!
//! Application error codes are validated at construction time: the reserved
//! protocol codes (-32700, -32600 through -32603, and the -32099..=-32000
//! server range) are rejected with [`ReservedCodeError`] before an error
//! object can ever be built.

pub mod jsonrpc;
pub mod registry;
pub mod xmlrpc;

mod error;

pub use error::ReservedCodeError;
pub use registry::{MethodRegistry, RegistryError};
