//! Structured HTTP header utilities.
//!
//! This crate implements the header-level plumbing that the rest of the
//! workspace builds on:
//!
//! - parsing and encoding of structured header values (`main; key=value`
//!   parameter lists), including RFC 2231 / RFC 5987 extended parameters
//! - content negotiation for the `Accept` family of headers
//! - `Range` header parsing and resolution against a concrete resource length
//! - RFC 6265 cookie parsing and `Set-Cookie` rendering
//!
//! Everything here is a pure function over strings: no I/O, no shared state.
//! All failure modes are surfaced as typed errors instead of silently
//! degrading to defaults.

pub mod accept;
pub mod cookie;
pub mod range;
pub mod value;

mod error;

pub use accept::{Accept, AcceptLanguage, Quality};
pub use cookie::{SetCookie, parse_cookie_header};
pub use error::{CookieError, EncodeError, HeaderError, RangeError};
pub use range::HttpRange;
pub use value::{Charset, EncodeOptions, Param, Scalar, encode_header_value, format_http_date, parse_header_value};
