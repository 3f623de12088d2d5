use thiserror::Error;

/// Errors raised while parsing a structured header value.
///
/// These always indicate malformed user input, never a server-side
/// condition; see [`RangeError`] for the semantic counterpart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("malformed {header} header: {reason}")]
    Malformed { header: &'static str, reason: String },
}

impl HeaderError {
    pub fn malformed<S: ToString>(header: &'static str, reason: S) -> Self {
        Self::Malformed { header, reason: reason.to_string() }
    }
}

/// Errors raised while encoding a header value for transmission.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    #[error("main header value cannot be encoded as {charset}")]
    UnencodableValue { charset: &'static str },

    #[error("parameter name {name:?} cannot be encoded as {charset}")]
    UnencodableName { name: String, charset: &'static str },
}

/// Raised when a syntactically valid `Range` header cannot be satisfied
/// against the actual resource length. Distinct from [`HeaderError`]: the
/// header parsed fine, the offsets are just out of bounds.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RangeError {
    #[error("range offset exceeds resource length: {offset} >= {total}")]
    NotSatisfiable { offset: u64, total: u64 },
}

/// Errors raised when building a `Set-Cookie` header.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CookieError {
    #[error("cookie path must start with '/': {0:?}")]
    InvalidPath(String),

    #[error("cookie max-age must be positive")]
    InvalidMaxAge,

    #[error("invalid cookie name: {0:?}")]
    InvalidName(String),
}
