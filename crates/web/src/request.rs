//! The request model: lazily parsed, memoized views over `http` types.

use std::collections::HashMap;
use std::str::FromStr;

use bytes::Bytes;
use http::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, RANGE};
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use mime::Mime;
use once_cell::sync::OnceCell;

use plinth_headers::{Accept, AcceptLanguage, HeaderError, HttpRange, parse_cookie_header};

/// Path parameters captured by the router, e.g. `{id}` segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub(crate) fn from_matchit(params: &matchit::Params<'_, '_>) -> Self {
        Self(params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The parsed head of a request, with structured header views computed on
/// first access and memoized per instance.
///
/// Absent headers parse to their neutral value (an empty `Accept`, no
/// cookies); only `range()` is fallible, since a malformed `Range` header
/// must be distinguishable from an absent one.
#[derive(Debug)]
pub struct RequestHeader {
    parts: Parts,
    accept: OnceCell<Accept>,
    accept_language: OnceCell<AcceptLanguage>,
    range: OnceCell<Result<Option<HttpRange>, HeaderError>>,
    cookies: OnceCell<Vec<(String, String)>>,
    content_type: OnceCell<Option<Mime>>,
    content_length: OnceCell<Option<u64>>,
}

impl From<Parts> for RequestHeader {
    fn from(parts: Parts) -> Self {
        Self {
            parts,
            accept: OnceCell::new(),
            accept_language: OnceCell::new(),
            range: OnceCell::new(),
            cookies: OnceCell::new(),
            content_type: OnceCell::new(),
            content_length: OnceCell::new(),
        }
    }
}

impl RequestHeader {
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn header_str(&self, name: http::header::HeaderName) -> Option<&str> {
        self.parts.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn accept(&self) -> &Accept {
        self.accept.get_or_init(|| Accept::new(self.header_str(ACCEPT)))
    }

    pub fn accept_language(&self) -> &AcceptLanguage {
        self.accept_language.get_or_init(|| AcceptLanguage::new(self.header_str(ACCEPT_LANGUAGE)))
    }

    /// The parsed `Range` header. `Ok(None)` when absent; a malformed header
    /// is an error, not an empty range.
    pub fn range(&self) -> Result<Option<&HttpRange>, HeaderError> {
        let cached = self.range.get_or_init(|| match self.header_str(RANGE) {
            Some(value) => HttpRange::from_str(value).map(Some),
            None => Ok(None),
        });
        match cached {
            Ok(range) => Ok(range.as_ref()),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn cookies(&self) -> &[(String, String)] {
        self.cookies.get_or_init(|| self.header_str(COOKIE).map(parse_cookie_header).unwrap_or_default())
    }

    /// The first cookie with the given name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type
            .get_or_init(|| self.header_str(CONTENT_TYPE).and_then(|value| value.parse().ok()))
            .as_ref()
    }

    /// The `charset` parameter of the content type, if any.
    pub fn charset(&self) -> Option<&str> {
        self.content_type().and_then(|mime| mime.get_param(mime::CHARSET)).map(|charset| charset.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        *self
            .content_length
            .get_or_init(|| self.header_str(CONTENT_LENGTH).and_then(|value| value.parse().ok()))
    }
}

/// Everything a handler gets: the parsed request head, the body, and the
/// path parameters captured by the router.
#[derive(Debug)]
pub struct RequestContext {
    header: RequestHeader,
    body: Bytes,
    params: PathParams,
}

impl RequestContext {
    pub fn new(header: RequestHeader, body: Bytes, params: PathParams) -> Self {
        Self { header, body, params }
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }
}
