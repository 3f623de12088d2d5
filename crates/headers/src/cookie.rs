//! RFC 6265 cookie handling: `Cookie` request header parsing and
//! `Set-Cookie` response header rendering.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::CookieError;
use crate::value::format_http_date;

/// Parse a request `Cookie` header into name/value pairs.
///
/// Pairs appear in header order; a later pair with the same name is kept as
/// a separate entry so the caller decides which one wins. Fragments without
/// an `=` are skipped.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// A `Set-Cookie` header under construction.
///
/// Attribute setters validate eagerly so an invalid cookie never reaches the
/// wire; rendering happens through `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    max_age: Option<u64>,
    expires: Option<DateTime<Utc>>,
    secure: bool,
    http_only: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, CookieError> {
        let name = name.into();
        if name.is_empty() || name.contains(['=', ';', ' ', '\t', ',']) {
            return Err(CookieError::InvalidName(name));
        }

        Ok(Self {
            name,
            value: value.into(),
            domain: None,
            path: None,
            max_age: None,
            expires: None,
            secure: false,
            http_only: false,
        })
    }

    /// A cookie that expires at the Unix epoch, forcing the client to
    /// discard any cookie of the same name.
    pub fn expired(name: impl Into<String>) -> Result<Self, CookieError> {
        let mut cookie = Self::new(name, "")?;
        cookie.expires = Some(DateTime::UNIX_EPOCH);
        Ok(cookie)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Result<Self, CookieError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(CookieError::InvalidPath(path));
        }
        self.path = Some(path);
        Ok(self)
    }

    pub fn max_age(mut self, seconds: u64) -> Result<Self, CookieError> {
        if seconds == 0 {
            return Err(CookieError::InvalidMaxAge);
        }
        self.max_age = Some(seconds);
        Ok(self)
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", format_http_date(expires))?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pairs_in_order() {
        let cookies = parse_cookie_header("session-id=abc123; theme=dark");
        assert_eq!(
            cookies,
            vec![("session-id".to_string(), "abc123".to_string()), ("theme".to_string(), "dark".to_string())]
        );
    }

    #[test]
    fn parse_skips_fragments_without_equals() {
        let cookies = parse_cookie_header("garbage; a=1");
        assert_eq!(cookies, vec![("a".to_string(), "1".to_string())]);
    }

    #[test]
    fn parse_strips_quotes() {
        let cookies = parse_cookie_header("a=\"quoted value\"");
        assert_eq!(cookies[0].1, "quoted value");
    }

    #[test]
    fn render_full_attribute_set() {
        let expires = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let cookie = SetCookie::new("sid", "abc")
            .unwrap()
            .domain("example.org")
            .path("/app")
            .unwrap()
            .max_age(3600)
            .unwrap()
            .expires(expires)
            .secure()
            .http_only();

        assert_eq!(
            cookie.to_string(),
            "sid=abc; Domain=example.org; Path=/app; Max-Age=3600; \
             Expires=Thu, 01 Jan 2026 00:00:00 GMT; Secure; HttpOnly"
        );
    }

    #[test]
    fn expired_cookie_uses_epoch() {
        let cookie = SetCookie::expired("sid").unwrap();
        assert_eq!(cookie.to_string(), "sid=; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn invalid_attributes_are_rejected() {
        assert_eq!(SetCookie::new("a b", "v").unwrap_err(), CookieError::InvalidName("a b".to_string()));
        assert_eq!(SetCookie::new("a", "v").unwrap().path("relative").unwrap_err(), CookieError::InvalidPath("relative".to_string()));
        assert_eq!(SetCookie::new("a", "v").unwrap().max_age(0).unwrap_err(), CookieError::InvalidMaxAge);
    }
}
