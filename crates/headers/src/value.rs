//! Parsing and encoding of structured header values.
//!
//! A structured header value is a main token followed by a `;`-separated
//! parameter list (`text/html; charset=UTF-8`). Parameter values may be
//! quoted, and a parameter whose name ends in `*` carries an RFC 2231
//! extended value (`charset'lang'pct-encoded`) that decodes to unicode.
//!
//! Parsing is deliberately best-effort: a malformed parameter fragment is
//! skipped rather than failing the whole header, matching how browsers and
//! servers treat these lists in practice. Encoding is strict and returns
//! typed errors for values that cannot be represented.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::EncodeError;

/// Characters kept verbatim by the best-effort ASCII fallback of a
/// non-encodable parameter value.
const URL_QUOTE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-').remove(b'~').remove(b'/');

/// RFC 2231 attribute characters: everything else is percent-encoded in an
/// extended parameter value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-').remove(b'~');

/// Parse a structured header value into its main token and parameter map.
///
/// Parameter values are unquoted. A trailing `*` on a parameter name selects
/// RFC 2231 decoding; the decoded form wins over a plain parameter of the
/// same name no matter which appears first in the header.
///
/// ```
/// use plinth_headers::parse_header_value;
///
/// let (main, params) = parse_header_value("text/html; charset=UTF-8");
/// assert_eq!(main, "text/html");
/// assert_eq!(params["charset"], "UTF-8");
/// ```
pub fn parse_header_value(header: &str) -> (String, HashMap<String, String>) {
    let (main, rest) = match header.find(';') {
        Some(idx) => (&header[..idx], &header[idx + 1..]),
        None => (header, ""),
    };

    let mut params = HashMap::new();
    let mut extended: Vec<String> = Vec::new();
    for fragment in split_params(rest) {
        let Some((key, raw_value)) = fragment.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = unquote(raw_value.trim());

        if let Some(key) = key.strip_suffix('*') {
            if let Some(decoded) = decode_rfc2231(&value) {
                params.insert(key.to_string(), decoded);
                extended.push(key.to_string());
            }
        } else if !extended.iter().any(|k| k == key) {
            params.insert(key.to_string(), value);
        }
    }

    (main.trim().to_string(), params)
}

/// Split a parameter list on `;`, honoring quoted strings.
fn split_params(input: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (idx, ch) in input.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                fragments.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    fragments.push(&input[start..]);
    fragments.into_iter().map(str::trim).filter(|f| !f.is_empty()).collect()
}

/// Strip surrounding quotes and unescape `\"` and `\\`.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for ch in inner.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Decode an RFC 2231 extended value (`charset'lang'pct-encoded`).
///
/// Returns `None` when the fragment is malformed or uses an unknown charset,
/// in which case the caller skips the parameter.
fn decode_rfc2231(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let data = parts.next()?;

    let bytes: Vec<u8> = percent_decode_str(data).collect();
    match charset.to_ascii_lowercase().as_str() {
        "" | "utf-8" | "utf8" => String::from_utf8(bytes).ok(),
        "iso-8859-1" | "latin-1" | "latin1" => Some(bytes.iter().map(|&b| b as char).collect()),
        "ascii" | "us-ascii" => {
            if bytes.is_ascii() { String::from_utf8(bytes).ok() } else { None }
        }
        _ => None,
    }
}

/// A scalar usable as a header value or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Date(DateTime<Utc>),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn render(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Date(dt) => format_http_date(*dt),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(dt: DateTime<Utc>) -> Self {
        Scalar::Date(dt)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

/// A parameter value: either a scalar or a boolean flag.
///
/// `Flag(true)` emits the bare parameter name, `Flag(false)` omits the
/// parameter from the output entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Value(Scalar),
    Flag(bool),
}

impl From<Scalar> for Param {
    fn from(value: Scalar) -> Self {
        Param::Value(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Value(value.into())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Value(value.into())
    }
}

impl From<DateTime<Utc>> for Param {
    fn from(value: DateTime<Utc>) -> Self {
        Param::Value(value.into())
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Value(value.into())
    }
}

/// The character encoding the header is ultimately transmitted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Charset {
    #[default]
    Ascii,
    Latin1,
}

impl Charset {
    fn name(self) -> &'static str {
        match self {
            Charset::Ascii => "ascii",
            Charset::Latin1 => "iso-8859-1",
        }
    }

    fn encode(self, value: &str) -> Option<Vec<u8>> {
        match self {
            Charset::Ascii => value.is_ascii().then(|| value.as_bytes().to_vec()),
            Charset::Latin1 => value.chars().map(|c| u8::try_from(c as u32).ok()).collect(),
        }
    }
}

/// Options for [`encode_header_value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    pub charset: Charset,
    /// Quote parameter values even when quoting is unnecessary.
    pub always_quote: bool,
}

/// Encode a structured header value for transmission.
///
/// Datetimes are formatted per RFC 1123 in GMT; numbers are rendered in
/// decimal. A parameter value that cannot be represented in the target
/// charset is emitted twice: a percent-encoded ASCII approximation under the
/// plain name, plus the authoritative RFC 2231/5987 form under `name*`.
///
/// The main value and all parameter names must fit the target charset.
pub fn encode_header_value(
    value: &Scalar,
    params: &[(&str, Param)],
    opts: EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = opts
        .charset
        .encode(&value.render())
        .ok_or(EncodeError::UnencodableValue { charset: opts.charset.name() })?;

    for (key, param) in params {
        let key_bytes = opts
            .charset
            .encode(key)
            .ok_or_else(|| EncodeError::UnencodableName { name: (*key).to_string(), charset: opts.charset.name() })?;

        let scalar = match param {
            Param::Flag(false) => continue,
            Param::Flag(true) => {
                buffer.extend_from_slice(b"; ");
                buffer.extend_from_slice(&key_bytes);
                continue;
            }
            Param::Value(scalar) => scalar,
        };

        let raw = scalar.render();
        let escaped = escape_quotes(&raw);
        let add_quotes = opts.always_quote || escaped != raw || raw.contains([' ', '\t', ';', ',']);

        buffer.extend_from_slice(b"; ");
        match opts.charset.encode(&escaped) {
            Some(encoded) => {
                buffer.extend_from_slice(&key_bytes);
                buffer.push(b'=');
                push_maybe_quoted(&mut buffer, &encoded, add_quotes);
            }
            None => {
                // RFC 5987 fallback: ascii approximation first, then the
                // extended parameter carrying the real value.
                let ascii_value = utf8_percent_encode(&escaped, URL_QUOTE).to_string();
                let extended = format!("utf-8''{}", utf8_percent_encode(&escaped, ATTR_CHAR));

                buffer.extend_from_slice(&key_bytes);
                buffer.push(b'=');
                push_maybe_quoted(&mut buffer, ascii_value.as_bytes(), add_quotes);
                buffer.extend_from_slice(b"; ");
                buffer.extend_from_slice(&key_bytes);
                buffer.extend_from_slice(b"*=");
                push_maybe_quoted(&mut buffer, extended.as_bytes(), add_quotes);
            }
        }
    }

    Ok(buffer)
}

fn escape_quotes(value: &str) -> String {
    if !value.contains(['\\', '"']) {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        if ch == '\\' || ch == '"' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn push_maybe_quoted(buffer: &mut Vec<u8>, value: &[u8], quote: bool) {
    if quote {
        buffer.push(b'"');
        buffer.extend_from_slice(value);
        buffer.push(b'"');
    } else {
        buffer.extend_from_slice(value);
    }
}

/// Format a datetime per RFC 1123 (`Sun, 09 Oct 2016 23:04:06 GMT`), the
/// form required by HTTP `Date`, `Expires` and friends.
pub fn format_http_date(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parse_no_params() {
        let (main, params) = parse_header_value("text/html");
        assert_eq!(main, "text/html");
        assert!(params.is_empty());
    }

    #[test]
    fn parse_unquoted_param() {
        let (main, params) = parse_header_value("text/html; charset=UTF-8");
        assert_eq!(main, "text/html");
        assert_eq!(params, HashMap::from([("charset".to_string(), "UTF-8".to_string())]));
    }

    #[test]
    fn parse_quoted_param() {
        let (main, params) = parse_header_value("attachment;filename=\"blah.png\"");
        assert_eq!(main, "attachment");
        assert_eq!(params["filename"], "blah.png");
    }

    #[test]
    fn parse_extended_param_wins() {
        let (main, params) = parse_header_value("attachment;filename=\"blah.png\";  filename*=utf-8''bl%C3%A4h.png");
        assert_eq!(main, "attachment");
        assert_eq!(params, HashMap::from([("filename".to_string(), "bläh.png".to_string())]));
    }

    #[test]
    fn parse_extended_param_wins_regardless_of_order() {
        let (_, params) = parse_header_value("attachment; filename*=utf-8''bl%C3%A4h.png; filename=\"blah.png\"");
        assert_eq!(params["filename"], "bläh.png");
    }

    #[test]
    fn parse_latin1_extended_param() {
        let (_, params) = parse_header_value("attachment; filename*=iso-8859-1''bl%E4h.png");
        assert_eq!(params["filename"], "bläh.png");
    }

    #[test]
    fn parse_skips_malformed_fragments() {
        let (main, params) = parse_header_value("form-data; garbage; name=field; broken*=nocharset");
        assert_eq!(main, "form-data");
        assert_eq!(params, HashMap::from([("name".to_string(), "field".to_string())]));
    }

    #[test]
    fn parse_quoted_semicolon() {
        let (_, params) = parse_header_value("attachment; filename=\"a;b.png\"; x=1");
        assert_eq!(params["filename"], "a;b.png");
        assert_eq!(params["x"], "1");
    }

    #[test]
    fn encode_no_params() {
        let encoded = encode_header_value(&"text/html".into(), &[], EncodeOptions::default()).unwrap();
        assert_eq!(encoded, b"text/html");
    }

    #[test]
    fn encode_simple_param() {
        let encoded =
            encode_header_value(&"text/html".into(), &[("charset", "UTF-8".into())], EncodeOptions::default())
                .unwrap();
        assert_eq!(encoded, b"text/html; charset=UTF-8");
    }

    #[test]
    fn encode_date_value() {
        let dt = Utc.with_ymd_and_hms(2016, 10, 9, 23, 4, 6).unwrap();
        let encoded = encode_header_value(&dt.into(), &[], EncodeOptions::default()).unwrap();
        assert_eq!(encoded, b"Sun, 09 Oct 2016 23:04:06 GMT");
    }

    #[test]
    fn encode_int_value() {
        let encoded = encode_header_value(&Scalar::Int(123), &[], EncodeOptions::default()).unwrap();
        assert_eq!(encoded, b"123");
    }

    #[test]
    fn encode_unicode_param_uses_extended_form() {
        let opts = EncodeOptions { always_quote: true, ..Default::default() };
        let encoded = encode_header_value(&"attachment".into(), &[("filename", "日本語.png".into())], opts).unwrap();
        assert_eq!(
            encoded,
            &b"attachment; filename=\"%E6%97%A5%E6%9C%AC%E8%AA%9E.png\"; \
               filename*=\"utf-8''%E6%97%A5%E6%9C%AC%E8%AA%9E.png\""[..]
        );
    }

    #[test]
    fn encode_quotes_embedded_quote() {
        let encoded =
            encode_header_value(&"attachment".into(), &[("filename", "bla\"argh".into())], EncodeOptions::default())
                .unwrap();
        assert_eq!(encoded, b"attachment; filename=\"bla\\\"argh\"");
    }

    #[test]
    fn encode_flag_params() {
        let encoded = encode_header_value(
            &"form-data".into(),
            &[("secure", Param::Flag(true)), ("partitioned", Param::Flag(false))],
            EncodeOptions::default(),
        )
        .unwrap();
        assert_eq!(encoded, b"form-data; secure");
    }

    #[test]
    fn encode_rejects_unencodable_main_value() {
        let err = encode_header_value(&"päätös".into(), &[], EncodeOptions::default()).unwrap_err();
        assert_eq!(err, EncodeError::UnencodableValue { charset: "ascii" });
    }

    #[test]
    fn encode_latin1_charset() {
        let opts = EncodeOptions { charset: Charset::Latin1, ..Default::default() };
        let encoded = encode_header_value(&"attachment".into(), &[("filename", "bläh.png".into())], opts).unwrap();
        assert_eq!(encoded, b"attachment; filename=bl\xe4h.png");
    }

    #[test]
    fn round_trip_without_extended_fallback() {
        let cases: &[(&str, &[(&str, Param)])] = &[
            ("text/html", &[("charset", Param::Value(Scalar::Text("UTF-8".to_string())))]),
            ("attachment", &[("filename", Param::Value(Scalar::Text("report final.pdf".to_string())))]),
            ("multipart/form-data", &[("boundary", Param::Value(Scalar::Text("x-123".to_string())))]),
        ];

        for (main, params) in cases {
            let encoded = encode_header_value(&Scalar::Text((*main).to_string()), params, EncodeOptions::default())
                .unwrap();
            let (parsed_main, parsed_params) = parse_header_value(std::str::from_utf8(&encoded).unwrap());
            assert_eq!(parsed_main, *main);
            for (key, param) in *params {
                let Param::Value(Scalar::Text(expected)) = param else { unreachable!() };
                assert_eq!(&parsed_params[*key], expected);
            }
        }
    }
}
