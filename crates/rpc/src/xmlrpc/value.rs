//! The XML-RPC value model and its wire serialization.
//!
//! XML-RPC supports a closed set of types: string, boolean, 32-bit signed
//! int, double (finite only), base64 bytes, `dateTime.iso8601`, array and
//! struct. A plain date is represented as a datetime at midnight and
//! round-trips as such.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quick_xml::Reader;
use quick_xml::escape::partial_escape;
use quick_xml::events::Event;
use thiserror::Error;

const DATETIME_FORMAT: &str = "%Y%m%dT%H:%M:%S";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValueError {
    #[error("{0} is out of range of XML-RPC (32-bit) integer")]
    IntOutOfRange(i64),

    #[error("XML-RPC does not support serializing infinity or NaN values")]
    NonFiniteDouble,

    #[error("unknown XML-RPC type: {0}")]
    UnknownType(String),

    #[error("invalid value for {kind}: {text}")]
    InvalidValue { kind: &'static str, text: String },

    #[error("malformed XML: {0}")]
    Malformed(String),
}

impl ValueError {
    pub(crate) fn invalid<S: ToString>(kind: &'static str, text: S) -> Self {
        Self::InvalidValue { kind, text: text.to_string() }
    }

    pub(crate) fn malformed<S: ToString>(reason: S) -> Self {
        Self::Malformed(reason.to_string())
    }
}

/// A value in an XML-RPC call or response.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    String(String),
    Bool(bool),
    Int(i32),
    Double(f64),
    Base64(Vec<u8>),
    DateTime(NaiveDateTime),
    Array(Vec<XmlValue>),
    /// Order-preserving; XML-RPC structs keep their member order on the wire.
    Struct(Vec<(String, XmlValue)>),
}

impl XmlValue {
    /// Build an int, enforcing the 32-bit signed range of the protocol.
    pub fn int(value: i64) -> Result<Self, ValueError> {
        i32::try_from(value).map(XmlValue::Int).map_err(|_| ValueError::IntOutOfRange(value))
    }

    /// A date serializes as a datetime at midnight.
    pub fn date(value: NaiveDate) -> Self {
        XmlValue::DateTime(value.and_time(NaiveTime::MIN))
    }
}

impl From<&str> for XmlValue {
    fn from(value: &str) -> Self {
        XmlValue::String(value.to_string())
    }
}

impl From<String> for XmlValue {
    fn from(value: String) -> Self {
        XmlValue::String(value)
    }
}

impl From<bool> for XmlValue {
    fn from(value: bool) -> Self {
        XmlValue::Bool(value)
    }
}

impl From<i32> for XmlValue {
    fn from(value: i32) -> Self {
        XmlValue::Int(value)
    }
}

/// Serialize a value into a `<value>...</value>` XML fragment.
pub fn serialize(value: &XmlValue) -> Result<String, ValueError> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(value: &XmlValue, out: &mut String) -> Result<(), ValueError> {
    out.push_str("<value>");
    match value {
        XmlValue::String(s) => {
            out.push_str("<string>");
            out.push_str(&partial_escape(s));
            out.push_str("</string>");
        }
        XmlValue::Bool(b) => {
            out.push_str("<boolean>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</boolean>");
        }
        XmlValue::Int(i) => {
            out.push_str("<i4>");
            out.push_str(&i.to_string());
            out.push_str("</i4>");
        }
        XmlValue::Double(d) => {
            if !d.is_finite() {
                return Err(ValueError::NonFiniteDouble);
            }
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        XmlValue::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&BASE64.encode(bytes));
            out.push_str("</base64>");
        }
        XmlValue::DateTime(dt) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&dt.format(DATETIME_FORMAT).to_string());
            out.push_str("</dateTime.iso8601>");
        }
        XmlValue::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(item, out)?;
            }
            out.push_str("</data></array>");
        }
        XmlValue::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&partial_escape(name));
                out.push_str("</name>");
                write_value(member, out)?;
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
    Ok(())
}

/// A parsed XML element: tag, accumulated text, child elements.
///
/// XML-RPC needs no attributes or namespaces, so this tiny DOM is all the
/// structure the protocol requires.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub(crate) tag: String,
    pub(crate) text: String,
    pub(crate) children: Vec<Element>,
}

impl Element {
    pub(crate) fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.tag == tag)
    }
}

/// Parse an XML document into its root element.
///
/// Text is kept verbatim: whitespace can be significant in a `<string>`
/// value, so trimming is left to the converters of types where it is not.
pub(crate) fn parse_document(xml: &str) -> Result<Element, ValueError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    loop {
        match reader.read_event().map_err(ValueError::malformed)? {
            Event::Start(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(Element { tag, ..Default::default() });
            }
            Event::Empty(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let element = Element { tag, ..Default::default() };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(ValueError::malformed)?);
                }
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| ValueError::malformed("unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Eof => return Err(ValueError::malformed("unexpected end of document")),
            _ => {}
        }
    }
}

/// Deserialize a `<value>` XML fragment back into an [`XmlValue`].
pub fn deserialize(xml: &str) -> Result<XmlValue, ValueError> {
    let element = parse_document(xml)?;
    if element.tag != "value" {
        return Err(ValueError::malformed(format!("expected <value>, got <{}>", element.tag)));
    }
    value_from_element(&element)
}

pub(crate) fn value_from_element(value: &Element) -> Result<XmlValue, ValueError> {
    let Some(typed) = value.children.first() else {
        // A bare <value> with no type element is a string per the spec.
        return Ok(XmlValue::String(value.text.clone()));
    };

    match typed.tag.as_str() {
        "string" => Ok(XmlValue::String(typed.text.clone())),
        "boolean" => match typed.text.trim() {
            "1" => Ok(XmlValue::Bool(true)),
            "0" => Ok(XmlValue::Bool(false)),
            other => Err(ValueError::invalid("boolean", other)),
        },
        "int" | "i4" => {
            let text = typed.text.trim();
            let parsed: i64 = text.parse().map_err(|_| ValueError::invalid("int", text))?;
            XmlValue::int(parsed)
        }
        "double" | "float" => {
            let text = typed.text.trim();
            text.parse().map(XmlValue::Double).map_err(|_| ValueError::invalid("double", text))
        }
        "base64" => BASE64
            .decode(typed.text.trim())
            .map(XmlValue::Base64)
            .map_err(|_| ValueError::invalid("base64", typed.text.trim())),
        "dateTime.iso8601" => NaiveDateTime::parse_from_str(typed.text.trim(), DATETIME_FORMAT)
            .map(XmlValue::DateTime)
            .map_err(|_| ValueError::invalid("dateTime.iso8601", typed.text.trim())),
        "array" => {
            let data = typed.child("data").ok_or_else(|| ValueError::malformed("array without <data>"))?;
            data.children
                .iter()
                .filter(|child| child.tag == "value")
                .map(value_from_element)
                .collect::<Result<Vec<_>, _>>()
                .map(XmlValue::Array)
        }
        "struct" => {
            let mut members = Vec::new();
            for member in typed.children.iter().filter(|child| child.tag == "member") {
                let name = member.child("name").ok_or_else(|| ValueError::malformed("struct member without <name>"))?;
                let value = member.child("value").ok_or_else(|| ValueError::malformed("struct member without <value>"))?;
                members.push((name.text.clone(), value_from_element(value)?));
            }
            Ok(XmlValue::Struct(members))
        }
        unknown => Err(ValueError::UnknownType(unknown.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn wrapped(inner: &str) -> String {
        format!("<value>{inner}</value>")
    }

    #[test]
    fn serialize_scalars() {
        let cases: &[(XmlValue, &str)] = &[
            (XmlValue::Int(0), "<i4>0</i4>"),
            (XmlValue::Int(-2147483648), "<i4>-2147483648</i4>"),
            (XmlValue::Int(2147483647), "<i4>2147483647</i4>"),
            (XmlValue::Bool(true), "<boolean>1</boolean>"),
            (XmlValue::Bool(false), "<boolean>0</boolean>"),
            (XmlValue::String("foo < & >".to_string()), "<string>foo &lt; &amp; &gt;</string>"),
            (XmlValue::Double(-12.24), "<double>-12.24</double>"),
            (XmlValue::Base64(vec![0xff, 0xe6, 0x00]), "<base64>/+YA</base64>"),
            (
                XmlValue::DateTime(NaiveDate::from_ymd_opt(2015, 1, 17).unwrap().and_hms_opt(23, 19, 0).unwrap()),
                "<dateTime.iso8601>20150117T23:19:00</dateTime.iso8601>",
            ),
            (
                XmlValue::date(NaiveDate::from_ymd_opt(2015, 1, 17).unwrap()),
                "<dateTime.iso8601>20150117T00:00:00</dateTime.iso8601>",
            ),
        ];

        for (value, expected) in cases {
            assert_eq!(serialize(value).unwrap(), wrapped(expected));
        }
    }

    #[test]
    fn serialize_array() {
        let value = XmlValue::Array(vec!["foo".into(), XmlValue::Int(4)]);
        assert_eq!(
            serialize(&value).unwrap(),
            wrapped("<array><data><value><string>foo</string></value><value><i4>4</i4></value></data></array>")
        );
    }

    #[test]
    fn serialize_struct_preserves_order() {
        let value = XmlValue::Struct(vec![("str".to_string(), "foo".into()), ("int".to_string(), XmlValue::Int(4))]);
        assert_eq!(
            serialize(&value).unwrap(),
            wrapped(
                "<struct><member><name>str</name><value><string>foo</string></value></member>\
                 <member><name>int</name><value><i4>4</i4></value></member></struct>"
            )
        );
    }

    #[test]
    fn serialize_rejects_non_finite_doubles() {
        assert_eq!(serialize(&XmlValue::Double(f64::INFINITY)), Err(ValueError::NonFiniteDouble));
        assert_eq!(serialize(&XmlValue::Double(f64::NAN)), Err(ValueError::NonFiniteDouble));
    }

    #[test]
    fn int_range_enforced_at_construction() {
        assert_eq!(XmlValue::int(2147483648), Err(ValueError::IntOutOfRange(2147483648)));
        assert_eq!(XmlValue::int(-2147483649), Err(ValueError::IntOutOfRange(-2147483649)));
        assert_eq!(XmlValue::int(2147483647), Ok(XmlValue::Int(2147483647)));
    }

    #[test]
    fn deserialize_scalars() {
        let cases: &[(&str, XmlValue)] = &[
            ("<i4>-2147483648</i4>", XmlValue::Int(-2147483648)),
            ("<int>2147483647</int>", XmlValue::Int(2147483647)),
            ("<boolean>1</boolean>", XmlValue::Bool(true)),
            ("<boolean>0</boolean>", XmlValue::Bool(false)),
            ("<string>foo &lt; &amp; &gt;</string>", XmlValue::String("foo < & >".to_string())),
            ("<double>-12.24</double>", XmlValue::Double(-12.24)),
            ("<base64>/+YA</base64>", XmlValue::Base64(vec![0xff, 0xe6, 0x00])),
            (
                "<dateTime.iso8601>20150117T23:19:00</dateTime.iso8601>",
                XmlValue::DateTime(NaiveDate::from_ymd_opt(2015, 1, 17).unwrap().and_hms_opt(23, 19, 0).unwrap()),
            ),
        ];

        for (xml, expected) in cases {
            assert_eq!(deserialize(&wrapped(xml)).unwrap(), *expected);
        }
    }

    #[test]
    fn deserialize_untyped_value_is_string() {
        assert_eq!(deserialize("<value>plain</value>").unwrap(), XmlValue::String("plain".to_string()));
    }

    #[test]
    fn string_whitespace_is_significant() {
        let value = XmlValue::String("  padded  ".to_string());
        assert_eq!(deserialize(&serialize(&value).unwrap()).unwrap(), value);

        assert_eq!(
            deserialize("<value>  padded  </value>").unwrap(),
            XmlValue::String("  padded  ".to_string())
        );
    }

    #[test]
    fn scalar_converters_tolerate_surrounding_whitespace() {
        let cases: &[(&str, XmlValue)] = &[
            ("<i4>\n    42\n</i4>", XmlValue::Int(42)),
            ("<boolean> 1 </boolean>", XmlValue::Bool(true)),
            ("<double> -12.24 </double>", XmlValue::Double(-12.24)),
            (
                "<dateTime.iso8601>\n    20150117T23:19:00\n</dateTime.iso8601>",
                XmlValue::DateTime(NaiveDate::from_ymd_opt(2015, 1, 17).unwrap().and_hms_opt(23, 19, 0).unwrap()),
            ),
        ];

        for (xml, expected) in cases {
            assert_eq!(deserialize(&wrapped(xml)).unwrap(), *expected);
        }
    }

    #[test]
    fn deserialize_unknown_type() {
        assert_eq!(
            deserialize("<value><badtype /></value>"),
            Err(ValueError::UnknownType("badtype".to_string()))
        );
    }

    #[test]
    fn deserialize_invalid_boolean() {
        assert_eq!(
            deserialize("<value><boolean>blah</boolean></value>"),
            Err(ValueError::invalid("boolean", "blah"))
        );
    }

    #[test]
    fn round_trip_all_types() {
        let values = vec![
            XmlValue::Int(-42),
            XmlValue::Bool(true),
            XmlValue::String("foo < & >".to_string()),
            XmlValue::Double(-12.24),
            XmlValue::Base64(vec![1, 2, 3, 254]),
            XmlValue::DateTime(NaiveDate::from_ymd_opt(2015, 1, 17).unwrap().and_hms_opt(23, 19, 0).unwrap()),
            XmlValue::date(NaiveDate::from_ymd_opt(2015, 1, 17).unwrap()),
            XmlValue::Array(vec!["foo".into(), XmlValue::Int(4)]),
            XmlValue::Struct(vec![("str".to_string(), "foo".into()), ("int".to_string(), XmlValue::Int(4))]),
        ];

        for value in values {
            assert_eq!(deserialize(&serialize(&value).unwrap()).unwrap(), value);
        }
    }
}
