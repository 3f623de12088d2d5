//! Content negotiation for the `Accept` header family.
//!
//! Both headers share the same wire shape: a comma-separated list of tags,
//! each optionally weighted with a `q` parameter in `[0, 1]`. They differ in
//! how a tag splits into its primary part and subtype (`text/html` vs
//! `en-gb`) and in their fallback behavior when the header is absent:
//! an absent `Accept-Language` selects the first available tag, while an
//! absent `Accept` falls back to the caller-supplied default. That asymmetry
//! is deliberate and preserved here.

use std::fmt;

/// A quality weight, stored in thousandths so comparisons stay exact.
///
/// The wire form allows at most three decimals (`q=0.812`), so thousandths
/// are lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u16);

impl Quality {
    pub const MAX: Quality = Quality(1000);
    pub const ZERO: Quality = Quality(0);

    /// Parse a `q` value (`1`, `0`, `0.8`, `0.812`). Returns `None` for
    /// anything outside `[0, 1]` or with more than three decimals.
    fn parse(value: &str) -> Option<Quality> {
        let (int_part, frac_part) = match value.split_once('.') {
            Some((i, f)) => (i, f),
            None => (value, ""),
        };

        match int_part {
            "1" => (frac_part.chars().all(|c| c == '0') && frac_part.len() <= 3).then_some(Quality::MAX),
            "0" => {
                if frac_part.is_empty() {
                    return Some(Quality::ZERO);
                }
                if frac_part.len() > 3 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let mut thousandths: u16 = frac_part.parse().ok()?;
                for _ in frac_part.len()..3 {
                    thousandths *= 10;
                }
                Some(Quality(thousandths))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 1000 {
            return write!(f, "1");
        }
        write!(f, "0.{}", format!("{:03}", self.0).trim_end_matches('0'))
    }
}

/// One entry of an accept list: primary part, optional subtype, quality.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AcceptItem {
    primary: String,
    subtype: Option<String>,
    quality: Quality,
}

/// Parse a comma-separated accept list. Unparseable items are skipped, per
/// the best-effort contract of this crate's parsers.
fn parse_items(header: &str, separator: char) -> Vec<AcceptItem> {
    let mut items = Vec::new();
    for part in header.split(',') {
        let part = part.replace(' ', "");
        if part.is_empty() {
            continue;
        }

        let (tag, quality) = match part.split_once(";q=") {
            Some((tag, q)) => match Quality::parse(q) {
                Some(quality) => (tag, quality),
                None => continue,
            },
            None => (part.as_str(), Quality::MAX),
        };
        // `q` is the only parameter understood here; an item carrying any
        // other parameter is unparseable and dropped as a whole.
        if tag.contains(';') {
            continue;
        }

        let (primary, subtype) = match tag.split_once(separator) {
            Some((p, s)) => (p, Some(s)),
            None => (tag, None),
        };
        if primary.is_empty() || subtype.is_some_and(str::is_empty) {
            continue;
        }

        items.push(AcceptItem {
            primary: primary.to_ascii_lowercase(),
            subtype: subtype.map(str::to_ascii_lowercase),
            quality,
        });
    }
    items
}

/// Pick the best candidate from `available` against the parsed list.
///
/// A wildcard `*` primary matches anything and a missing subtype in the
/// header matches any candidate subtype. The highest declared quality wins;
/// the entry listed first in the header wins ties.
fn best_match<'a>(items: &[AcceptItem], candidates: &[(String, Option<String>, &'a str)]) -> Option<&'a str> {
    let mut best: Option<(&'a str, Quality)> = None;
    for item in items {
        if best.is_some_and(|(_, q)| item.quality <= q) {
            continue;
        }
        for (primary, subtype, original) in candidates {
            let matched = item.primary == "*"
                || (item.primary == *primary && (item.subtype.is_none() || item.subtype.as_deref() == subtype.as_deref()));
            if matched {
                best = Some((original, item.quality));
                break;
            }
        }
    }
    best.map(|(original, _)| original)
}

fn display_items(items: &[AcceptItem], separator: char, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item.primary)?;
        if let Some(subtype) = &item.subtype {
            write!(f, "{separator}{subtype}")?;
        }
        if item.quality < Quality::MAX {
            write!(f, ";q={}", item.quality)?;
        }
    }
    Ok(())
}

/// The parsed value of an HTTP `Accept` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accept {
    items: Vec<AcceptItem>,
}

impl Accept {
    /// Parse the header. `None` models an absent header.
    pub fn new(header: Option<&str>) -> Self {
        Self { items: header.map(|h| parse_items(h, '/')).unwrap_or_default() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pick the media type from `available` that best matches this header.
    ///
    /// Returns `fallback` when nothing matches or the header was absent.
    pub fn best_match<'a>(&self, available: &[&'a str], fallback: &'a str) -> &'a str {
        let candidates: Vec<_> = available
            .iter()
            .map(|tag| {
                let lower = tag.to_ascii_lowercase();
                match lower.split_once('/') {
                    Some((p, s)) => (p.to_string(), Some(s.to_string()), *tag),
                    None => (lower, None, *tag),
                }
            })
            .collect();

        best_match(&self.items, &candidates).unwrap_or(fallback)
    }
}

impl fmt::Display for Accept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_items(&self.items, '/', f)
    }
}

/// The parsed value of an HTTP `Accept-Language` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptLanguage {
    items: Vec<AcceptItem>,
}

impl AcceptLanguage {
    /// Parse the header. `None` models an absent header.
    pub fn new(header: Option<&str>) -> Self {
        Self { items: header.map(|h| parse_items(h, '-')).unwrap_or_default() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pick the language from `available` that best matches this header.
    ///
    /// Candidate tags may use either `-` or `_` as the separator; matching is
    /// case-insensitive. Unlike [`Accept::best_match`], an absent or empty
    /// header selects the first available tag, not the fallback.
    pub fn best_match<'a>(&self, available: &[&'a str], fallback: &'a str) -> &'a str {
        if self.items.is_empty() {
            return available.first().copied().unwrap_or(fallback);
        }

        let candidates: Vec<_> = available
            .iter()
            .map(|tag| {
                let lower = tag.to_ascii_lowercase().replace('_', "-");
                match lower.split_once('-') {
                    Some((p, s)) => (p.to_string(), Some(s.to_string()), *tag),
                    None => (lower, None, *tag),
                }
            })
            .collect();

        best_match(&self.items, &candidates).unwrap_or(fallback)
    }
}

impl fmt::Display for AcceptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_items(&self.items, '-', f)
    }
}
