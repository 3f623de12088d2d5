//! `Range` header parsing and resolution.
//!
//! Parsing and resolution fail differently on purpose: a header that does
//! not follow the grammar is a [`HeaderError`] raised at parse time, while a
//! well-formed range that falls outside the actual resource length is a
//! [`RangeError::NotSatisfiable`] raised only once the length is known
//! (HTTP 416 territory).

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{HeaderError, RangeError};

/// One range specifier from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `start-end`, both inclusive.
    Bounded(u64, u64),
    /// `start-`: from an offset to the end of the resource.
    From(u64),
    /// `-n`: the last `n` bytes of the resource.
    Suffix(u64),
}

/// The parsed value of an HTTP `Range` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRange {
    specs: Vec<RangeSpec>,
}

impl FromStr for HttpRange {
    type Err = HeaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.replace(' ', "");
        let Some((unit, rest)) = value.split_once('=') else {
            return Err(HeaderError::malformed("range", "missing '='"));
        };
        if unit != "bytes" {
            return Err(HeaderError::malformed("range", format!("unexpected range unit: {unit}")));
        }
        if rest.is_empty() {
            return Err(HeaderError::malformed("range", "empty range set"));
        }

        let mut specs = Vec::new();
        for set in rest.split(',') {
            let Some((start, end)) = set.split_once('-') else {
                return Err(HeaderError::malformed("range", format!("missing '-' in range set: {set}")));
            };

            let parse = |s: &str| {
                s.parse::<u64>().map_err(|_| HeaderError::malformed("range", format!("invalid offset: {s}")))
            };
            let spec = match (start.is_empty(), end.is_empty()) {
                (true, true) => return Err(HeaderError::malformed("range", "range set with no offsets")),
                (true, false) => RangeSpec::Suffix(parse(end)?),
                (false, true) => RangeSpec::From(parse(start)?),
                (false, false) => {
                    let (start, end) = (parse(start)?, parse(end)?);
                    if start > end {
                        return Err(HeaderError::malformed("range", format!("start beyond end: {start}-{end}")));
                    }
                    RangeSpec::Bounded(start, end)
                }
            };
            specs.push(spec);
        }

        Ok(Self { specs })
    }
}

impl HttpRange {
    /// Number of range sets in the header.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Resolve the range sets against the actual resource length, producing
    /// concrete half-open byte ranges.
    ///
    /// Fails with [`RangeError::NotSatisfiable`] when any start offset falls
    /// at or past the end of the resource, or an explicit end offset does.
    pub fn resolve(&self, total_len: u64) -> Result<Vec<Range<u64>>, RangeError> {
        let mut ranges = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let range = match *spec {
                RangeSpec::Bounded(start, end) => {
                    if start >= total_len {
                        return Err(RangeError::NotSatisfiable { offset: start, total: total_len });
                    }
                    if end >= total_len {
                        return Err(RangeError::NotSatisfiable { offset: end, total: total_len });
                    }
                    start..end + 1
                }
                RangeSpec::From(start) => {
                    if start >= total_len {
                        return Err(RangeError::NotSatisfiable { offset: start, total: total_len });
                    }
                    start..total_len
                }
                RangeSpec::Suffix(len) => {
                    if len == 0 || len > total_len {
                        return Err(RangeError::NotSatisfiable { offset: len, total: total_len });
                    }
                    total_len - len..total_len
                }
            };
            ranges.push(range);
        }

        Ok(ranges)
    }
}

impl fmt::Display for HttpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes=")?;
        for (idx, spec) in self.specs.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            match spec {
                RangeSpec::Bounded(start, end) => write!(f, "{start}-{end}")?,
                RangeSpec::From(start) => write!(f, "{start}-")?,
                RangeSpec::Suffix(len) => write!(f, "-{len}")?,
            }
        }
        Ok(())
    }
}
