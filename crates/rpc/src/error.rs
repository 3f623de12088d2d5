use thiserror::Error;

/// Error codes reserved by the JSON-RPC 2.0 and XML-RPC specs for protocol
/// failures. Application code may not use them.
const RESERVED_CODES: [i64; 5] = [-32700, -32600, -32601, -32602, -32603];
const RESERVED_RANGE: std::ops::RangeInclusive<i64> = -32099..=-32000;

/// Raised when application code tries to build an RPC error with a code
/// from the protocol-reserved space.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("cannot use reserved error code {0}")]
pub struct ReservedCodeError(pub i64);

/// Check an application-level error code against the reserved space.
pub(crate) fn check_application_code(code: i64) -> Result<(), ReservedCodeError> {
    if RESERVED_CODES.contains(&code) || RESERVED_RANGE.contains(&code) {
        return Err(ReservedCodeError(code));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_nearby_codes_are_allowed() {
        for code in [0, -32701, -32100, -31900, 32050] {
            assert_eq!(check_application_code(code), Ok(()));
        }
    }

    #[test]
    fn reserved_codes_are_rejected() {
        for code in [-32700, -32600, -32601, -32602, -32603, -32099, -32050, -32000] {
            assert_eq!(check_application_code(code), Err(ReservedCodeError(code)));
        }
    }
}
