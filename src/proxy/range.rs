//! Range header parsing.
//!
//! Only the starting byte offset matters: the proxy always streams to the
//! end of the upstream body, so the end bound is validated but unused.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// The range header was present but does not match
    /// `bytes=<start>-<end?>`. The caller answers 416 with an empty body
    /// and performs no upstream fetch.
    #[error("malformed range specification")]
    Malformed,
}

/// Extract the starting byte offset from an optional `Range` header value.
///
/// Absent header means the whole asset: offset 0. The header must match
/// `bytes=<digits>-` or `bytes=<digits>-<digits>` exactly.
pub fn range_start(header: Option<&str>) -> Result<u128, RangeError> {
    let Some(header) = header else {
        return Ok(0);
    };

    let spec = header.strip_prefix("bytes=").ok_or(RangeError::Malformed)?;
    let (start, end) = spec.split_once('-').ok_or(RangeError::Malformed)?;

    if start.is_empty() || !start.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed);
    }
    // End bound: digits or nothing; parsed no further because it is unused.
    if !end.is_empty() && !end.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed);
    }

    start.parse::<u128>().map_err(|_| RangeError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_header_is_offset_zero() {
        assert_eq!(range_start(None), Ok(0));
    }

    #[test]
    fn test_open_ended_range() {
        assert_eq!(range_start(Some("bytes=0-")), Ok(0));
        assert_eq!(range_start(Some("bytes=1048576-")), Ok(1_048_576));
    }

    #[test]
    fn test_bounded_range_end_is_ignored() {
        assert_eq!(range_start(Some("bytes=100-200")), Ok(100));
        assert_eq!(range_start(Some("bytes=100-0")), Ok(100));
    }

    #[test]
    fn test_offset_beyond_64_bits() {
        let start = (u64::MAX as u128) + 1;
        let header = format!("bytes={}-", start);
        assert_eq!(range_start(Some(&header)), Ok(start));
    }

    #[test]
    fn test_malformed_specifications() {
        for header in [
            "bytes=abc-",
            "bytes=-",
            "bytes=-500",
            "bytes=12",
            "bytes=1-2-3",
            "bytes=1 -",
            "bytes= 1-",
            "bytes=0x10-",
            "bits=0-",
            "0-",
            "",
        ] {
            assert_eq!(range_start(Some(header)), Err(RangeError::Malformed), "{:?}", header);
        }
    }

    #[test]
    fn test_overflowing_start_is_malformed() {
        let header = format!("bytes={}0-", u128::MAX);
        assert_eq!(range_start(Some(&header)), Err(RangeError::Malformed));
    }
}
