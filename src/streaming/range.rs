//! HTTP byte-range parsing and resolution.
//!
//! Parsing is lenient: anything that is not a single well-formed
//! `bytes=` range is ignored and the full file is served. Resolution is
//! strict: a well-formed range outside the file is rejected.

use reelgate_common::{Error, Result};

/// A syntactically valid single range from a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// `bytes=a-b`
    Bounded { start: u64, end: u64 },
    /// `bytes=a-`
    From(u64),
    /// `bytes=-n`, the last `n` bytes.
    Suffix(u64),
}

/// Parse a `Range` header value.
///
/// Returns `None` for other units, multiple ranges and malformed values.
pub fn parse_range_header(value: &str) -> Option<RangeRequest> {
    let ranges = value.trim().strip_prefix("bytes=")?;
    if ranges.contains(',') {
        return None;
    }

    let (start, end) = ranges.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, false) => Some(RangeRequest::Suffix(end.parse().ok()?)),
        (false, true) => Some(RangeRequest::From(start.parse().ok()?)),
        (false, false) => Some(RangeRequest::Bounded {
            start: start.parse().ok()?,
            end: end.parse().ok()?,
        }),
        (true, true) => None,
    }
}

/// The half-open byte span `[start, end)` a response will carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Exclusive end; `None` streams until the remote file runs out.
    pub end: Option<u64>,
    /// Declared total size, when known.
    pub total: Option<u64>,
    /// Whether this answers a range request (206) rather than a full one (200).
    pub partial: bool,
}

impl ByteRange {
    /// Number of bytes in the span, when bounded.
    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end - self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// `Content-Range` value for partial responses.
    pub fn content_range(&self) -> Option<String> {
        if !self.partial {
            return None;
        }
        let last = self.end?.checked_sub(1)?;
        let total = self
            .total
            .map_or_else(|| "*".to_string(), |t| t.to_string());
        Some(format!("bytes {}-{}/{}", self.start, last, total))
    }
}

/// Resolve a request against the declared size.
///
/// `size` of `None` means unknown; only explicit `a-b` ranges can be served
/// then.
pub fn resolve_range(request: Option<RangeRequest>, size: Option<u64>) -> Result<ByteRange> {
    let Some(request) = request else {
        return Ok(ByteRange {
            start: 0,
            end: size,
            total: size,
            partial: false,
        });
    };

    let (start, end) = match (request, size) {
        (RangeRequest::Bounded { start, end }, _) if start > end => {
            return Err(Error::range(
                format!("start {start} is after end {end}"),
                size,
            ));
        }
        (RangeRequest::Bounded { start, end }, Some(size)) => {
            if start >= size || end >= size {
                return Err(Error::range(
                    format!("range {start}-{end} exceeds size {size}"),
                    Some(size),
                ));
            }
            (start, end + 1)
        }
        (RangeRequest::Bounded { start, end }, None) => (start, end + 1),
        (RangeRequest::From(start), Some(size)) => {
            if start >= size {
                return Err(Error::range(
                    format!("start {start} exceeds size {size}"),
                    Some(size),
                ));
            }
            (start, size)
        }
        (RangeRequest::Suffix(0), _) => {
            return Err(Error::range("empty suffix range", size));
        }
        (RangeRequest::Suffix(len), Some(size)) => {
            if size == 0 {
                return Err(Error::range("suffix range of empty file", Some(0)));
            }
            (size.saturating_sub(len), size)
        }
        (RangeRequest::From(_) | RangeRequest::Suffix(_), None) => {
            return Err(Error::range("open range needs a known size", None));
        }
    };

    Ok(ByteRange {
        start,
        end: Some(end),
        total: size,
        partial: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_single_ranges() {
        assert_eq!(
            parse_range_header("bytes=0-499"),
            Some(RangeRequest::Bounded { start: 0, end: 499 })
        );
        assert_eq!(parse_range_header("bytes=500-"), Some(RangeRequest::From(500)));
        assert_eq!(parse_range_header("bytes=-500"), Some(RangeRequest::Suffix(500)));
        assert_eq!(
            parse_range_header(" bytes= 1 - 2 "),
            Some(RangeRequest::Bounded { start: 1, end: 2 })
        );
    }

    #[test]
    fn ignores_malformed_and_multi_ranges() {
        assert_eq!(parse_range_header("bytes=0-1,4-5"), None);
        assert_eq!(parse_range_header("items=0-1"), None);
        assert_eq!(parse_range_header("bytes=-"), None);
        assert_eq!(parse_range_header("bytes=abc-2"), None);
        assert_eq!(parse_range_header("bytes=5"), None);
    }

    #[test]
    fn full_request_covers_file() {
        let r = resolve_range(None, Some(1000)).unwrap();
        assert_eq!((r.start, r.end, r.partial), (0, Some(1000), false));
        assert_eq!(r.content_range(), None);
    }

    #[test]
    fn full_request_of_empty_file_is_empty() {
        let r = resolve_range(None, Some(0)).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn bounded_range() {
        let r = resolve_range(Some(RangeRequest::Bounded { start: 10, end: 19 }), Some(100))
            .unwrap();
        assert_eq!(r.len(), Some(10));
        assert_eq!(r.content_range().as_deref(), Some("bytes 10-19/100"));
    }

    #[test]
    fn whole_file_as_range() {
        let r =
            resolve_range(Some(RangeRequest::Bounded { start: 0, end: 99 }), Some(100)).unwrap();
        assert_eq!(r.len(), Some(100));
        assert!(r.partial);
    }

    #[test]
    fn rejects_out_of_bounds() {
        let size = Some(100);
        for request in [
            RangeRequest::Bounded { start: 50, end: 10 },
            RangeRequest::Bounded { start: 100, end: 120 },
            RangeRequest::Bounded { start: 10, end: 100 },
            RangeRequest::From(100),
            RangeRequest::Suffix(0),
        ] {
            assert_matches!(
                resolve_range(Some(request), size),
                Err(Error::RangeNotSatisfiable { size: Some(100), .. }),
                "{request:?}"
            );
        }
    }

    #[test]
    fn open_and_suffix_ranges() {
        let r = resolve_range(Some(RangeRequest::From(90)), Some(100)).unwrap();
        assert_eq!(r.content_range().as_deref(), Some("bytes 90-99/100"));

        let r = resolve_range(Some(RangeRequest::Suffix(10)), Some(100)).unwrap();
        assert_eq!(r.content_range().as_deref(), Some("bytes 90-99/100"));

        // Oversized suffix clamps to the whole file.
        let r = resolve_range(Some(RangeRequest::Suffix(500)), Some(100)).unwrap();
        assert_eq!(r.content_range().as_deref(), Some("bytes 0-99/100"));
    }

    #[test]
    fn unknown_size() {
        let r = resolve_range(None, None).unwrap();
        assert_eq!((r.end, r.len()), (None, None));

        let r = resolve_range(Some(RangeRequest::Bounded { start: 5, end: 9 }), None).unwrap();
        assert_eq!(r.content_range().as_deref(), Some("bytes 5-9/*"));

        assert_matches!(
            resolve_range(Some(RangeRequest::From(5)), None),
            Err(Error::RangeNotSatisfiable { size: None, .. })
        );
        assert_matches!(
            resolve_range(Some(RangeRequest::Suffix(5)), None),
            Err(Error::RangeNotSatisfiable { .. })
        );
    }
}
