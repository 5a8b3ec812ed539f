//! HTTP `Range` header parsing for audio streaming
//!
//! Only the single-range `bytes=<start>-<end?>` form is understood. Anything
//! else is not an error: callers fall back to serving the whole file.

/// Byte window requested by a client, as written in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset, inclusive
    pub start: u64,
    /// Last byte offset, inclusive. `None` means "to the end of the file".
    pub end: Option<u64>,
}

/// Concrete byte window within a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    /// First byte offset, inclusive
    pub start: u64,
    /// Last byte offset, inclusive
    pub end: u64,
    /// Total size of the file
    pub total_size: u64,
}

impl ResolvedRange {
    /// Number of bytes in the window.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// Why a syntactically valid range cannot be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsatisfiable {
    pub start: u64,
    pub end: Option<u64>,
    pub total_size: u64,
}

const UNIT_PREFIX: &str = "bytes=";

impl ByteRange {
    /// Parse a raw `Range` header value.
    ///
    /// Grammar: `bytes=` DIGITS `-` DIGITS? followed by end of input or a
    /// comma, after trimming surrounding whitespace. Only the first range of a
    /// comma-separated list is used. Returns `None` for every other input,
    /// including numbers too large for `u64`.
    ///
    /// # Examples
    /// ```
    /// use auralis_core::streaming::ByteRange;
    ///
    /// let range = ByteRange::parse("bytes=100-199").unwrap();
    /// assert_eq!((range.start, range.end), (100, Some(199)));
    /// assert_eq!(ByteRange::parse("items=0-1"), None);
    /// ```
    pub fn parse(header: &str) -> Option<Self> {
        let spec = header.trim().strip_prefix(UNIT_PREFIX)?;
        let first = spec.split(',').next()?;
        let (start_str, end_str) = first.split_once('-')?;

        let start = parse_digits(start_str)?;
        let end = if end_str.is_empty() {
            None
        } else {
            Some(parse_digits(end_str)?)
        };

        Some(Self { start, end })
    }

    /// Fit the request to a file of `total_size` bytes.
    ///
    /// An omitted end defaults to the last byte. An end past the last byte is
    /// clamped. A start at or beyond the file size, or an end before the
    /// start, cannot be satisfied.
    ///
    /// # Errors
    /// - `Unsatisfiable` - The window does not overlap the file
    pub fn resolve(self, total_size: u64) -> Result<ResolvedRange, Unsatisfiable> {
        let unsatisfiable = Unsatisfiable {
            start: self.start,
            end: self.end,
            total_size,
        };

        if self.start >= total_size {
            return Err(unsatisfiable);
        }

        let last = total_size - 1;
        let end = match self.end {
            Some(end) if end < self.start => return Err(unsatisfiable),
            Some(end) => end.min(last),
            None => last,
        };

        Ok(ResolvedRange {
            start: self.start,
            end,
            total_size,
        })
    }
}

/// Parse a non-empty run of ASCII digits.
///
/// `u64::from_str` alone would also accept a leading `+`.
fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
