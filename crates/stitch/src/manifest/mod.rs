// Manifest model: the ordered segment list a download is built from.

mod parser;

use std::fmt;

use url::Url;

pub use parser::{
    BYTERANGE_MARKER, ManifestParser, ParserOptions, SEGMENT_INFO_MARKER, base_url_for,
    parse_manifest,
};

/// Half-open byte interval `[start, end)` within a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl ByteRange {
    /// Returns `None` unless `start < end`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Builds the range described by an `<length>@<offset>` directive.
    pub fn from_length_offset(length: u64, offset: u64) -> Option<Self> {
        let end = offset.checked_add(length)?;
        Self::new(offset, end)
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Value for the HTTP `Range` header. The wire form is inclusive on both ends.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end - 1)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One fetchable unit of media.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDescriptor {
    /// Zero-based position in the manifest.
    pub sequence: usize,
    /// Always absolute.
    pub url: Url,
    /// `None` means the whole resource.
    pub byte_range: Option<ByteRange>,
    /// Duration in seconds from `#EXTINF`, when it carried a number.
    pub duration: Option<f64>,
}

/// Ordered list of segments parsed from one manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    base_url: Url,
    segments: Vec<SegmentDescriptor>,
}

impl Manifest {
    pub(crate) fn new(base_url: Url, segments: Vec<SegmentDescriptor>) -> Self {
        Self { base_url, segments }
    }

    /// URL relative segment locations were resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn segments(&self) -> &[SegmentDescriptor] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of the known segment durations, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().filter_map(|s| s.duration).sum()
    }

    /// Sum of the declared sub-range lengths. `None` if any segment is a full fetch.
    pub fn expected_len(&self) -> Option<u64> {
        self.segments
            .iter()
            .map(|s| s.byte_range.map(|r| r.len()))
            .sum()
    }
}
