// Manifest parser: single pass over the lines, two states.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Result, StitchError};
use crate::manifest::{ByteRange, Manifest, SegmentDescriptor};

/// Starts a pending segment.
pub const SEGMENT_INFO_MARKER: &str = "#EXTINF:";
/// Restricts the pending segment to `<length>@<offset>`.
pub const BYTERANGE_MARKER: &str = "#EXT-X-BYTERANGE:";

static UNSIGNED_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("integer pattern is valid"));

#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Accept `#EXT-X-BYTERANGE:<length>` without an offset. The range then
    /// continues from the end of the previous ranged segment of the same URL.
    pub allow_implicit_offset: bool,
}

#[derive(Debug, Clone, Copy)]
enum PendingRange {
    Explicit(ByteRange),
    /// Length only; the offset is settled once the URL is known.
    Continuation { length: u64, line: usize },
}

#[derive(Debug, Default)]
struct PendingSegment {
    duration: Option<f64>,
    range: Option<PendingRange>,
}

#[derive(Debug)]
enum ParseState {
    AwaitingInfo,
    AwaitingUrl(PendingSegment),
}

#[derive(Debug, Clone, Default)]
pub struct ManifestParser {
    options: ParserOptions,
}

impl ManifestParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Parses `text`, resolving segment locations against `base_url`.
    pub fn parse(&self, text: &str, base_url: &str) -> Result<Manifest> {
        let base =
            Url::parse(base_url).map_err(|e| StitchError::invalid_url(base_url, e.to_string()))?;
        self.parse_with_base(text, &base)
    }

    pub fn parse_with_base(&self, text: &str, base: &Url) -> Result<Manifest> {
        let mut segments: Vec<SegmentDescriptor> = Vec::new();
        let mut state = ParseState::AwaitingInfo;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(info) = line.strip_prefix(SEGMENT_INFO_MARKER) {
                if matches!(state, ParseState::AwaitingUrl(_)) {
                    trace!(line = line_no, "Discarding unfinished segment");
                }
                state = ParseState::AwaitingUrl(PendingSegment {
                    duration: parse_duration(info),
                    range: None,
                });
                continue;
            }

            if let Some(range_text) = line.strip_prefix(BYTERANGE_MARKER) {
                if let ParseState::AwaitingUrl(pending) = &mut state {
                    pending.range = Some(self.parse_byte_range(range_text, line, line_no)?);
                }
                continue;
            }

            if line.starts_with('#') {
                continue;
            }

            if let ParseState::AwaitingUrl(pending) =
                std::mem::replace(&mut state, ParseState::AwaitingInfo)
            {
                let url = base
                    .join(line)
                    .map_err(|e| StitchError::invalid_url(line, e.to_string()))?;
                let byte_range = match pending.range {
                    None => None,
                    Some(PendingRange::Explicit(range)) => Some(range),
                    Some(PendingRange::Continuation { length, line: range_line }) => {
                        Some(continue_range(segments.last(), &url, length, range_line)?)
                    }
                };
                trace!(sequence = segments.len(), url = %url, range = ?byte_range, "Parsed segment");
                segments.push(SegmentDescriptor {
                    sequence: segments.len(),
                    url,
                    byte_range,
                    duration: pending.duration,
                });
            }
        }

        debug!(segments = segments.len(), base_url = %base, "Parsed manifest");
        Ok(Manifest::new(base.clone(), segments))
    }

    fn parse_byte_range(
        &self,
        range_text: &str,
        line: &str,
        line_no: usize,
    ) -> Result<PendingRange> {
        let mut numbers = Vec::with_capacity(2);
        for m in UNSIGNED_INTEGER.find_iter(range_text).take(2) {
            let value = m.as_str().parse::<u64>().map_err(|e| {
                StitchError::manifest_format(line_no, line, format!("byte range value: {e}"))
            })?;
            numbers.push(value);
        }

        match numbers.as_slice() {
            [length, offset] => ByteRange::from_length_offset(*length, *offset)
                .map(PendingRange::Explicit)
                .ok_or_else(|| {
                    StitchError::manifest_format(
                        line_no,
                        line,
                        format!("byte range length {length} at offset {offset} is empty or overflows"),
                    )
                }),
            [length] if self.options.allow_implicit_offset => {
                if *length == 0 {
                    return Err(StitchError::manifest_format(
                        line_no,
                        line,
                        "byte range length is zero",
                    ));
                }
                Ok(PendingRange::Continuation {
                    length: *length,
                    line: line_no,
                })
            }
            _ => Err(StitchError::manifest_format(
                line_no,
                line,
                "expected `<length>@<offset>`",
            )),
        }
    }
}

fn parse_duration(info: &str) -> Option<f64> {
    let value = info.split(',').next()?.trim();
    value.parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}

fn continue_range(
    previous: Option<&SegmentDescriptor>,
    url: &Url,
    length: u64,
    line_no: usize,
) -> Result<ByteRange> {
    let Some(prev_range) = previous
        .filter(|prev| prev.url == *url)
        .and_then(|prev| prev.byte_range)
    else {
        return Err(StitchError::manifest_format(
            line_no,
            format!("{BYTERANGE_MARKER}{length}"),
            "byte range without offset must follow a sub-range of the same resource",
        ));
    };

    ByteRange::from_length_offset(length, prev_range.end()).ok_or_else(|| {
        StitchError::manifest_format(
            line_no,
            format!("{BYTERANGE_MARKER}{length}"),
            "continued byte range overflows",
        )
    })
}

/// Parses with default options.
pub fn parse_manifest(text: &str, base_url: &str) -> Result<Manifest> {
    ManifestParser::default().parse(text, base_url)
}

/// Directory of a manifest URL: the last path segment, query and fragment removed.
pub fn base_url_for(manifest_url: &Url) -> Result<Url> {
    manifest_url.join(".").map_err(|e| {
        StitchError::invalid_url(manifest_url.as_str(), format!("no base directory: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://h/a/b/";

    fn urls(manifest: &Manifest) -> Vec<&str> {
        manifest.segments().iter().map(|s| s.url.as_str()).collect()
    }

    #[test]
    fn parses_ranged_segments_in_order() {
        let text = "#EXTM3U\n\
                    #EXT-X-VERSION:4\n\
                    #EXT-X-TARGETDURATION:10\n\
                    #EXTINF:10.0,\n\
                    #EXT-X-BYTERANGE:100@50\n\
                    video.mp4\n\
                    #EXTINF:9.5,\n\
                    #EXT-X-BYTERANGE:200@150\n\
                    video.mp4\n\
                    #EXT-X-ENDLIST\n";
        let manifest = parse_manifest(text, BASE).unwrap();

        assert_eq!(manifest.len(), 2);
        let first = &manifest.segments()[0];
        assert_eq!(first.sequence, 0);
        assert_eq!(first.url.as_str(), "http://h/a/b/video.mp4");
        assert_eq!(first.byte_range, ByteRange::new(50, 150));
        assert_eq!(first.duration, Some(10.0));

        let second = &manifest.segments()[1];
        assert_eq!(second.sequence, 1);
        assert_eq!(second.byte_range, ByteRange::new(150, 350));
        assert_eq!(manifest.total_duration(), 19.5);
    }

    #[test]
    fn segment_without_range_is_full_fetch() {
        let text = "#EXTINF:4,\nseg1.ts\n#EXTINF:4,\nseg2.ts\n";
        let manifest = parse_manifest(text, BASE).unwrap();
        assert_eq!(urls(&manifest), ["http://h/a/b/seg1.ts", "http://h/a/b/seg2.ts"]);
        assert!(manifest.segments().iter().all(|s| s.byte_range.is_none()));
    }

    #[test]
    fn resolves_relative_and_absolute_locations() {
        let text = "#EXTINF:1,\n\
                    seg1.ts\n\
                    #EXTINF:1,\n\
                    http://other/x.ts\n\
                    #EXTINF:1,\n\
                    ../c/seg3.ts\n\
                    #EXTINF:1,\n\
                    /root.ts\n\
                    #EXTINF:1,\n\
                    seg5.ts?token=abc\n";
        let manifest = parse_manifest(text, BASE).unwrap();
        assert_eq!(
            urls(&manifest),
            [
                "http://h/a/b/seg1.ts",
                "http://other/x.ts",
                "http://h/a/c/seg3.ts",
                "http://h/root.ts",
                "http://h/a/b/seg5.ts?token=abc",
            ]
        );
    }

    #[test]
    fn url_lines_without_info_are_ignored() {
        let text = "stray.ts\n#EXTINF:2,\nkept.ts\nafter.ts\n";
        let manifest = parse_manifest(text, BASE).unwrap();
        assert_eq!(urls(&manifest), ["http://h/a/b/kept.ts"]);
    }

    #[test]
    fn latest_info_marker_wins() {
        let text = "#EXTINF:1,\n#EXT-X-BYTERANGE:10@0\n#EXTINF:3,\nseg.ts\n";
        let manifest = parse_manifest(text, BASE).unwrap();
        let seg = &manifest.segments()[0];
        assert_eq!(seg.duration, Some(3.0));
        assert_eq!(seg.byte_range, None);
    }

    #[test]
    fn byterange_outside_pending_segment_is_ignored() {
        let text = "#EXT-X-BYTERANGE:abc\n#EXTINF:1,\nseg.ts\n";
        let manifest = parse_manifest(text, BASE).unwrap();
        assert_eq!(manifest.len(), 1);
        assert!(manifest.segments()[0].byte_range.is_none());
    }

    #[test]
    fn unknown_directives_and_blank_lines_do_not_change_state() {
        let text = "#EXTINF:2,\n\n#EXT-X-PROGRAM-DATE-TIME:2024-01-01T00:00:00Z\n# comment\n#EXT-X-BYTERANGE:8@16\n\n  seg.ts  \r\n";
        let manifest = parse_manifest(text, BASE).unwrap();
        let seg = &manifest.segments()[0];
        assert_eq!(seg.url.as_str(), "http://h/a/b/seg.ts");
        assert_eq!(seg.byte_range, ByteRange::new(16, 24));
    }

    #[test]
    fn malformed_byterange_is_an_error() {
        let text = "#EXTINF:1,\n#EXT-X-BYTERANGE:abc\nseg.ts\n";
        let err = parse_manifest(text, BASE).unwrap_err();
        match err {
            StitchError::ManifestFormat { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "#EXT-X-BYTERANGE:abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_offset_is_malformed_by_default() {
        let text = "#EXTINF:1,\n#EXT-X-BYTERANGE:100\nseg.ts\n";
        assert!(matches!(
            parse_manifest(text, BASE),
            Err(StitchError::ManifestFormat { line: 2, .. })
        ));
    }

    #[test]
    fn zero_length_and_overflowing_ranges_are_malformed() {
        let text = "#EXTINF:1,\n#EXT-X-BYTERANGE:0@10\nseg.ts\n";
        assert!(matches!(
            parse_manifest(text, BASE),
            Err(StitchError::ManifestFormat { .. })
        ));

        let text = format!("#EXTINF:1,\n#EXT-X-BYTERANGE:10@{}\nseg.ts\n", u64::MAX);
        assert!(matches!(
            parse_manifest(&text, BASE),
            Err(StitchError::ManifestFormat { .. })
        ));

        let text = "#EXTINF:1,\n#EXT-X-BYTERANGE:99999999999999999999999@0\nseg.ts\n";
        assert!(matches!(
            parse_manifest(text, BASE),
            Err(StitchError::ManifestFormat { .. })
        ));
    }

    #[test]
    fn implicit_offset_continues_previous_range() {
        let parser = ManifestParser::new(ParserOptions {
            allow_implicit_offset: true,
        });
        let text = "#EXTINF:1,\n#EXT-X-BYTERANGE:100@0\nv.mp4\n#EXTINF:1,\n#EXT-X-BYTERANGE:50\nv.mp4\n";
        let manifest = parser.parse(text, BASE).unwrap();
        assert_eq!(manifest.segments()[1].byte_range, ByteRange::new(100, 150));
    }

    #[test]
    fn implicit_offset_needs_same_resource() {
        let parser = ManifestParser::new(ParserOptions {
            allow_implicit_offset: true,
        });
        let text = "#EXTINF:1,\n#EXT-X-BYTERANGE:100@0\na.mp4\n#EXTINF:1,\n#EXT-X-BYTERANGE:50\nb.mp4\n";
        assert!(matches!(
            parser.parse(text, BASE),
            Err(StitchError::ManifestFormat { line: 5, .. })
        ));

        let text = "#EXTINF:1,\n#EXT-X-BYTERANGE:50\nb.mp4\n";
        assert!(parser.parse(text, BASE).is_err());
    }

    #[test]
    fn manifest_without_info_markers_is_empty() {
        let text = "#EXTM3U\n#EXT-X-VERSION:3\nseg.ts\n";
        let manifest = parse_manifest(text, BASE).unwrap();
        assert!(manifest.is_empty());
        assert!(parse_manifest("", BASE).unwrap().is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "#EXTINF:6.006,title\n#EXT-X-BYTERANGE:1024@0\nmain.mp4\n#EXTINF:6.006,\nnext.ts\n";
        let a = parse_manifest(text, BASE).unwrap();
        let b = parse_manifest(text, BASE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duration_tolerates_garbage() {
        assert_eq!(parse_duration("10.5,Title"), Some(10.5));
        assert_eq!(parse_duration(" 4 "), Some(4.0));
        assert_eq!(parse_duration("abc,"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("-1,"), None);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            parse_manifest("#EXTINF:1,\nseg.ts\n", "not a url"),
            Err(StitchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn base_url_strips_last_segment_and_query() {
        let url = Url::parse("http://h/a/b/index.m3u8").unwrap();
        assert_eq!(base_url_for(&url).unwrap().as_str(), "http://h/a/b/");

        let url = Url::parse("https://cdn.example.com/v/master.m3u8?token=1#frag").unwrap();
        assert_eq!(base_url_for(&url).unwrap().as_str(), "https://cdn.example.com/v/");

        let url = Url::parse("http://h/a/b/").unwrap();
        assert_eq!(base_url_for(&url).unwrap().as_str(), "http://h/a/b/");

        let url = Url::parse("http://h").unwrap();
        assert_eq!(base_url_for(&url).unwrap().as_str(), "http://h/");
    }
}
