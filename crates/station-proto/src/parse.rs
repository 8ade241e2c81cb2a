//! Pure parsers for the audio engine's control-port responses.
//!
//! The control protocol is free text with no schema. Two shapes matter:
//! metadata dumps (key=value lines, one `filename="..."` line per track)
//! and queue listings (a single whitespace-separated line of request ids,
//! terminated by an `END` sentinel). The delimiter widths below are part
//! of the wire format and must not change: `filename="` is exactly
//! [`FILENAME_PREFIX_LEN`] bytes and the value is closed by one trailing
//! quote.
//!
//! Both functions are pure text transforms. Existence filtering takes an
//! injected predicate so callers decide where disk I/O happens.

use std::path::{Path, PathBuf};

/// Marker starting a metadata line that carries a file path.
pub const FILENAME_MARKER: &str = "filename";

/// Byte width of the `filename="` prefix.
pub const FILENAME_PREFIX_LEN: usize = 10;

/// Sentinel line terminating list-style responses.
pub const END_SENTINEL: &str = "END";

/// Extract file paths from a metadata dump, in source order, keeping only
/// paths for which `exists` returns true. The engine happily reports
/// tracks whose files were deleted after being queued; those are dropped
/// silently, not errors.
pub fn existing_paths<F>(text: &str, exists: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let mut paths = Vec::new();
    for line in text.lines() {
        if !line.starts_with(FILENAME_MARKER) {
            continue;
        }
        // filename="/path/to/file.ogg"  →  /path/to/file.ogg
        let Some(value) = line.get(FILENAME_PREFIX_LEN..) else {
            continue;
        };
        let Some(path) = value.get(..value.len().saturating_sub(1)) else {
            continue;
        };
        if path.is_empty() {
            continue;
        }
        let path = PathBuf::from(path);
        if exists(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Extract the ordered request ids from a queue listing.
///
/// The response is CRLF-delimited; the `END` sentinel and blank lines are
/// discarded and the first surviving line is split on whitespace. An empty
/// queue yields an empty vec — that is a valid result, not an error.
pub fn queue_request_ids(text: &str) -> Vec<String> {
    let Some(line) = text
        .split("\r\n")
        .map(|l| l.trim_end_matches('\n'))
        .find(|l| !l.is_empty() && *l != END_SENTINEL)
    else {
        return Vec::new();
    };
    line.split_whitespace().map(|id| id.to_string()).collect()
}
