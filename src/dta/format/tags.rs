//! Section tag location for the tagged (>= 117) dialect.
//!
//! Tagged files frame binary payloads with human-readable ASCII tags
//! (`<varnames>...</varnames>`). The payloads are raw bytes, not XML text,
//! so sections are located by byte-subsequence scanning rather than by an
//! XML parser. Scans are bounded-memory: short sections use a fixed-size
//! window, variable-size sections are skipped in streaming chunks.

use std::io::{Read, Seek};

use log::trace;

use crate::dta::byte_reader::ByteReader;
use crate::dta::types::error::{DtaError, Result};

/// Window size for locating a tag that is expected nearby.
const SCAN_WINDOW: usize = 4096;

/// Chunk size for streaming skips over variable-size sections.
const STREAM_CHUNK: usize = 64 * 1024;

/// First index of `needle` in `haystack`, if any.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Last index of `needle` in `haystack`, if any.
pub fn rfind_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Scans forward from the current position for `<name>` and leaves the
/// reader positioned on the first payload byte.
///
/// The scan is bounded to a small window; intervening content it does not
/// understand (such as the `<map>` section) is skipped over silently.
pub fn scan_to_open<R: Read + Seek>(reader: &mut ByteReader<R>, name: &str) -> Result<()> {
    if !try_scan_to_open(reader, name)? {
        return Err(DtaError::InvalidFormat(format!("missing <{}> tag", name)));
    }
    Ok(())
}

/// Like [`scan_to_open`] but restores the position and returns `false`
/// when the tag is not found within the window.
pub fn try_scan_to_open<R: Read + Seek>(reader: &mut ByteReader<R>, name: &str) -> Result<bool> {
    let tag = format!("<{}>", name);
    let start = reader.position()?;
    let window = (reader.len().saturating_sub(start)).min(SCAN_WINDOW as u64) as usize;
    let buf = reader.read_exact_vec(window, "tag scan window")?;

    match find_subsequence(&buf, tag.as_bytes()) {
        Some(idx) => {
            let payload = start + idx as u64 + tag.len() as u64;
            trace!("located <{}> at offset {}", name, start + idx as u64);
            reader.seek(payload)?;
            Ok(true)
        }
        None => {
            reader.seek(start)?;
            Ok(false)
        }
    }
}

/// Requires `</name>` at the current position and consumes it.
///
/// Used after a fixed-size payload has been read in full; a mismatch means
/// the section was shorter or longer than the metadata implied.
pub fn expect_close<R: Read + Seek>(reader: &mut ByteReader<R>, name: &str) -> Result<()> {
    let tag = format!("</{}>", name);
    let offset = reader.position()?;
    let buf = reader.read_exact_vec(tag.len(), "section close tag")?;
    if buf != tag.as_bytes() {
        return Err(DtaError::InvalidFormat(format!(
            "expected </{}> at offset {}",
            name, offset
        )));
    }
    Ok(())
}

/// Streams forward from the current position until just past `</name>`.
///
/// Memory use is bounded by the chunk size regardless of section length.
/// Reaching end-of-file without the tag is `InvalidFormat`.
pub fn skip_past_close<R: Read + Seek>(reader: &mut ByteReader<R>, name: &str) -> Result<()> {
    let tag = format!("</{}>", name);
    let needle = tag.as_bytes();
    let mut pos = reader.position()?;
    let len = reader.len();
    // Chunks overlap by taglen-1 bytes so a tag straddling a boundary is
    // still seen.
    while pos < len {
        let take = (len - pos).min(STREAM_CHUNK as u64) as usize;
        let buf = reader.read_exact_vec(take, "section skip")?;
        if let Some(idx) = find_subsequence(&buf, needle) {
            reader.seek(pos + idx as u64 + needle.len() as u64)?;
            trace!("skipped past </{}> at offset {}", name, pos + idx as u64);
            return Ok(());
        }
        if pos + take as u64 >= len {
            break;
        }
        pos += (take - (needle.len() - 1)) as u64;
        reader.seek(pos)?;
    }
    Err(DtaError::InvalidFormat(format!(
        "missing </{}> tag",
        name
    )))
}

/// Searches a tail window of the file for the last occurrence of `needle`
/// and returns its absolute offset, if found at or after `floor`.
pub fn rfind_in_tail<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    needle: &[u8],
    floor: u64,
    window: u64,
) -> Result<Option<u64>> {
    let len = reader.len();
    let start = len.saturating_sub(window).max(floor);
    if start >= len {
        return Ok(None);
    }
    reader.seek(start)?;
    let buf = reader.read_exact_vec((len - start) as usize, "tail scan")?;
    Ok(rfind_subsequence(&buf, needle).map(|idx| start + idx as u64))
}
