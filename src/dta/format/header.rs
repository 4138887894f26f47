//! File header decoding for both container layouts.
//!
//! The first byte of the file decides the dialect: `<` opens the tagged
//! ASCII envelope of releases 117-119, anything else is the release byte
//! of a legacy (105-115) file. Both paths produce the same [`DtaHeader`].

use std::io::{Read, Seek};

use log::{debug, trace};

use crate::dta::byte_reader::ByteReader;
use crate::dta::format::tags;
use crate::dta::types::error::{DtaError, Result};
use crate::dta::types::models::{ByteOrder, DtaHeader, DtaVersion};

/// The tagged header envelope fits comfortably in this window.
const HEADER_WINDOW: usize = 4096;

/// Decodes the file header, leaving the reader positioned after it.
///
/// For the tagged dialect that means just past `</header>`; for the legacy
/// dialect, at the first byte of the variable-types section.
pub fn parse<R: Read + Seek>(reader: &mut ByteReader<R>) -> Result<DtaHeader> {
    let first = reader.read_u8()?;
    if first == b'<' {
        parse_tagged(reader)
    } else {
        parse_legacy(reader, first)
    }
}

/// Legacy layout: contiguous fixed-width fields, no framing.
fn parse_legacy<R: Read + Seek>(reader: &mut ByteReader<R>, release: u8) -> Result<DtaHeader> {
    let version = DtaVersion::try_from(release)?;
    debug!("legacy header, release {}", release);

    let byte_order = match reader.read_u8()? {
        0x01 => ByteOrder::BigEndian,
        0x02 => ByteOrder::LittleEndian,
        other => {
            return Err(DtaError::InvalidFormat(format!(
                "invalid byte-order marker {:#04x} in legacy header",
                other
            )))
        }
    };
    reader.set_order(byte_order);

    let filetype = reader.read_u8()?;
    // One unused padding byte between filetype and nvar.
    reader.skip(1)?;

    let nvar = reader.read_u16()?;
    let nobs = reader.read_u32()? as u64;

    let encoding = version.encoding();
    let data_label = reader.read_nul_padded(81, encoding, "data label")?;
    let timestamp = reader.read_nul_padded(18, encoding, "timestamp")?;

    Ok(DtaHeader {
        version,
        byte_order,
        filetype,
        nvar,
        nobs,
        data_label,
        timestamp,
    })
}

/// Tagged layout: ASCII tags framing fixed-width binary fields.
///
/// The whole envelope is read into a bounded window once; tag positions
/// are found by subsequence search and the binary interiors are then read
/// through the seekable reader with the established byte order.
fn parse_tagged<R: Read + Seek>(reader: &mut ByteReader<R>) -> Result<DtaHeader> {
    reader.seek(0)?;
    let window_len = reader.len().min(HEADER_WINDOW as u64) as usize;
    let window = reader.read_exact_vec(window_len, "tagged header window")?;

    let release_at = require_tag(&window, "<release>")?;
    let version = parse_release(&window, release_at)?;
    debug!("tagged header, release {}", version.release());

    let byteorder_at = require_tag(&window, "<byteorder>")?;
    let byte_order = parse_byte_order(&window, byteorder_at)?;
    reader.set_order(byte_order);

    // <K> and <N> hold binary integers in the order just established.
    let k_at = require_tag(&window, "<K>")?;
    reader.seek(k_at + "<K>".len() as u64)?;
    let nvar = reader.read_u16()?;

    let n_at = require_tag(&window, "<N>")?;
    reader.seek(n_at + "<N>".len() as u64)?;
    let nobs = if version.nobs_width() == 8 {
        reader.read_u64()?
    } else {
        reader.read_u32()? as u64
    };

    let encoding = version.encoding();

    let label_at = require_tag(&window, "<label>")?;
    reader.seek(label_at + "<label>".len() as u64)?;
    let data_label = if version >= DtaVersion::V118 {
        // Length-prefixed rather than NUL-padded from 118 on.
        let len = reader.read_u16()? as usize;
        let bytes = reader.read_exact_vec(len, "data label")?;
        let (text, _, _) = encoding.decode(&bytes);
        text.into_owned()
    } else {
        reader.read_nul_padded(81, encoding, "data label")?
    };

    let timestamp_at = require_tag(&window, "<timestamp>")?;
    reader.seek(timestamp_at + "<timestamp>".len() as u64)?;
    let timestamp = reader.read_nul_padded(18, encoding, "timestamp")?;

    let close_at = require_tag(&window, "</header>")?;
    reader.seek(close_at + "</header>".len() as u64)?;
    trace!("tagged header ends at offset {}", close_at + 9);

    Ok(DtaHeader {
        version,
        byte_order,
        filetype: 0,
        nvar,
        nobs,
        data_label,
        timestamp,
    })
}

/// Absolute offset of `tag` in the header window.
fn require_tag(window: &[u8], tag: &str) -> Result<u64> {
    tags::find_subsequence(window, tag.as_bytes())
        .map(|idx| idx as u64)
        .ok_or_else(|| DtaError::InvalidFormat(format!("missing {} tag in header", tag)))
}

/// Three ASCII digits follow `<release>`.
fn parse_release(window: &[u8], release_at: u64) -> Result<DtaVersion> {
    let digits_at = release_at as usize + "<release>".len();
    let digits = window.get(digits_at..digits_at + 3).ok_or_else(|| {
        DtaError::InvalidFormat("truncated <release> field".to_string())
    })?;
    let release: u8 = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            DtaError::InvalidFormat(format!("non-numeric release field {:?}", digits))
        })?;
    DtaVersion::try_from(release)
}

/// `LSF` or `MSF` follows `<byteorder>`.
fn parse_byte_order(window: &[u8], byteorder_at: u64) -> Result<ByteOrder> {
    let text_at = byteorder_at as usize + "<byteorder>".len();
    match window.get(text_at..text_at + 3) {
        Some(b"LSF") => Ok(ByteOrder::LittleEndian),
        Some(b"MSF") => Ok(ByteOrder::BigEndian),
        other => Err(DtaError::InvalidFormat(format!(
            "invalid <byteorder> field {:?}",
            other.map(String::from_utf8_lossy)
        ))),
    }
}
