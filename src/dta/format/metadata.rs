//! Per-variable metadata sections.
//!
//! After the header come arrays of `nvar` entries each: type codes, names,
//! the sort order, display formats, value-label names and variable labels,
//! followed by the characteristics section. Field widths come from
//! [`DtaVersion`]; the tagged dialect additionally frames every section in
//! `<name>...</name>` tags.

use std::io::{Read, Seek};

use log::debug;

use crate::dta::byte_reader::ByteReader;
use crate::dta::format::tags;
use crate::dta::types::error::Result;
use crate::dta::types::models::{DtaHeader, DtaVersion, VarType, Variable};

/// Decodes all metadata sections, leaving the reader positioned right
/// after them (just before the data region for legacy files, before the
/// `<data>` tag for tagged ones).
pub fn parse<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    header: &DtaHeader,
) -> Result<Vec<Variable>> {
    let sections = if header.version.is_tagged() {
        parse_tagged(reader, header)?
    } else {
        parse_legacy(reader, header)?
    };
    debug!(
        "metadata decoded: {} variables, first = {:?}",
        sections.len(),
        sections.first().map(|v| v.name.as_str())
    );
    Ok(sections)
}

fn parse_legacy<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    header: &DtaHeader,
) -> Result<Vec<Variable>> {
    let nvar = header.nvar as usize;
    let version = header.version;
    let encoding = version.encoding();

    let mut types = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        types.push(VarType::from_legacy_code(reader.read_u8()?)?);
    }

    let mut names = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        names.push(reader.read_nul_padded(version.name_field_len(), encoding, "variable name")?);
    }

    skip_sort_order(reader, nvar)?;

    let mut formats = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        formats.push(reader.read_nul_padded(
            version.format_field_len(),
            encoding,
            "display format",
        )?);
    }

    let mut value_label_names = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        value_label_names.push(reader.read_nul_padded(
            version.value_label_name_field_len(),
            encoding,
            "value-label name",
        )?);
    }

    let mut labels = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        labels.push(reader.read_nul_padded(
            version.variable_label_field_len(),
            encoding,
            "variable label",
        )?);
    }

    // Legacy characteristics (expansion fields) are not parsed; the data
    // cursor compensates for the writer quirk they cause in release 114.

    Ok(assemble(types, names, formats, value_label_names, labels))
}

fn parse_tagged<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    header: &DtaHeader,
) -> Result<Vec<Variable>> {
    let nvar = header.nvar as usize;
    let version = header.version;
    let encoding = version.encoding();

    // The <map> section between the header and <variable_types> is not
    // consumed; the forward scan steps over it.
    tags::scan_to_open(reader, "variable_types")?;
    let mut types = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        types.push(read_tagged_type(reader, version)?);
    }
    tags::expect_close(reader, "variable_types")?;

    tags::scan_to_open(reader, "varnames")?;
    let mut names = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        names.push(reader.read_nul_padded(version.name_field_len(), encoding, "variable name")?);
    }
    tags::expect_close(reader, "varnames")?;

    if tags::try_scan_to_open(reader, "sortlist")? {
        skip_sort_order(reader, nvar)?;
        tags::expect_close(reader, "sortlist")?;
    }

    tags::scan_to_open(reader, "formats")?;
    let mut formats = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        formats.push(reader.read_nul_padded(
            version.format_field_len(),
            encoding,
            "display format",
        )?);
    }
    tags::expect_close(reader, "formats")?;

    let value_label_names = read_optional_section(
        reader,
        "value_label_names",
        nvar,
        version.value_label_name_field_len(),
        encoding,
        "value-label name",
    )?;

    let labels = read_optional_section(
        reader,
        "variable_labels",
        nvar,
        version.variable_label_field_len(),
        encoding,
        "variable label",
    )?;

    // Characteristics are read and discarded.
    if tags::try_scan_to_open(reader, "characteristics")? {
        tags::skip_past_close(reader, "characteristics")?;
    }

    Ok(assemble(types, names, formats, value_label_names, labels))
}

/// One type-code slot: a single byte through 117, a 2-byte little-endian
/// slot from 118 on. The full slot value is matched so strL (0x8000) is
/// rejected precisely.
fn read_tagged_type<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    version: DtaVersion,
) -> Result<VarType> {
    let code = if version.type_code_width() == 2 {
        let lo = reader.read_u8()? as u16;
        let hi = reader.read_u8()? as u16;
        lo | (hi << 8)
    } else {
        reader.read_u8()? as u16
    };
    VarType::from_tagged_code(code)
}

/// A per-variable string section that some writers omit; absence yields
/// empty strings for every variable.
fn read_optional_section<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    name: &str,
    nvar: usize,
    field_len: usize,
    encoding: &'static encoding_rs::Encoding,
    context: &'static str,
) -> Result<Vec<String>> {
    if !tags::try_scan_to_open(reader, name)? {
        debug!("section <{}> absent, defaulting to empty", name);
        return Ok(vec![String::new(); nvar]);
    }
    let mut entries = Vec::with_capacity(nvar);
    for _ in 0..nvar {
        entries.push(reader.read_nul_padded(field_len, encoding, context)?);
    }
    tags::expect_close(reader, name)?;
    Ok(entries)
}

/// The sort order is 2 bytes per variable plus a 2-byte terminator, in
/// both dialects. It is read and discarded.
fn skip_sort_order<R: Read + Seek>(reader: &mut ByteReader<R>, nvar: usize) -> Result<()> {
    reader.skip(2 * (nvar as u64 + 1))?;
    Ok(())
}

fn assemble(
    types: Vec<VarType>,
    names: Vec<String>,
    formats: Vec<String>,
    value_label_names: Vec<String>,
    labels: Vec<String>,
) -> Vec<Variable> {
    types
        .into_iter()
        .zip(names)
        .zip(formats)
        .zip(value_label_names)
        .zip(labels)
        .map(|((((ty, name), format), value_label_name), label)| Variable {
            name,
            ty,
            format,
            value_label_name,
            label,
        })
        .collect()
}
