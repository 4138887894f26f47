//! Data region location and fixed-width row decoding.
//!
//! Rows are laid out back to back: row `i` starts at
//! `data_offset + i * row_width`, columns in declaration order, each value
//! occupying its type's on-disk width. Numeric sentinel values decode to
//! NULL cells; strings decode to the prefix before the first NUL.

use std::io::{Read, Seek};

use encoding_rs::Encoding;
use log::{debug, trace, warn};

use crate::dta::batch::{Column, ColumnBatch};
use crate::dta::byte_reader::{decode_nul_terminated, ByteReader};
use crate::dta::format::tags;
use crate::dta::types::error::Result;
use crate::dta::types::models::{
    DtaHeader, DtaVersion, VarType, Variable, BYTE_MISSING_MIN, DOUBLE_MISSING_MIN,
    INT_MISSING_MIN, LONG_MISSING_MIN,
};

/// Tail window searched for a displaced `</data>` tag.
const DATA_END_TAIL_WINDOW: u64 = 1024 * 1024;

/// Resolved position and extent of the fixed-layout data region.
#[derive(Debug, Clone, Copy)]
pub struct DataCursor {
    pub data_offset: u64,
    pub row_width: u64,
    /// Observation count after defensive truncation to whole rows that
    /// actually fit in the region.
    pub nobs: u64,
}

/// Sum of on-disk column widths for one observation.
pub fn row_width(variables: &[Variable]) -> u64 {
    variables.iter().map(|v| v.ty.width() as u64).sum()
}

impl DataCursor {
    /// Locates the data region from the reader's current position (just
    /// past the metadata sections) and truncates `nobs` to the rows that
    /// fit.
    pub fn locate<R: Read + Seek>(
        reader: &mut ByteReader<R>,
        header: &DtaHeader,
        variables: &[Variable],
    ) -> Result<Self> {
        let row_width = row_width(variables);

        let (data_offset, region) = if header.version.is_tagged() {
            tags::scan_to_open(reader, "data")?;
            let data_offset = reader.position()?;
            let region = tagged_region(reader, data_offset, header.nobs, row_width)?;
            (data_offset, region)
        } else {
            let mut data_offset = reader.position()?;
            // Third-party writers pad release-114 files with 5 bytes of
            // expansion-field terminator before the data.
            if header.version == DtaVersion::V114 {
                data_offset += 5;
            }
            (data_offset, reader.len().saturating_sub(data_offset))
        };

        let mut nobs = header.nobs;
        if row_width > 0 {
            let fitting = region / row_width;
            if fitting < nobs {
                warn!(
                    "data region holds {} whole rows, header claims {}; truncating",
                    fitting, nobs
                );
                nobs = fitting;
            }
        }

        debug!(
            "data region at offset {}, row width {}, {} observations",
            data_offset, row_width, nobs
        );

        Ok(Self {
            data_offset,
            row_width,
            nobs,
        })
    }

    /// Decodes up to `max_rows` rows starting at observation `rows_read`
    /// into a fresh column batch.
    pub fn read_rows<R: Read + Seek>(
        &self,
        reader: &mut ByteReader<R>,
        header: &DtaHeader,
        variables: &[Variable],
        rows_read: u64,
        max_rows: usize,
    ) -> Result<ColumnBatch> {
        let remaining = self.nobs.saturating_sub(rows_read);
        let take = remaining.min(max_rows as u64) as usize;

        let mut columns: Vec<Column> = variables
            .iter()
            .map(|v| Column::with_capacity(v, take))
            .collect();

        if take > 0 {
            reader.seek(self.data_offset + rows_read * self.row_width)?;
            let encoding = header.version.encoding();
            for _ in 0..take {
                for (var, column) in variables.iter().zip(columns.iter_mut()) {
                    decode_value(reader, var, encoding, column)?;
                }
            }
        }

        trace!("decoded {} rows starting at observation {}", take, rows_read);
        Ok(ColumnBatch::new(columns, take as u32))
    }
}

/// Extent of the tagged data region in bytes.
///
/// The nominal end is `data_offset + nobs * row_width`, verified against
/// the `</data>` tag. A file that was truncated or miswritten falls back
/// to the last `</data>` occurrence in the file tail, and finally to
/// end-of-file, so that the caller's row truncation stays defensive
/// rather than fatal.
fn tagged_region<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    data_offset: u64,
    nobs: u64,
    row_width: u64,
) -> Result<u64> {
    let close = b"</data>";
    let nominal_end = data_offset + nobs * row_width;

    if nominal_end + close.len() as u64 <= reader.len() {
        reader.seek(nominal_end)?;
        let probe = reader.read_exact_vec(close.len(), "data close tag")?;
        if probe == close {
            return Ok(nobs * row_width);
        }
    }

    if let Some(at) = tags::rfind_in_tail(reader, close, data_offset, DATA_END_TAIL_WINDOW)? {
        warn!(
            "</data> not at the expected offset {}; using tag found at {}",
            nominal_end, at
        );
        return Ok(at - data_offset);
    }

    warn!("</data> tag not found; treating end of file as end of data");
    Ok(reader.len().saturating_sub(data_offset))
}

/// Decodes one on-disk value into its column, applying the missing-value
/// sentinel rules.
fn decode_value<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    var: &Variable,
    encoding: &'static Encoding,
    column: &mut Column,
) -> Result<()> {
    match var.ty {
        VarType::Str(w) => {
            let bytes = reader.read_exact_vec(w as usize, "string cell")?;
            column.push_varchar(decode_nul_terminated(&bytes, encoding));
        }
        VarType::Byte => {
            let value = reader.read_i8()?;
            if value >= BYTE_MISSING_MIN {
                column.push_null();
            } else {
                column.push_tinyint(value);
            }
        }
        VarType::Int => {
            let value = reader.read_i16()?;
            if value >= INT_MISSING_MIN {
                column.push_null();
            } else {
                column.push_smallint(value);
            }
        }
        VarType::Long => {
            let value = reader.read_i32()?;
            if value >= LONG_MISSING_MIN {
                column.push_null();
            } else {
                column.push_integer(value);
            }
        }
        VarType::Float => {
            let value = reader.read_f32()?;
            if value.is_nan() {
                column.push_null();
            } else {
                column.push_float(value);
            }
        }
        VarType::Double => {
            let value = reader.read_f64()?;
            if value >= DOUBLE_MISSING_MIN {
                column.push_null();
            } else {
                column.push_double(value);
            }
        }
    }
    Ok(())
}
