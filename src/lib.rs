//! Reader for Stata `.dta` data files.
//!
//! Decodes the binary `.dta` family (releases 105-119), both the compact
//! legacy layout (<= 115) and the tagged, ASCII-framed layout (>= 117),
//! and emits rows as bounded-size, column-oriented [`ColumnBatch`]es with
//! per-cell NULL tracking, suitable for feeding an analytics engine.
//!
//! ```no_run
//! use dta_reader::DtaReader;
//!
//! let mut reader = DtaReader::new("survey.dta");
//! reader.open().unwrap();
//!
//! for var in reader.variables() {
//!     println!("{} ({:?})", var.name, var.ty);
//! }
//! for batch in reader.chunks(2048) {
//!     let batch = batch.unwrap();
//!     println!("decoded {} rows", batch.cardinality());
//! }
//! ```

pub mod dta;

pub use dta::{
    stata_type_to_logical, ByteOrder, Chunks, Column, ColumnBatch, ColumnValues, DtaError,
    DtaHeader, DtaReader, DtaVersion, LogicalType, Result, ValidityMask, VarType, Variable,
};
