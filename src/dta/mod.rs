//! Core `.dta` reader module

pub mod batch;
pub mod byte_reader;
pub mod chunks;
pub mod format;
pub mod reader;
pub mod types;

pub use batch::{Column, ColumnBatch, ColumnValues, ValidityMask};
pub use chunks::Chunks;
pub use reader::DtaReader;
pub use types::error::{DtaError, Result};
pub use types::models::{
    stata_type_to_logical, ByteOrder, DtaHeader, DtaVersion, LogicalType, VarType, Variable,
};
