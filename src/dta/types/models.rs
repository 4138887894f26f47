//! Core data structures for the `.dta` format.
//!
//! This module defines the fundamental types used throughout the library:
//! - File header and per-variable metadata
//! - Release and byte-order enumerations
//! - The variable type system and its missing-value sentinel rules

use encoding_rs::Encoding;

use super::error::{DtaError, Result};

/// Byte order of all multi-byte fields following the header's order marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// A supported `.dta` release.
///
/// Releases 105-115 use the compact legacy layout; 117-119 use the tagged
/// layout framed by ASCII tags. Field widths vary by release and are
/// centralised here so the decoders stay layout-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DtaVersion {
    V105,
    V108,
    V111,
    V113,
    V114,
    V115,
    V117,
    V118,
    V119,
}

impl DtaVersion {
    /// The numeric release as stored on disk.
    pub fn release(&self) -> u8 {
        match self {
            DtaVersion::V105 => 105,
            DtaVersion::V108 => 108,
            DtaVersion::V111 => 111,
            DtaVersion::V113 => 113,
            DtaVersion::V114 => 114,
            DtaVersion::V115 => 115,
            DtaVersion::V117 => 117,
            DtaVersion::V118 => 118,
            DtaVersion::V119 => 119,
        }
    }

    /// Whether this release uses the tagged (ASCII-framed) container.
    pub fn is_tagged(&self) -> bool {
        *self >= DtaVersion::V117
    }

    /// On-disk width of the observation count: u64 for >= 118, u32 before.
    pub fn nobs_width(&self) -> usize {
        if *self >= DtaVersion::V118 { 8 } else { 4 }
    }

    /// On-disk width of one type-code slot in the tagged dialect.
    ///
    /// Releases >= 118 use 2-byte little-endian slots; earlier tagged
    /// releases use single bytes.
    pub fn type_code_width(&self) -> usize {
        if *self >= DtaVersion::V118 { 2 } else { 1 }
    }

    /// Fixed width of one variable-name field, including NUL padding.
    pub fn name_field_len(&self) -> usize {
        if *self >= DtaVersion::V118 { 129 } else { 33 }
    }

    /// Fixed width of one display-format field.
    pub fn format_field_len(&self) -> usize {
        if *self >= DtaVersion::V118 { 57 } else { 49 }
    }

    /// Fixed width of one value-label-name field.
    pub fn value_label_name_field_len(&self) -> usize {
        if *self >= DtaVersion::V118 { 129 } else { 33 }
    }

    /// Fixed width of one variable-label field.
    pub fn variable_label_field_len(&self) -> usize {
        if *self >= DtaVersion::V118 { 321 } else { 81 }
    }

    /// Text encoding for fixed-width string fields and string cells.
    ///
    /// Older files carry Latin-1-ish bytes; Windows-1252 decodes them
    /// without loss. Releases >= 118 are UTF-8 (decoded lossily).
    pub fn encoding(&self) -> &'static Encoding {
        if *self >= DtaVersion::V118 {
            encoding_rs::UTF_8
        } else {
            encoding_rs::WINDOWS_1252
        }
    }
}

impl TryFrom<u8> for DtaVersion {
    type Error = DtaError;
    fn try_from(release: u8) -> Result<Self> {
        match release {
            105 => Ok(Self::V105),
            108 => Ok(Self::V108),
            111 => Ok(Self::V111),
            113 => Ok(Self::V113),
            114 => Ok(Self::V114),
            115 => Ok(Self::V115),
            117 => Ok(Self::V117),
            118 => Ok(Self::V118),
            119 => Ok(Self::V119),
            other => Err(DtaError::UnsupportedVersion(other)),
        }
    }
}

/// Decoded file header, unified across both container layouts.
#[derive(Debug, Clone)]
pub struct DtaHeader {
    pub version: DtaVersion,
    pub byte_order: ByteOrder,
    /// Legacy filetype byte; informational only, 0 for tagged files.
    pub filetype: u8,
    /// Number of variables (columns).
    pub nvar: u16,
    /// Number of observations (rows). May be truncated downward later if
    /// the data region turns out to be short.
    pub nobs: u64,
    pub data_label: String,
    /// "dd Mon yyyy hh:mm" or empty.
    pub timestamp: String,
}

/// The type of a single variable (column).
///
/// `Str` carries the declared on-disk width (1-244). The numeric variants
/// use Stata's own names: `Byte`/`Int`/`Long` are 1/2/4-byte signed
/// integers, `Float`/`Double` are IEEE 754.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Str(u8),
    Byte,
    Int,
    Long,
    Float,
    Double,
}

impl VarType {
    /// On-disk width of one value of this type, in bytes.
    pub fn width(&self) -> usize {
        match self {
            VarType::Str(w) => *w as usize,
            VarType::Byte => 1,
            VarType::Int => 2,
            VarType::Long => 4,
            VarType::Float => 4,
            VarType::Double => 8,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, VarType::Str(_))
    }

    /// Decodes a legacy (<= 115) type code.
    ///
    /// Character codes name the numeric types; anything in 1-244 is a
    /// string width.
    pub fn from_legacy_code(code: u8) -> Result<Self> {
        match code {
            b'b' => Ok(VarType::Byte),
            b'i' => Ok(VarType::Int),
            b'l' => Ok(VarType::Long),
            b'f' => Ok(VarType::Float),
            b'd' => Ok(VarType::Double),
            1..=244 => Ok(VarType::Str(code)),
            other => Err(DtaError::UnsupportedType { code: other as u16 }),
        }
    }

    /// Decodes a tagged (>= 117) type code.
    ///
    /// Code 32768 is strL, which this reader recognises but does not
    /// decode (no GSO sidecar support).
    pub fn from_tagged_code(code: u16) -> Result<Self> {
        match code {
            1..=244 => Ok(VarType::Str(code as u8)),
            251 => Ok(VarType::Byte),
            252 => Ok(VarType::Int),
            253 => Ok(VarType::Long),
            254 => Ok(VarType::Float),
            255 => Ok(VarType::Double),
            other => Err(DtaError::UnsupportedType { code: other }),
        }
    }
}

/// Lowest `Byte` value reserved for missing (`.`, `.a` .. `.z`).
pub const BYTE_MISSING_MIN: i8 = 101;
/// Lowest `Int` value reserved for missing.
pub const INT_MISSING_MIN: i16 = 32741;
/// Lowest `Long` value reserved for missing.
pub const LONG_MISSING_MIN: i32 = 2_147_483_621;
/// Lowest `Double` value reserved for missing. The base `.` sentinel is
/// 2^1023; the rounded threshold admits all 27 missing kinds.
pub const DOUBLE_MISSING_MIN: f64 = 8.988e307;

/// One variable (column) of the dataset.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: VarType,
    /// Display format string, e.g. `%9.0g`.
    pub format: String,
    /// Name of the value-label set this variable references; empty when absent.
    pub value_label_name: String,
    /// Human-readable description.
    pub label: String,
}

/// Logical column type handed to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    TinyInt,
    SmallInt,
    Integer,
    Float,
    Double,
    Varchar,
}

/// Maps a variable's on-disk type to the logical type its column carries.
pub fn stata_type_to_logical(var: &Variable) -> LogicalType {
    match var.ty {
        VarType::Str(_) => LogicalType::Varchar,
        VarType::Byte => LogicalType::TinyInt,
        VarType::Int => LogicalType::SmallInt,
        VarType::Long => LogicalType::Integer,
        VarType::Float => LogicalType::Float,
        VarType::Double => LogicalType::Double,
    }
}
