//! Custom error types for the dta-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum DtaError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixed-size read hit the end of the file early.
    #[error("Unexpected end of file while reading {context} at offset {offset}")]
    UnexpectedEof { context: &'static str, offset: u64 },

    /// The file is structurally invalid or does not conform to the `.dta` layout.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The release byte is outside the supported set (105-119).
    #[error("Unsupported .dta release: {0}. Supported releases: 105, 108, 111, 113-119")]
    UnsupportedVersion(u8),

    /// A variable carries a type code this reader cannot decode (includes strL).
    #[error("Unsupported variable type code: {code}")]
    UnsupportedType { code: u16 },
}

/// A convenience `Result` type alias using the crate's `DtaError` type.
pub type Result<T> = std::result::Result<T, DtaError>;
