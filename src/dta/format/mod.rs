//! File format decoding layer for `.dta` files.
//!
//! This is the mid-level layer between raw byte reads and the high-level
//! [`DtaReader`](crate::dta::reader::DtaReader).
//!
//! # Module Organization
//!
//! - [`tags`]: section tag location for the tagged (>= 117) dialect
//! - [`header`]: header decoding, legacy and tagged
//! - [`metadata`]: per-variable metadata sections
//! - [`cursor`]: data region location and row decoding
//!
//! # Architecture
//!
//! ```text
//! File structure (both dialects):
//! ┌──────────────────┐
//! │  Header          │ ← header::parse()
//! ├──────────────────┤
//! │  Variable        │ ← metadata::parse()
//! │  metadata        │
//! │  sections        │
//! ├──────────────────┤
//! │  Fixed-width     │ ← cursor::DataCursor
//! │  row data        │
//! └──────────────────┘
//! ```

pub mod cursor;
pub mod header;
pub mod metadata;
pub mod tags;
