//! Iterator adapter for sequential batch access.
//!
//! [`Chunks`] wraps [`DtaReader::next_chunk`](crate::DtaReader::next_chunk)
//! so callers can drive the whole file with a `for` loop:
//!
//! ```no_run
//! # use dta_reader::DtaReader;
//! # let mut reader = DtaReader::new("survey.dta");
//! # reader.open().unwrap();
//! for batch in reader.chunks(1024) {
//!     let batch = batch.unwrap();
//!     println!("{} rows", batch.cardinality());
//! }
//! ```

use super::batch::ColumnBatch;
use super::reader::DtaReader;
use super::types::error::Result;

/// Iterator over column batches of at most `cap` rows each.
///
/// Yields `Result<ColumnBatch>` until the reader is exhausted; a decode
/// error is yielded once and ends the iteration (the reader is
/// invalidated by then).
pub struct Chunks<'a> {
    reader: &'a mut DtaReader,
    cap: usize,
}

impl<'a> Chunks<'a> {
    pub(super) fn new(reader: &'a mut DtaReader, cap: usize) -> Self {
        // A zero cap would never make progress.
        Self {
            reader,
            cap: cap.max(1),
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = Result<ColumnBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_chunk(self.cap).transpose()
    }
}
