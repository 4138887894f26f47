//! The high-level `.dta` reader façade.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::batch::ColumnBatch;
use super::byte_reader::ByteReader;
use super::chunks::Chunks;
use super::format::cursor::DataCursor;
use super::format::{header, metadata};
use super::types::error::{DtaError, Result};
use super::types::models::{DtaHeader, Variable};

/// Reader lifecycle: `Unopened -> Ready -> Exhausted -> Closed`.
///
/// `Closed` is reachable from every state, via [`DtaReader::close`] or a
/// decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Unopened,
    Ready,
    Exhausted,
    Closed,
}

/// The main reader for Stata `.dta` data files.
///
/// Supports releases 105, 108, 111, 113-115 (legacy layout) and 117-119
/// (tagged layout). The reader owns its file handle exclusively; it is not
/// safe for concurrent use; two threads should each hold their own
/// reader. Emitted [`ColumnBatch`]es own their buffers and may outlive the
/// reader.
///
/// # Example
/// ```no_run
/// # use dta_reader::DtaReader;
/// let mut reader = DtaReader::new("survey.dta");
/// reader.open().unwrap();
/// while let Some(batch) = reader.next_chunk(1024).unwrap() {
///     println!("{} rows", batch.cardinality());
/// }
/// ```
#[derive(Debug)]
pub struct DtaReader {
    path: PathBuf,
    source: Option<ByteReader<File>>,
    header: Option<DtaHeader>,
    variables: Vec<Variable>,
    cursor: Option<DataCursor>,
    rows_read: u64,
    state: ReaderState,
}

impl DtaReader {
    /// Pure constructor; no I/O happens until [`open`](Self::open).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            source: None,
            header: None,
            variables: Vec::new(),
            cursor: None,
            rows_read: 0,
            state: ReaderState::Unopened,
        }
    }

    /// Opens the file and decodes header and metadata.
    ///
    /// A second call after success is a no-op; a call after failure
    /// retries from scratch (a failed open leaves no side effects). A
    /// closed reader cannot be reopened.
    ///
    /// # Errors
    /// Returns [`DtaError`] if the file cannot be opened, the release is
    /// unsupported, a section is malformed, or a variable carries an
    /// undecodable type code.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            ReaderState::Ready | ReaderState::Exhausted => return Ok(()),
            ReaderState::Closed => {
                return Err(DtaError::InvalidFormat(
                    "reader has been closed".to_string(),
                ))
            }
            ReaderState::Unopened => {}
        }

        match self.open_inner() {
            Ok(()) => {
                self.state = ReaderState::Ready;
                Ok(())
            }
            Err(e) => {
                // Release the handle; header/variables were not committed.
                self.source = None;
                Err(e)
            }
        }
    }

    fn open_inner(&mut self) -> Result<()> {
        info!("Opening .dta file: {}", self.path.display());
        let file = File::open(&self.path)?;
        let mut source = ByteReader::new(file)?;

        let mut header = header::parse(&mut source)?;
        debug!(
            "header: release {}, {:?}, {} vars, {} obs",
            header.version.release(),
            header.byte_order,
            header.nvar,
            header.nobs
        );

        let variables = metadata::parse(&mut source, &header)?;
        let cursor = DataCursor::locate(&mut source, &header, &variables)?;
        // Defensive truncation is reflected in the header the caller sees.
        header.nobs = cursor.nobs;

        info!(
            "Opened release {} file: {} variables, {} observations",
            header.version.release(),
            header.nvar,
            header.nobs
        );

        self.source = Some(source);
        self.header = Some(header);
        self.variables = variables;
        self.cursor = Some(cursor);
        self.rows_read = 0;
        Ok(())
    }

    /// Decoded header; `None` before a successful open.
    pub fn header(&self) -> Option<&DtaHeader> {
        self.header.as_ref()
    }

    /// Variables in declaration order; empty before a successful open.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Whether another call to [`next_chunk`](Self::next_chunk) can yield
    /// rows.
    pub fn has_more(&self) -> bool {
        match (&self.state, &self.cursor) {
            (ReaderState::Ready, Some(cursor)) => self.rows_read < cursor.nobs,
            _ => false,
        }
    }

    /// Decodes the next batch of at most `cap` rows.
    ///
    /// Returns `Ok(None)` once the stream is exhausted; calls past that
    /// point keep returning `Ok(None)` without touching the file.
    ///
    /// # Errors
    /// A decode failure invalidates the reader: the handle is released and
    /// every later call fails.
    pub fn next_chunk(&mut self, cap: usize) -> Result<Option<ColumnBatch>> {
        match self.state {
            ReaderState::Unopened => {
                return Err(DtaError::InvalidFormat(
                    "reader is not open".to_string(),
                ))
            }
            ReaderState::Closed => {
                return Err(DtaError::InvalidFormat(
                    "reader has been closed".to_string(),
                ))
            }
            ReaderState::Exhausted => return Ok(None),
            ReaderState::Ready => {}
        }

        if !self.has_more() {
            self.state = ReaderState::Exhausted;
            return Ok(None);
        }

        let result = self.read_batch(cap);
        match result {
            Ok(batch) => {
                self.rows_read += batch.cardinality() as u64;
                if let Some(cursor) = &self.cursor {
                    if self.rows_read >= cursor.nobs {
                        self.state = ReaderState::Exhausted;
                    }
                }
                Ok(Some(batch))
            }
            Err(e) => {
                // The reader is not recoverable after a mid-stream error.
                self.close();
                Err(e)
            }
        }
    }

    fn read_batch(&mut self, cap: usize) -> Result<ColumnBatch> {
        let source = self.source.as_mut().ok_or_else(|| {
            DtaError::InvalidFormat("reader has no open source".to_string())
        })?;
        let header = self.header.as_ref().ok_or_else(|| {
            DtaError::InvalidFormat("reader has no decoded header".to_string())
        })?;
        let cursor = self.cursor.as_ref().ok_or_else(|| {
            DtaError::InvalidFormat("reader has no located data region".to_string())
        })?;
        cursor.read_rows(source, header, &self.variables, self.rows_read, cap)
    }

    /// Releases the file handle. Subsequent reads fail; close is
    /// idempotent. Dropping the reader releases the handle the same way.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            info!("Closed .dta file: {}", self.path.display());
        }
        self.state = ReaderState::Closed;
    }

    /// Iterator adapter over [`next_chunk`](Self::next_chunk) with a fixed
    /// per-batch row cap.
    pub fn chunks(&mut self, cap: usize) -> Chunks<'_> {
        Chunks::new(self, cap)
    }
}
