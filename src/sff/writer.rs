//! SFF writer with a deferred read count
//!
//! The number of reads in an output is only known once all of them have been written,
//! but the count lives in the common header at the very start of the file. The writer
//! therefore emits the header lazily before the first record and rewrites it in place
//! when the output is finished.

use std::io::{Seek, SeekFrom, Write};

use super::header::CommonHeader;
use super::record::Record;
use crate::error::{Result, WriteError};

/// Writer for SFF files whose read count is patched on [`SffWriter::finish`]
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use sff_split::sff::{CommonHeader, ReadData, ReadHeader, Record, SffReader, SffWriter};
///
/// let header = CommonHeader::new(b"TACG".to_vec(), b"TCAG".to_vec());
/// let mut writer = SffWriter::new(Cursor::new(Vec::new()), header);
///
/// let record = Record {
///     header: ReadHeader::new(b"read".to_vec(), 4),
///     data: ReadData {
///         flowgram: vec![100, 0, 100, 200],
///         flow_index: vec![1, 2, 0, 2],
///         bases: b"TCAG".to_vec(),
///         quality: vec![30; 4],
///     },
/// };
/// writer.write_record(&record).unwrap();
///
/// let inner = writer.finish().unwrap();
/// let reader = SffReader::new(Cursor::new(inner.into_inner())).unwrap();
/// assert_eq!(reader.header().nreads, 1);
/// ```
pub struct SffWriter<W: Write + Seek> {
    /// The underlying writer for output
    inner: W,

    /// Header template; its read count is replaced on finish
    header: CommonHeader,

    /// Whether the header has been emitted at the start of the output
    header_written: bool,

    /// Number of records written
    records_written: u32,

    /// Identifier reported in errors (the pattern index for split outputs)
    id: usize,
}
impl<W: Write + Seek> SffWriter<W> {
    /// Creates a new writer; nothing is written until the first record or finish
    pub fn new(inner: W, header: CommonHeader) -> Self {
        Self::with_id(inner, header, 0)
    }

    /// Creates a new writer tagged with an identifier used in error reports
    pub fn with_id(inner: W, header: CommonHeader, id: usize) -> Self {
        Self {
            inner,
            header,
            header_written: false,
            records_written: 0,
            id,
        }
    }

    /// Writes the header template at the current position (the start of the output)
    pub fn write_header(&mut self) -> Result<()> {
        self.header.nreads = self.records_written;
        self.header.write_bytes(&mut self.inner)?;
        self.header_written = true;
        Ok(())
    }

    /// Writes a record, emitting the header first if this is the first record
    ///
    /// The record is checked against the header before anything is written.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        record.validate(self.header.flow_len())?;
        let count = self
            .records_written
            .checked_add(1)
            .ok_or(WriteError::CountOverflow(self.id))?;
        if !self.header_written {
            self.write_header()?;
        }
        record.write_bytes(&mut self.inner)?;
        self.records_written = count;
        Ok(())
    }

    /// Returns the number of records written
    #[must_use]
    pub fn records_written(&self) -> u32 {
        self.records_written
    }

    /// Checks whether the header has been emitted
    #[must_use]
    pub fn is_header_written(&self) -> bool {
        self.header_written
    }

    /// Returns the header template
    #[must_use]
    pub fn header(&self) -> &CommonHeader {
        &self.header
    }

    /// Flushes any buffered data to the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Rewrites the header with the final read count and returns the inner writer
    ///
    /// The writer seeks back to the start of the output and encodes the header with the
    /// number of records written. An output that never received a record still gets a
    /// header, so it is a valid empty SFF file.
    pub fn finish(mut self) -> Result<W> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.write_header()?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}
