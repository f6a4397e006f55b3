//! Sequential SFF reader
//!
//! The reader decodes and verifies the common header on construction, then yields
//! exactly as many records as the header announces. Any index section that follows the
//! reads is never touched.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, warn};

use super::header::{CommonHeader, FLOWGRAM_FORMAT};
use super::record::Record;
use crate::error::{ResourceError, Result};

/// A reader for streaming SFF records from any source that implements `Read`
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use sff_split::sff::{CommonHeader, SffReader};
///
/// let header = CommonHeader::new(b"TACG".to_vec(), b"TCAG".to_vec());
/// let mut bytes = Vec::new();
/// header.write_bytes(&mut bytes).unwrap();
///
/// let mut reader = SffReader::new(Cursor::new(bytes)).unwrap();
/// assert_eq!(reader.header().nreads, 0);
/// assert!(reader.next_record().is_none());
/// ```
pub struct SffReader<R: Read> {
    /// The source reader for SFF data
    inner: R,

    /// Verified common header of the file
    header: CommonHeader,

    /// Number of records decoded so far
    n_processed: u32,
}
impl<R: Read> SffReader<R> {
    /// Creates a new reader, decoding and verifying the common header
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The header is truncated
    /// * The magic number or version does not match
    pub fn new(mut inner: R) -> Result<Self> {
        let header = CommonHeader::from_reader(&mut inner)?;
        header.verify()?;
        if header.flowgram_format != FLOWGRAM_FORMAT {
            warn!(
                "Unexpected flowgram format code {:#x}; flow values are copied as-is",
                header.flowgram_format
            );
        }
        debug!(
            nreads = header.nreads,
            header_len = header.header_len,
            key_len = header.key_len(),
            flow_len = header.flow_len(),
            index_offset = header.index_offset,
            index_len = header.index_len,
            "Read common header"
        );
        Ok(Self {
            inner,
            header,
            n_processed: 0,
        })
    }

    /// Returns the common header of the file
    #[must_use]
    pub fn header(&self) -> &CommonHeader {
        &self.header
    }

    /// Returns the number of records decoded so far
    #[must_use]
    pub fn n_processed(&self) -> u32 {
        self.n_processed
    }

    /// Returns the number of records still to be decoded
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.header.nreads - self.n_processed
    }

    /// Decodes the next record
    ///
    /// Returns `None` once all records announced by the header have been read.
    pub fn next_record(&mut self) -> Option<Result<Record>> {
        if self.n_processed >= self.header.nreads {
            return None;
        }
        match Record::from_reader(&mut self.inner, self.header.flow_len()) {
            Ok(record) => {
                self.n_processed += 1;
                Some(Ok(record))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// The inner reader that was used by this `SffReader`
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl SffReader<Cursor<Mmap>> {
    /// Opens an SFF file by memory-mapping it
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be opened or mapped
    /// * The file is not a regular file
    /// * The common header is invalid
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source| ResourceError::OpenInput {
            path: path.to_path_buf(),
            source,
        };

        // Verify input file is a file before attempting to map
        let file = File::open(path).map_err(open_err)?;
        if !file.metadata().map_err(open_err)?.is_file() {
            return Err(ResourceError::IncompatibleFile(path.to_path_buf()).into());
        }

        // Safety: the file is open and won't be modified while mapped
        let mmap = unsafe { Mmap::map(&file).map_err(open_err)? };
        Self::new(Cursor::new(mmap))
    }
}
