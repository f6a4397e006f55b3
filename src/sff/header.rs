//! Common header of an SFF file
//!
//! The common header opens every SFF file. It carries the format constants, the number
//! of reads in the file, and the flow and key sequences shared by all reads. It is the
//! only section that is rewritten after the fact: split outputs patch the read count
//! once the whole input has been scanned.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use super::utils::{field_len, padded_len, read_padding, read_vec, truncated, write_padding};
use crate::error::{FormatError, Result, Section};

/// Magic number: ".sff" in ASCII (big-endian)
///
/// This is used to identify SFF files and verify file integrity.
#[allow(clippy::unreadable_literal)]
pub const MAGIC: u32 = 0x2E736666;

/// The only supported format version
pub const VERSION: [u8; 4] = [0, 0, 0, 1];

/// Flowgram format code for 16-bit flowgram values (hundredths of a flow signal)
pub const FLOWGRAM_FORMAT: u8 = 1;

/// Size of the fixed-width fields of the common header in bytes
///
/// magic (4) + version (4) + index offset (8) + index length (4) + read count (4)
/// + header length (2) + key length (2) + flow count (2) + flowgram format (1)
pub const SIZE_COMMON_FIXED: usize = 31;

/// Common header structure of an SFF file
///
/// The flow and key sequences are stored as raw bytes; their lengths are always
/// derived from the vectors so that the encoded layout cannot disagree with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonHeader {
    /// Magic number to identify the file format
    ///
    /// 4 bytes
    pub magic: u32,

    /// Version of the file format
    ///
    /// 4 bytes
    pub version: [u8; 4],

    /// Byte offset of the optional index section (0 if absent)
    ///
    /// 8 bytes
    pub index_offset: u64,

    /// Length of the optional index section in bytes
    ///
    /// 4 bytes
    pub index_len: u32,

    /// Number of reads in the file
    ///
    /// 4 bytes
    pub nreads: u32,

    /// Length of the padded common header as recorded in the file
    ///
    /// 2 bytes
    pub header_len: u16,

    /// Flowgram format code
    ///
    /// 1 byte
    pub flowgram_format: u8,

    /// Flow characters, one per flow (length = flow count)
    pub flow: Vec<u8>,

    /// Key sequence shared by all reads (length = key length)
    pub key: Vec<u8>,
}
impl CommonHeader {
    /// Creates a new header for the given flow and key sequences
    ///
    /// The header starts with zero reads and no index. Its recorded header length is
    /// the padded size of the encoded section.
    ///
    /// # Examples
    ///
    /// ```
    /// use sff_split::sff::CommonHeader;
    ///
    /// let header = CommonHeader::new(b"TACG".repeat(4), b"TCAG".to_vec());
    /// assert_eq!(header.flow_len(), 16);
    /// assert_eq!(header.header_len % 8, 0);
    /// ```
    #[must_use]
    pub fn new(flow: Vec<u8>, key: Vec<u8>) -> Self {
        let mut header = Self {
            magic: MAGIC,
            version: VERSION,
            index_offset: 0,
            index_len: 0,
            nreads: 0,
            header_len: 0,
            flowgram_format: FLOWGRAM_FORMAT,
            flow,
            key,
        };
        header.header_len = u16::try_from(header.padded_size()).unwrap_or(u16::MAX);
        header
    }

    /// Number of flows per read
    ///
    /// Saturates at `u16::MAX`; such a header is rejected by [`CommonHeader::write_bytes`].
    #[must_use]
    pub fn flow_len(&self) -> u16 {
        u16::try_from(self.flow.len()).unwrap_or(u16::MAX)
    }

    /// Length of the key sequence
    ///
    /// Saturates at `u16::MAX`; such a header is rejected by [`CommonHeader::write_bytes`].
    #[must_use]
    pub fn key_len(&self) -> u16 {
        u16::try_from(self.key.len()).unwrap_or(u16::MAX)
    }

    /// Exact size of the encoded header before padding
    #[must_use]
    pub fn size(&self) -> usize {
        SIZE_COMMON_FIXED + self.flow.len() + self.key.len()
    }

    /// Size of the encoded header including padding
    #[must_use]
    pub fn padded_size(&self) -> usize {
        padded_len(self.size())
    }

    /// Creates the header template written to a split output
    ///
    /// The template shares every field with the source header except the read count,
    /// which starts at zero, and the index location, which does not carry over because
    /// split outputs are written without an index.
    #[must_use]
    pub fn split_template(&self) -> Self {
        Self {
            index_offset: 0,
            index_len: 0,
            nreads: 0,
            ..self.clone()
        }
    }

    /// Checks the magic number and format version
    ///
    /// A failure here means the whole input is unusable.
    pub fn verify(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(FormatError::BadMagic(self.magic).into());
        }
        if self.version != VERSION {
            return Err(FormatError::BadVersion(self.version).into());
        }
        Ok(())
    }

    /// Reads a header from a reader
    ///
    /// Fields are decoded in file order, followed by the flow and key sequences and
    /// the padding up to the next 8-byte boundary. The header is not verified; see
    /// [`CommonHeader::verify`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The stream ends before the header is complete
    /// * Reading from the reader fails (typically an I/O error)
    /// * The flow or key buffers cannot be reserved
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        const S: Section = Section::CommonHeader;

        let magic = reader
            .read_u32::<BigEndian>()
            .map_err(truncated(S, "magic number"))?;
        let mut version = [0u8; 4];
        reader
            .read_exact(&mut version)
            .map_err(truncated(S, "version"))?;
        let index_offset = reader
            .read_u64::<BigEndian>()
            .map_err(truncated(S, "index offset"))?;
        let index_len = reader
            .read_u32::<BigEndian>()
            .map_err(truncated(S, "index length"))?;
        let nreads = reader
            .read_u32::<BigEndian>()
            .map_err(truncated(S, "number of reads"))?;
        let header_len = reader
            .read_u16::<BigEndian>()
            .map_err(truncated(S, "header length"))?;
        let key_len = reader
            .read_u16::<BigEndian>()
            .map_err(truncated(S, "key length"))?;
        let flow_len = reader
            .read_u16::<BigEndian>()
            .map_err(truncated(S, "flow length"))?;
        let flowgram_format = reader.read_u8().map_err(truncated(S, "flowgram format"))?;

        let flow = read_vec(reader, flow_len as usize, S, "flow characters")?;
        let key = read_vec(reader, key_len as usize, S, "key sequence")?;

        let header = Self {
            magic,
            version,
            index_offset,
            index_len,
            nreads,
            header_len,
            flowgram_format,
            flow,
            key,
        };
        read_padding(reader, header.size(), S)?;
        Ok(header)
    }

    /// Writes the header to a writer
    ///
    /// The fixed fields are serialized big-endian into a local buffer, so the header
    /// itself is never modified. Writing the same header twice produces the same bytes,
    /// which makes this safe to call after seeking back to the start of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The flow or key sequence is too long for its length field
    /// * Writing to the writer fails (typically an I/O error)
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let key_len = field_len(self.key.len(), "key sequence")?;
        let flow_len = field_len(self.flow.len(), "flow characters")?;

        let mut buffer = [0u8; SIZE_COMMON_FIXED];
        BigEndian::write_u32(&mut buffer[0..4], self.magic);
        buffer[4..8].copy_from_slice(&self.version);
        BigEndian::write_u64(&mut buffer[8..16], self.index_offset);
        BigEndian::write_u32(&mut buffer[16..20], self.index_len);
        BigEndian::write_u32(&mut buffer[20..24], self.nreads);
        BigEndian::write_u16(&mut buffer[24..26], self.header_len);
        BigEndian::write_u16(&mut buffer[26..28], key_len);
        BigEndian::write_u16(&mut buffer[28..30], flow_len);
        buffer[30] = self.flowgram_format;
        writer.write_all(&buffer)?;
        writer.write_all(&self.flow)?;
        writer.write_all(&self.key)?;
        write_padding(writer, self.size())
    }
}
