//! Padding and field helpers shared by every SFF section
//!
//! Each section of an SFF file (common header, read header, read data) is zero-padded so
//! that its encoded size is a multiple of [`PADDING_SIZE`]. Decoding and encoding must
//! agree on the exact unpadded size of a section, otherwise every following record is
//! read out of alignment. Both paths compute that size with the functions here.

use std::io::{self, Read, Write};

use crate::error::{Error, FormatError, Result, Section, WriteError};

/// Alignment of every SFF section in bytes
pub const PADDING_SIZE: usize = 8;

/// Zero bytes used for padding writes
const ZEROS: [u8; PADDING_SIZE] = [0; PADDING_SIZE];

/// Number of padding bytes that follow a section of `size` bytes
///
/// # Examples
///
/// ```
/// use sff_split::sff::padding_len;
///
/// assert_eq!(padding_len(31), 1);
/// assert_eq!(padding_len(32), 0);
/// assert_eq!(padding_len(33), 7);
/// ```
#[must_use]
pub fn padding_len(size: usize) -> usize {
    (PADDING_SIZE - size % PADDING_SIZE) % PADDING_SIZE
}

/// Size of a section of `size` bytes once padded
#[must_use]
pub fn padded_len(size: usize) -> usize {
    size + padding_len(size)
}

/// Consumes the padding that follows a section of `size` bytes
pub fn read_padding<R: Read>(reader: &mut R, size: usize, section: Section) -> Result<()> {
    let mut buffer = [0u8; PADDING_SIZE];
    let n = padding_len(size);
    reader
        .read_exact(&mut buffer[..n])
        .map_err(truncated(section, "padding"))
}

/// Writes the zero padding that follows a section of `size` bytes
pub fn write_padding<W: Write>(writer: &mut W, size: usize) -> Result<()> {
    writer.write_all(&ZEROS[..padding_len(size)])?;
    Ok(())
}

/// Maps a short read to [`FormatError::Truncated`], leaving other I/O errors intact
pub(crate) fn truncated(section: Section, field: &'static str) -> impl FnOnce(io::Error) -> Error {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::Truncated { section, field }.into()
        } else {
            e.into()
        }
    }
}

/// Largest reservation made before any byte of a field has been read
const RESERVE_LIMIT: usize = 1 << 20;

/// Reads exactly `len` bytes into a freshly reserved buffer
///
/// The buffer only grows with the bytes actually read, so a corrupt length field ends
/// in [`FormatError::Truncated`] at the end of the stream rather than in a huge
/// allocation. The initial reservation is fallible.
pub(crate) fn read_vec<R: Read>(
    reader: &mut R,
    len: usize,
    section: Section,
    field: &'static str,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len.min(RESERVE_LIMIT))?;
    let n = reader
        .by_ref()
        .take(len as u64)
        .read_to_end(&mut buffer)
        .map_err(truncated(section, field))?;
    if n < len {
        return Err(FormatError::Truncated { section, field }.into());
    }
    Ok(buffer)
}

/// Converts a length to its 16-bit header field
pub(crate) fn field_len(len: usize, field: &'static str) -> Result<u16> {
    u16::try_from(len).map_err(|_| WriteError::FieldTooLong { field, len }.into())
}
