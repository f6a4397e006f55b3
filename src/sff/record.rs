//! Per-read sections of an SFF file
//!
//! Each read is stored as a read header (name, base count and clip markers) followed by
//! a read data section (flowgram, flow index, bases and quality). Both sections are
//! padded to 8 bytes independently of each other.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::utils::{field_len, padded_len, read_padding, read_vec, truncated, write_padding};
use crate::error::{Result, Section, WriteError};

/// Size of the fixed-width fields of a read header in bytes
///
/// header length (2) + name length (2) + base count (4) + four clip markers (2 each)
pub const SIZE_READ_FIXED: usize = 16;

/// Header of a single read
///
/// Clip markers are 1-based positions into the bases; 0 means the marker is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadHeader {
    /// Length of the padded read header as recorded in the file (informational)
    pub header_len: u16,

    /// Number of bases in the read
    pub nbases: u32,

    /// First base passing quality clipping (1-based)
    pub clip_qual_left: u16,

    /// Last base passing quality clipping (1-based)
    pub clip_qual_right: u16,

    /// First base after the adapter, or the adapter start when clipped upstream (1-based)
    pub clip_adapter_left: u16,

    /// Last base before the 3' adapter (1-based)
    pub clip_adapter_right: u16,

    /// Read name
    pub name: Vec<u8>,
}
impl ReadHeader {
    /// Creates a new read header with all clip markers unset
    #[must_use]
    pub fn new(name: Vec<u8>, nbases: u32) -> Self {
        let mut header = Self {
            header_len: 0,
            nbases,
            clip_qual_left: 0,
            clip_qual_right: 0,
            clip_adapter_left: 0,
            clip_adapter_right: 0,
            name,
        };
        header.header_len = u16::try_from(header.padded_size()).unwrap_or(u16::MAX);
        header
    }

    /// Sets the quality clip markers
    #[must_use]
    pub fn with_quality_clip(mut self, left: u16, right: u16) -> Self {
        self.clip_qual_left = left;
        self.clip_qual_right = right;
        self
    }

    /// Sets the adapter clip markers
    #[must_use]
    pub fn with_adapter_clip(mut self, left: u16, right: u16) -> Self {
        self.clip_adapter_left = left;
        self.clip_adapter_right = right;
        self
    }

    /// Length of the read name
    ///
    /// Saturates at `u16::MAX`; such a header is rejected by [`ReadHeader::write_bytes`].
    #[must_use]
    pub fn name_len(&self) -> u16 {
        u16::try_from(self.name.len()).unwrap_or(u16::MAX)
    }

    /// Exact size of the encoded read header before padding
    #[must_use]
    pub fn size(&self) -> usize {
        SIZE_READ_FIXED + self.name.len()
    }

    /// Size of the encoded read header including padding
    #[must_use]
    pub fn padded_size(&self) -> usize {
        padded_len(self.size())
    }

    /// Reads a read header from a reader, consuming its padding
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        const S: Section = Section::ReadHeader;

        let mut buffer = [0u8; SIZE_READ_FIXED];
        let mut filled = 0;
        for (field, width) in [
            ("header length", 2),
            ("name length", 2),
            ("number of bases", 4),
            ("clip_qual_left", 2),
            ("clip_qual_right", 2),
            ("clip_adapter_left", 2),
            ("clip_adapter_right", 2),
        ] {
            reader
                .read_exact(&mut buffer[filled..filled + width])
                .map_err(truncated(S, field))?;
            filled += width;
        }

        let name_len = BigEndian::read_u16(&buffer[2..4]);
        let name = read_vec(reader, name_len as usize, S, "name")?;
        let header = Self {
            header_len: BigEndian::read_u16(&buffer[0..2]),
            nbases: BigEndian::read_u32(&buffer[4..8]),
            clip_qual_left: BigEndian::read_u16(&buffer[8..10]),
            clip_qual_right: BigEndian::read_u16(&buffer[10..12]),
            clip_adapter_left: BigEndian::read_u16(&buffer[12..14]),
            clip_adapter_right: BigEndian::read_u16(&buffer[14..16]),
            name,
        };
        read_padding(reader, header.size(), S)?;
        Ok(header)
    }

    /// Writes the read header to a writer, followed by its padding
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let name_len = field_len(self.name.len(), "read name")?;
        let mut buffer = [0u8; SIZE_READ_FIXED];
        BigEndian::write_u16(&mut buffer[0..2], self.header_len);
        BigEndian::write_u16(&mut buffer[2..4], name_len);
        BigEndian::write_u32(&mut buffer[4..8], self.nbases);
        BigEndian::write_u16(&mut buffer[8..10], self.clip_qual_left);
        BigEndian::write_u16(&mut buffer[10..12], self.clip_qual_right);
        BigEndian::write_u16(&mut buffer[12..14], self.clip_adapter_left);
        BigEndian::write_u16(&mut buffer[14..16], self.clip_adapter_right);
        writer.write_all(&buffer)?;
        writer.write_all(&self.name)?;
        write_padding(writer, self.size())
    }
}

/// Data section of a single read
///
/// The flowgram holds one value per flow of the common header; the three per-base
/// arrays hold one value per base of the read header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadData {
    /// Flow signal values, one per flow
    pub flowgram: Vec<u16>,

    /// Flow increments, one per base
    pub flow_index: Vec<u8>,

    /// Called bases
    pub bases: Vec<u8>,

    /// Phred quality scores, one per base
    pub quality: Vec<u8>,
}
impl ReadData {
    /// Exact size of a data section before padding
    #[must_use]
    pub fn section_size(nflows: usize, nbases: usize) -> usize {
        2 * nflows + 3 * nbases
    }

    /// Exact size of this data section before padding
    #[must_use]
    pub fn size(&self) -> usize {
        Self::section_size(self.flowgram.len(), self.bases.len())
    }

    /// Size of this data section including padding
    #[must_use]
    pub fn padded_size(&self) -> usize {
        padded_len(self.size())
    }

    /// Reads a data section of `nflows` flows and `nbases` bases, consuming its padding
    pub fn from_reader<R: Read>(reader: &mut R, nflows: u16, nbases: u32) -> Result<Self> {
        const S: Section = Section::ReadData;
        let nflows = nflows as usize;
        let nbases = nbases as usize;

        let raw = read_vec(reader, 2 * nflows, S, "flowgram")?;
        let mut flowgram = Vec::new();
        flowgram.try_reserve_exact(nflows)?;
        flowgram.extend(raw.chunks_exact(2).map(BigEndian::read_u16));

        let flow_index = read_vec(reader, nbases, S, "flow index")?;
        let bases = read_vec(reader, nbases, S, "bases")?;
        let quality = read_vec(reader, nbases, S, "quality")?;

        read_padding(reader, Self::section_size(nflows, nbases), S)?;
        Ok(Self {
            flowgram,
            flow_index,
            bases,
            quality,
        })
    }

    /// Writes the data section to a writer, followed by its padding
    ///
    /// The flowgram is converted to big-endian on the fly; the values held by `self`
    /// are left as they are.
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.flowgram
            .iter()
            .try_for_each(|&x| writer.write_u16::<BigEndian>(x))?;
        writer.write_all(&self.flow_index)?;
        writer.write_all(&self.bases)?;
        writer.write_all(&self.quality)?;
        write_padding(writer, self.size())
    }
}

/// A complete read: header and data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: ReadHeader,
    pub data: ReadData,
}
impl Record {
    /// Reads a complete record, sizing the data section from the read header
    pub fn from_reader<R: Read>(reader: &mut R, nflows: u16) -> Result<Self> {
        let header = ReadHeader::from_reader(reader)?;
        let data = ReadData::from_reader(reader, nflows, header.nbases)?;
        Ok(Self { header, data })
    }

    /// Checks that the arrays of the record match the lengths its headers declare
    ///
    /// `nflows` is the flow count of the common header. A record failing this check
    /// would encode to a container that cannot be decoded.
    pub fn validate(&self, nflows: u16) -> Result<()> {
        field_len(self.header.name.len(), "read name")?;
        let check = |field: &'static str, expected: usize, got: usize| -> Result<()> {
            if expected == got {
                return Ok(());
            }
            Err(WriteError::InconsistentRecord {
                name: String::from_utf8_lossy(&self.header.name).into_owned(),
                field,
                expected,
                got,
            }
            .into())
        };
        let nbases = self.header.nbases as usize;
        check("flowgram", usize::from(nflows), self.data.flowgram.len())?;
        check("flow index", nbases, self.data.flow_index.len())?;
        check("base", nbases, self.data.bases.len())?;
        check("quality", nbases, self.data.quality.len())
    }

    /// Writes the read header and data sections
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.header.write_bytes(writer)?;
        self.data.write_bytes(writer)
    }

    /// Called bases of this read
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.data.bases
    }

    /// Name of this read
    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.header.name
    }

    /// Encoded size of the record including both paddings
    #[must_use]
    pub fn padded_size(&self) -> usize {
        self.header.padded_size() + self.data.padded_size()
    }
}

#[cfg(test)]
mod testing {
    use std::io::Cursor;

    use super::*;
    use crate::error::FormatError;
    use crate::Error;

    fn example_record(nflows: usize, bases: &[u8], name: &[u8]) -> Record {
        let nbases = bases.len();
        let header = ReadHeader::new(name.to_vec(), nbases as u32)
            .with_quality_clip(5, nbases as u16)
            .with_adapter_clip(0, 0);
        let data = ReadData {
            flowgram: (0..nflows).map(|i| (i * 37 % 1200) as u16).collect(),
            flow_index: (0..nbases).map(|i| (i % 4) as u8).collect(),
            bases: bases.to_vec(),
            quality: (0..nbases).map(|i| (20 + i % 20) as u8).collect(),
        };
        Record { header, data }
    }

    #[test]
    fn test_read_header_round_trip() -> Result<()> {
        let header = ReadHeader::new(b"IJN8PUP01AAAAA".to_vec(), 250)
            .with_quality_clip(5, 230)
            .with_adapter_clip(0, 245);
        let mut buffer = Vec::new();
        header.write_bytes(&mut buffer)?;
        assert_eq!(buffer.len(), 32);

        let decoded = ReadHeader::from_reader(&mut Cursor::new(&buffer))?;
        assert_eq!(decoded, header);

        let mut again = Vec::new();
        decoded.write_bytes(&mut again)?;
        assert_eq!(again, buffer);
        Ok(())
    }

    #[test]
    fn test_read_data_round_trip() -> Result<()> {
        let record = example_record(400, b"TCAGGATTCAGGTTACCA", b"r1");
        let mut buffer = Vec::new();
        record.data.write_bytes(&mut buffer)?;
        assert_eq!(buffer.len(), record.data.padded_size());
        assert_eq!(buffer.len() % 8, 0);

        // flowgram values are big-endian on disk
        assert_eq!(&buffer[2..4], &37u16.to_be_bytes());

        let decoded = ReadData::from_reader(&mut Cursor::new(&buffer), 400, 18)?;
        assert_eq!(decoded, record.data);

        let mut again = Vec::new();
        decoded.write_bytes(&mut again)?;
        assert_eq!(again, buffer);
        Ok(())
    }

    #[test]
    fn test_sections_are_padded() -> Result<()> {
        for nflows in [0, 1, 3, 8, 13] {
            for nbases in 0..12 {
                for name_len in 0..10 {
                    let bases = vec![b'A'; nbases];
                    let name = vec![b'n'; name_len];
                    let record = example_record(nflows, &bases, &name);

                    let mut buffer = Vec::new();
                    record.header.write_bytes(&mut buffer)?;
                    assert_eq!(buffer.len() % 8, 0);

                    buffer.clear();
                    record.data.write_bytes(&mut buffer)?;
                    assert_eq!(buffer.len() % 8, 0);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_consecutive_records_stay_aligned() -> Result<()> {
        let first = example_record(7, b"ACGTA", b"first-read");
        let second = example_record(7, b"GGGTTTACCA", b"second");
        let mut buffer = Vec::new();
        first.write_bytes(&mut buffer)?;
        second.write_bytes(&mut buffer)?;

        let mut reader = Cursor::new(&buffer);
        assert_eq!(Record::from_reader(&mut reader, 7)?, first);
        assert_eq!(Record::from_reader(&mut reader, 7)?, second);
        assert_eq!(reader.position() as usize, buffer.len());
        Ok(())
    }

    #[test]
    fn test_write_leaves_record_untouched() -> Result<()> {
        let record = example_record(9, b"ACGTACGT", b"keep");
        let copy = record.clone();
        let mut first = Vec::new();
        let mut second = Vec::new();
        record.write_bytes(&mut first)?;
        record.write_bytes(&mut second)?;
        assert_eq!(record, copy);
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_read_data_truncated() -> Result<()> {
        let record = example_record(10, b"ACGTACGT", b"short");
        let mut buffer = Vec::new();
        record.data.write_bytes(&mut buffer)?;

        let err = ReadData::from_reader(&mut Cursor::new(&buffer[..30]), 10, 8).unwrap_err();
        assert!(matches!(
            err,
            Error::FormatError(FormatError::Truncated {
                section: Section::ReadData,
                field: "bases"
            })
        ));
        Ok(())
    }

    #[test]
    fn test_validate() {
        let record = example_record(12, b"ACGTACGT", b"ok");
        assert!(record.validate(12).is_ok());
        assert!(matches!(
            record.validate(13),
            Err(Error::WriteError(WriteError::InconsistentRecord {
                field: "flowgram",
                expected: 13,
                got: 12,
                ..
            }))
        ));

        let mut short_quality = record.clone();
        short_quality.data.quality.pop();
        assert!(matches!(
            short_quality.validate(12),
            Err(Error::WriteError(WriteError::InconsistentRecord {
                field: "quality",
                expected: 8,
                got: 7,
                ..
            }))
        ));

        let mut long_name = record;
        long_name.header.name = vec![b'n'; 70_000];
        assert!(matches!(
            long_name.validate(12),
            Err(Error::WriteError(WriteError::FieldTooLong {
                field: "read name",
                ..
            }))
        ));
    }
}
