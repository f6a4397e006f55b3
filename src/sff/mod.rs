//! # sff
//!
//! Reading and writing of SFF (Standard Flowgram Format) files, the container produced
//! by 454 and Ion Torrent sequencers.
//!
//! ## Usage
//!
//! ### Reading
//! ```rust
//! use std::io::Cursor;
//! use sff_split::sff::{CommonHeader, SffReader};
//!
//! let header = CommonHeader::new(b"TACG".repeat(4), b"TCAG".to_vec());
//! let mut bytes = Vec::new();
//! header.write_bytes(&mut bytes).unwrap();
//!
//! let mut reader = SffReader::new(Cursor::new(bytes)).unwrap();
//! while let Some(record) = reader.next_record() {
//!     let record = record.unwrap();
//!     println!("{}", String::from_utf8_lossy(record.bases()));
//! }
//! ```
//!
//! ## SFF file format
//!
//! An SFF file consists of:
//!
//! 1. Common header
//! 2. One read header and one read data section per read
//! 3. An optional index (never read or written by this crate)
//!
//! All integers are big-endian. Every section is zero-padded to a multiple of 8 bytes.
//!
//! ### Common header
//!
//! | Offset | Size (bytes) | Name            | Description                      | Type     |
//! | ------ | ------------ | --------------- | -------------------------------- | -------- |
//! | 0      | 4            | magic           | Magic number (0x2E736666)        | uint32   |
//! | 4      | 4            | version         | Format version (0001)            | bytes    |
//! | 8      | 8            | index_offset    | Byte offset of the index         | uint64   |
//! | 16     | 4            | index_len       | Length of the index              | uint32   |
//! | 20     | 4            | nreads          | Number of reads                  | uint32   |
//! | 24     | 2            | header_len      | Padded length of this header     | uint16   |
//! | 26     | 2            | key_len         | Length of the key sequence       | uint16   |
//! | 28     | 2            | flow_len        | Number of flows per read         | uint16   |
//! | 30     | 1            | flowgram_format | Flowgram format code (1)         | uint8    |
//! | 31     | flow_len     | flow            | Flow characters                  | bytes    |
//! | -      | key_len      | key             | Key sequence                     | bytes    |
//!
//! ### Read header
//!
//! | Offset | Size (bytes) | Name               | Type   |
//! | ------ | ------------ | ------------------ | ------ |
//! | 0      | 2            | header_len         | uint16 |
//! | 2      | 2            | name_len           | uint16 |
//! | 4      | 4            | nbases             | uint32 |
//! | 8      | 2            | clip_qual_left     | uint16 |
//! | 10     | 2            | clip_qual_right    | uint16 |
//! | 12     | 2            | clip_adapter_left  | uint16 |
//! | 14     | 2            | clip_adapter_right | uint16 |
//! | 16     | name_len     | name               | bytes  |
//!
//! ### Read data
//!
//! | Size (bytes)   | Name       | Type     |
//! | -------------- | ---------- | -------- |
//! | 2 \* flow_len  | flowgram   | uint16[] |
//! | nbases         | flow_index | uint8[]  |
//! | nbases         | bases      | bytes    |
//! | nbases         | quality    | uint8[]  |
//!
//! ## Validation
//!
//! Readers verify the magic number and the version. Lengths are always derived from the
//! header fields; a stream that ends early is reported as truncated.

mod header;
mod reader;
mod record;
mod utils;
mod writer;

pub use header::{CommonHeader, FLOWGRAM_FORMAT, MAGIC, SIZE_COMMON_FIXED, VERSION};
pub use reader::SffReader;
pub use record::{ReadData, ReadHeader, Record, SIZE_READ_FIXED};
pub use utils::{padded_len, padding_len, read_padding, write_padding, PADDING_SIZE};
pub use writer::SffWriter;
