use std::path::PathBuf;

/// Custom Result type for sff-split operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the sff-split library, encompassing all possible error cases
/// that can occur while decoding, matching, and splitting SFF files.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// The input (or a section of it) is not a usable SFF container
    FormatError(#[from] FormatError),
    /// A file or worker resource could not be acquired
    ResourceError(#[from] ResourceError),
    /// Errors that occur while writing split outputs
    WriteError(#[from] WriteError),
    /// A section declared more memory than could be reserved
    AllocationError(#[from] std::collections::TryReserveError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
}

/// Sections of an SFF container, used to locate decoding failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    CommonHeader,
    ReadHeader,
    ReadData,
}
impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommonHeader => write!(f, "common header"),
            Self::ReadHeader => write!(f, "read header"),
            Self::ReadData => write!(f, "read data"),
        }
    }
}

/// Errors specific to decoding and validating the SFF binary layout
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// The magic number in the common header does not match `.sff`
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid magic number: {0:#010x}")]
    BadMagic(u32),

    /// The format version in the common header is not supported
    ///
    /// # Arguments
    /// * `[u8; 4]` - The unsupported version bytes that were found
    #[error("Invalid format version: {0:02x?}")]
    BadVersion([u8; 4]),

    /// The stream ended before a field could be read in full
    ///
    /// # Fields
    /// * `section` - The section being decoded
    /// * `field` - The field that came up short
    #[error("Stream truncated while reading {field} of the {section}")]
    Truncated {
        section: Section,
        field: &'static str,
    },
}

/// Errors raised while acquiring the files and workers needed before splitting starts
#[derive(thiserror::Error, Debug)]
pub enum ResourceError {
    /// The input SFF file could not be opened or mapped
    #[error("Could not open SFF file {path:?} for reading: {source}")]
    OpenInput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input path is not a regular file (e.g., it might be a directory or special file)
    #[error("File is not regular: {0:?}")]
    IncompatibleFile(PathBuf),

    /// The adapter list could not be read
    #[error("Could not read adapter file {path:?}: {source}")]
    AdapterFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The adapter list did not contain a single usable adapter
    #[error("No adapters found in {0:?}")]
    NoPatterns(PathBuf),

    /// A split output could not be created
    ///
    /// # Fields
    /// * `index` - The 0-based pattern index of the output
    /// * `path` - The output path
    #[error("Could not open {path:?} for writing split number {index}: {source}")]
    CreateOutput {
        index: usize,
        path: PathBuf,
        source: std::io::Error,
    },

    /// The number of provided output streams does not match the number of patterns
    #[error("Expected {expected} output streams, got {got}")]
    OutputCount { expected: usize, got: usize },

    /// The matching worker pool could not be started
    #[error("Could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors that can occur while writing split outputs
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// A record was offered to an output that has already been finalized
    ///
    /// # Arguments
    /// * `usize` - The 0-based pattern index of the output
    #[error("Split output {0} has already been finalized")]
    Finalized(usize),

    /// The record count no longer fits the header's 32-bit field
    #[error("Record count overflows the common header for split output {0}")]
    CountOverflow(usize),

    /// A variable-length field is too long for its 16-bit length field
    ///
    /// # Fields
    /// * `field` - The field being encoded
    /// * `len` - Its length in bytes
    #[error("The {field} is {len} bytes long, more than a 16-bit length field can hold")]
    FieldTooLong { field: &'static str, len: usize },

    /// A record's arrays disagree with the lengths declared by the headers
    ///
    /// # Fields
    /// * `name` - The read name
    /// * `field` - The array with the wrong length
    /// * `expected` - The length declared by the headers
    /// * `got` - The actual length of the array
    #[error("Read {name} has {got} {field} values, expected {expected}")]
    InconsistentRecord {
        name: String,
        field: &'static str,
        expected: usize,
        got: usize,
    },
}
