//! # sff-split
//!
//! Demultiplexes an SFF flowgram file by adapter sequence. Each read is searched for
//! every adapter of a list (within its clipped region unless clipping is ignored) and
//! copied, unchanged, into the output of every adapter it carries.
//!
//! * [`sff`] reads and writes the container format
//! * [`clip`] computes the searched region of a read
//! * [`matcher`] finds adapters in that region
//! * [`split`] routes reads into per-adapter outputs

pub mod clip;
pub mod config;
pub mod matcher;
pub mod patterns;
pub mod sff;
pub mod split;

mod error;

pub use error::{Error, FormatError, ResourceError, Result, Section, WriteError};

pub use config::{EmptyOutputPolicy, SplitConfig, SplitConfigBuilder};
pub use patterns::{load_patterns, Pattern};
pub use sff::{CommonHeader, Record, SffReader, SffWriter};
pub use split::{SplitSummary, Splitter};
