//! Adapter list parsing
//!
//! Adapter files list one barcode adapter per line, labelled with the Ion Xpress
//! barcode name:
//!
//! ```text
//! IonXpress_001  CTAAGGTAAC
//! IonXpress_002  TAAGGAGAAC
//! ```
//!
//! Lines without the `IonXpress_` label are ignored, as are labels with nothing after
//! them. Patterns are numbered in file order.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ResourceError, Result};

/// Label prefix identifying adapter lines
pub const ADAPTER_KEY: &str = "IonXpress_";

/// An adapter pattern and its position in the adapter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// 0-based position in the adapter list
    pub index: usize,

    /// Label of the adapter (e.g. `IonXpress_001`)
    pub label: String,

    /// Adapter sequence searched for in reads
    pub sequence: Vec<u8>,
}
impl Pattern {
    #[must_use]
    pub fn new(index: usize, label: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            label: label.into(),
            sequence: sequence.into(),
        }
    }

    /// The adapter sequence as text (lossy for non-UTF-8 bytes)
    #[must_use]
    pub fn sequence_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.sequence)
    }
}

/// Extracts the label and adapter sequence from a single line
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let start = line.find(ADAPTER_KEY)?;
    let labelled = &line[start..];
    let label_end = labelled
        .find(|c: char| c == ' ' || c == '\t')
        .unwrap_or(labelled.len());
    let (label, rest) = labelled.split_at(label_end);
    let sequence = rest.trim_start_matches([' ', '\t']).trim_end();
    if sequence.is_empty() {
        None
    } else {
        Some((label, sequence))
    }
}

/// Parses the adapter list from the contents of an adapter file
///
/// # Examples
///
/// ```
/// use sff_split::patterns::parse_patterns;
///
/// let patterns = parse_patterns("IonXpress_001 CTAAGGTAAC\r\n\r\nno adapter\nIonXpress_003\tAAGAGGATTC\n");
/// assert_eq!(patterns.len(), 2);
/// assert_eq!(patterns[1].index, 1);
/// assert_eq!(patterns[1].label, "IonXpress_003");
/// assert_eq!(patterns[1].sequence, b"AAGAGGATTC");
/// ```
#[must_use]
pub fn parse_patterns(contents: &str) -> Vec<Pattern> {
    contents
        .split(['\n', '\r'])
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .enumerate()
        .map(|(index, (label, sequence))| Pattern::new(index, label, sequence))
        .collect()
}

/// Loads the adapter list from a file
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read
/// * The file does not contain any adapter
pub fn load_patterns<P: AsRef<Path>>(path: P) -> Result<Vec<Pattern>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ResourceError::AdapterFile {
        path: path.to_path_buf(),
        source,
    })?;

    let patterns = parse_patterns(&contents);
    if patterns.is_empty() {
        return Err(ResourceError::NoPatterns(path.to_path_buf()).into());
    }
    for pattern in &patterns {
        debug!(
            "pat[{:2}] = {} ({})",
            pattern.index,
            pattern.sequence_str(),
            pattern.label
        );
    }
    Ok(patterns)
}
