//! Exact adapter matching
//!
//! Matching is byte-exact: no case folding, no mismatches. Only the position of the
//! first occurrence is ever reported.

use memchr::memmem::Finder;

/// Returns the index of the first occurrence of `pattern` in `text`
///
/// Returns `None` if the pattern does not occur, including when it is longer than the
/// text. An empty pattern matches at index 0.
///
/// # Examples
///
/// ```
/// use sff_split::matcher::find;
///
/// assert_eq!(find(b"ACGTACGT", b"GTAC"), Some(2));
/// assert_eq!(find(b"AAA", b"AAAA"), None);
/// assert_eq!(find(b"", b"A"), None);
/// ```
#[must_use]
pub fn find(text: &[u8], pattern: &[u8]) -> Option<usize> {
    if pattern.len() > text.len() {
        return None;
    }
    memchr::memmem::find(text, pattern)
}

/// A compiled adapter pattern
///
/// The searcher is built once per pattern and reused for every read.
#[derive(Clone, Debug)]
pub struct PatternMatcher {
    finder: Finder<'static>,
}
impl PatternMatcher {
    #[must_use]
    pub fn new(pattern: &[u8]) -> Self {
        Self {
            finder: Finder::new(pattern).into_owned(),
        }
    }

    /// The pattern this matcher searches for
    #[must_use]
    pub fn pattern(&self) -> &[u8] {
        self.finder.needle()
    }

    /// Returns the index of the first occurrence of the pattern in `text`
    #[must_use]
    pub fn find(&self, text: &[u8]) -> Option<usize> {
        if self.finder.needle().len() > text.len() {
            return None;
        }
        self.finder.find(text)
    }
}
