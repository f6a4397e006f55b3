//! Search window for adapter matching
//!
//! Reads carry 1-based clip markers computed upstream (0 = unset). The window searched
//! for an adapter starts after the key sequence or the quality clip, and ends before an
//! adapter that was already identified upstream.

use std::ops::Range;

use crate::sff::{CommonHeader, ReadHeader};

/// Computes the range of bases searched for adapters
///
/// With `ignore_clipping` the whole read is searched. Otherwise:
///
/// * left: the quality clip may already include adapter bases when it lies beyond a set
///   adapter-left marker. In that case the search starts at the last key base;
///   otherwise it starts at the quality clip.
/// * right: a set adapter-left marker bounds the window; otherwise the smaller of the
///   quality-right and adapter-right markers (each defaulting to the read length).
///
/// Both bounds are clamped to the read length. The range may be reversed (start past
/// end) when the markers leave no room for a window; [`region_text`] turns such a
/// range into an empty slice.
///
/// # Examples
///
/// ```
/// use sff_split::clip::resolve_region;
/// use sff_split::sff::{CommonHeader, ReadHeader};
///
/// let common = CommonHeader::new(b"TACG".to_vec(), b"TCAG".to_vec());
/// let read = ReadHeader::new(b"r".to_vec(), 100).with_quality_clip(5, 90);
///
/// assert_eq!(resolve_region(&common, &read, false), 4..90);
/// assert_eq!(resolve_region(&common, &read, true), 0..100);
///
/// // the quality clip lies beyond the adapter: start at the last key base
/// let read = read.with_adapter_clip(3, 0);
/// assert_eq!(resolve_region(&common, &read, false).start, 3);
/// ```
#[must_use]
pub fn resolve_region(
    common: &CommonHeader,
    read: &ReadHeader,
    ignore_clipping: bool,
) -> Range<usize> {
    let nbases = read.nbases as usize;
    if ignore_clipping {
        return 0..nbases;
    }

    let adapter_left = usize::from(read.clip_adapter_left);
    let qual_left = usize::from(read.clip_qual_left);

    let left = if adapter_left > 0 && qual_left > adapter_left {
        usize::from(common.key_len()).saturating_sub(1)
    } else {
        qual_left.saturating_sub(1)
    };

    let right = if adapter_left > 0 {
        adapter_left - 1
    } else {
        let marker = |m: u16| if m == 0 { nbases } else { usize::from(m) };
        marker(read.clip_qual_right).min(marker(read.clip_adapter_right))
    };

    left.min(nbases)..right.min(nbases)
}

/// Returns the bases covered by a search window, empty if the window is reversed
#[must_use]
pub fn region_text(bases: &[u8], region: Range<usize>) -> &[u8] {
    bases.get(region).unwrap_or_default()
}
