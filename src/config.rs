//! Settings of a split run
//!
//! Outputs are named `<output_dir>/<prefix>_NNN.sff`, where `NNN` is the 1-based adapter
//! number padded to three digits.

use std::path::{Path, PathBuf};

/// What to do with outputs that matched no read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyOutputPolicy {
    /// Keep the output as a valid SFF file with a read count of zero
    #[default]
    Keep,
    /// Delete the output once it has been finalized
    Remove,
}

/// Settings for a split run
///
/// Use [`SplitConfigBuilder`] to create one with anything other than the defaults.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Search the whole read instead of the clipped region
    pub ignore_clipping: bool,

    /// Count matches without creating or writing any output
    pub dry_run: bool,

    /// Number of matching threads (0 uses all available cores)
    pub threads: usize,

    /// Directory receiving the split outputs
    pub output_dir: PathBuf,

    /// File name prefix of the split outputs
    pub prefix: String,

    /// Handling of outputs without any match
    pub empty_outputs: EmptyOutputPolicy,
}
impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            ignore_clipping: false,
            dry_run: false,
            threads: 0,
            output_dir: PathBuf::from("."),
            prefix: String::from("split"),
            empty_outputs: EmptyOutputPolicy::default(),
        }
    }
}
impl SplitConfig {
    /// Path of the output for the pattern at `index` (0-based)
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use sff_split::config::SplitConfig;
    ///
    /// let config = SplitConfig::default();
    /// assert_eq!(config.output_path(0), Path::new("./split_001.sff"));
    /// assert_eq!(config.output_path(11), Path::new("./split_012.sff"));
    /// ```
    #[must_use]
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{:03}.sff", self.prefix, index + 1))
    }

    /// Number of matching threads, resolving 0 to the number of available cores
    #[must_use]
    pub fn threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

/// Builder for [`SplitConfig`]
///
/// # Examples
///
/// ```
/// use sff_split::config::{EmptyOutputPolicy, SplitConfigBuilder};
///
/// let config = SplitConfigBuilder::default()
///     .ignore_clipping(true)
///     .threads(4)
///     .output_dir("barcodes")
///     .empty_outputs(EmptyOutputPolicy::Remove)
///     .build();
/// assert_eq!(config.prefix, "split");
/// assert_eq!(config.threads(), 4);
/// ```
#[derive(Default)]
pub struct SplitConfigBuilder {
    ignore_clipping: Option<bool>,
    dry_run: Option<bool>,
    threads: Option<usize>,
    output_dir: Option<PathBuf>,
    prefix: Option<String>,
    empty_outputs: Option<EmptyOutputPolicy>,
}
impl SplitConfigBuilder {
    #[must_use]
    pub fn ignore_clipping(mut self, ignore_clipping: bool) -> Self {
        self.ignore_clipping = Some(ignore_clipping);
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    #[must_use]
    pub fn output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = Some(output_dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn empty_outputs(mut self, policy: EmptyOutputPolicy) -> Self {
        self.empty_outputs = Some(policy);
        self
    }

    #[must_use]
    pub fn build(self) -> SplitConfig {
        let defaults = SplitConfig::default();
        SplitConfig {
            ignore_clipping: self.ignore_clipping.unwrap_or(defaults.ignore_clipping),
            dry_run: self.dry_run.unwrap_or(defaults.dry_run),
            threads: self.threads.unwrap_or(defaults.threads),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            prefix: self.prefix.unwrap_or(defaults.prefix),
            empty_outputs: self.empty_outputs.unwrap_or(defaults.empty_outputs),
        }
    }
}
