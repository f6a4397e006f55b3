//! Demultiplexing of an SFF stream into one output per adapter
//!
//! Every adapter owns a [`SplitTarget`], which moves through a small lifecycle:
//!
//! ```text
//! Unopened -> Open -> HeaderWritten -> Closed
//! ```
//!
//! Targets of a dry run never leave `Unopened`; they only count matches. An output's
//! common header is written in front of its first matching record, and rewritten with
//! the final read count when the target is finalized. Finalizing is idempotent, so the
//! same path serves normal completion, interruption and drop.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error, info, trace, warn};

use crate::clip::{region_text, resolve_region};
use crate::config::{EmptyOutputPolicy, SplitConfig};
use crate::error::{Error, ResourceError, Result, WriteError};
use crate::matcher::PatternMatcher;
use crate::patterns::Pattern;
use crate::sff::{CommonHeader, Record, SffReader, SffWriter};

/// Lifecycle of a split output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// No output stream exists (dry run)
    Unopened,
    /// The output stream exists but nothing has been written yet
    Open,
    /// The common header and at least one record have been written
    HeaderWritten,
    /// The output has been finalized; no further records are accepted
    Closed,
}

/// One adapter and the output receiving the reads that carry it
pub struct SplitTarget<W: Write + Seek> {
    /// The adapter searched for
    pattern: Pattern,

    /// Compiled searcher for the adapter
    matcher: PatternMatcher,

    /// Output writer; `None` in a dry run and after finalize
    writer: Option<SffWriter<W>>,

    /// Number of matching reads
    count: u64,

    /// Current lifecycle state
    state: TargetState,

    /// Location of the output on disk, if file-backed
    path: Option<PathBuf>,
}
impl<W: Write + Seek> SplitTarget<W> {
    /// Creates a target writing matches to `inner`
    pub fn new(pattern: Pattern, header: &CommonHeader, inner: W) -> Self {
        let writer = SffWriter::with_id(inner, header.split_template(), pattern.index);
        Self {
            matcher: PatternMatcher::new(&pattern.sequence),
            pattern,
            writer: Some(writer),
            count: 0,
            state: TargetState::Open,
            path: None,
        }
    }

    /// Creates a target that only counts matches
    pub fn counting(pattern: Pattern) -> Self {
        Self {
            matcher: PatternMatcher::new(&pattern.sequence),
            pattern,
            writer: None,
            count: 0,
            state: TargetState::Unopened,
            path: None,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn state(&self) -> TargetState {
        self.state
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Offers a record whose search window holds `text`
    ///
    /// Returns `true` if the adapter was found, in which case the record has been
    /// counted and (outside of a dry run) written.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is already closed or the record cannot be written.
    pub fn offer(&mut self, record: &Record, text: &[u8]) -> Result<bool> {
        if self.state == TargetState::Closed {
            return Err(WriteError::Finalized(self.pattern.index).into());
        }
        let Some(pos) = self.matcher.find(text) else {
            return Ok(false);
        };
        trace!(
            "Adapter {} found in {} at {pos}",
            self.pattern.label,
            String::from_utf8_lossy(record.name())
        );
        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(record)?;
            self.state = TargetState::HeaderWritten;
        }
        self.count += 1;
        Ok(true)
    }

    /// Writes the final read count into the output header and releases the output
    ///
    /// Returns the inner writer the first time an open target is finalized. Finalizing a
    /// closed or never-opened target does nothing and returns `None`.
    pub fn finalize(&mut self) -> Result<Option<W>> {
        match self.state {
            TargetState::Closed => {
                warn!("Split output {} already finalized", self.pattern.index);
                Ok(None)
            }
            TargetState::Unopened => {
                debug!(
                    "Split output {} was never opened; nothing to finalize",
                    self.pattern.index
                );
                Ok(None)
            }
            TargetState::Open | TargetState::HeaderWritten => {
                self.state = TargetState::Closed;
                let Some(writer) = self.writer.take() else {
                    return Ok(None);
                };
                let inner = writer.finish()?;
                debug!(
                    "Finalized split output {} with {} reads",
                    self.pattern.index, self.count
                );
                Ok(Some(inner))
            }
        }
    }
}
impl<W: Write + Seek> Drop for SplitTarget<W> {
    fn drop(&mut self) {
        if matches!(self.state, TargetState::Open | TargetState::HeaderWritten) {
            if let Err(e) = self.finalize() {
                error!(
                    "Failed to finalize split output {} on drop: {e}",
                    self.pattern.index
                );
            }
        }
    }
}

/// Matched-read count for one adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSummary {
    pub pattern: Pattern,
    pub count: u64,
    /// Output file, if one was written and kept
    pub path: Option<PathBuf>,
}

/// Outcome of a split run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    /// Number of input reads examined
    pub records_processed: u64,

    /// Whether the run stopped early on an interrupt
    pub interrupted: bool,

    /// Per-adapter counts, in adapter order
    pub targets: Vec<TargetSummary>,
}

/// Splits the reads of an SFF stream by the adapters they carry
///
/// A read is written to every output whose adapter occurs in its search window, so
/// outputs may overlap. Within an output, reads keep their input order.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use sff_split::config::SplitConfig;
/// use sff_split::patterns::Pattern;
/// use sff_split::sff::{CommonHeader, ReadData, ReadHeader, Record};
/// use sff_split::split::Splitter;
///
/// let header = CommonHeader::new(b"TACG".to_vec(), b"TCAG".to_vec());
/// let patterns = vec![Pattern::new(0, "IonXpress_001", "CTAAGG")];
/// let config = SplitConfig { threads: 1, ..Default::default() };
/// let mut splitter =
///     Splitter::from_writers(&header, patterns, vec![Cursor::new(Vec::new())], config).unwrap();
///
/// let bases = b"TCAGCTAAGGTT".to_vec();
/// let record = Record {
///     header: ReadHeader::new(b"read".to_vec(), bases.len() as u32),
///     data: ReadData {
///         flowgram: vec![0; 4],
///         flow_index: vec![1; bases.len()],
///         quality: vec![30; bases.len()],
///         bases,
///     },
/// };
/// splitter.process_record(&record).unwrap();
///
/// let outputs = splitter.finalize_all().unwrap();
/// assert!(outputs[0].is_some());
/// assert_eq!(splitter.summary().targets[0].count, 1);
/// ```
pub struct Splitter<W: Write + Seek> {
    /// Common header of the input
    header: CommonHeader,

    /// One target per adapter, indexed by adapter position
    targets: Vec<SplitTarget<W>>,

    /// Run settings
    config: SplitConfig,

    /// Worker pool used to fan out matching across targets
    pool: Option<rayon::ThreadPool>,

    /// Set from outside (e.g. a signal handler) to stop before the next read
    interrupt: Arc<AtomicBool>,

    /// Whether processing stopped on an interrupt
    interrupted: bool,

    /// Number of reads processed
    records_processed: u64,
}
impl<W: Write + Seek + Send> Splitter<W> {
    fn with_targets(
        header: &CommonHeader,
        targets: Vec<SplitTarget<W>>,
        config: SplitConfig,
    ) -> Result<Self> {
        let threads = config.threads();
        let pool = if threads > 1 && targets.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(ResourceError::from)?;
            Some(pool)
        } else {
            None
        };
        debug!(
            "Matching {} adapters with {} thread(s)",
            targets.len(),
            pool.as_ref().map_or(1, rayon::ThreadPool::current_num_threads)
        );
        Ok(Self {
            header: header.clone(),
            targets,
            config,
            pool,
            interrupt: Arc::new(AtomicBool::new(false)),
            interrupted: false,
            records_processed: 0,
        })
    }

    /// Creates a splitter writing to one stream per adapter
    ///
    /// The streams are written regardless of `config.dry_run`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of streams differs from the number of adapters, or
    /// the worker pool cannot be built.
    pub fn from_writers(
        header: &CommonHeader,
        patterns: Vec<Pattern>,
        writers: Vec<W>,
        config: SplitConfig,
    ) -> Result<Self> {
        if writers.len() != patterns.len() {
            return Err(ResourceError::OutputCount {
                expected: patterns.len(),
                got: writers.len(),
            }
            .into());
        }
        let targets = patterns
            .into_iter()
            .zip(writers)
            .map(|(pattern, inner)| SplitTarget::new(pattern, header, inner))
            .collect();
        Self::with_targets(header, targets, config)
    }

    /// Creates a splitter that only counts matches
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be built.
    pub fn dry_run(header: &CommonHeader, patterns: Vec<Pattern>, config: SplitConfig) -> Result<Self> {
        let targets = patterns.into_iter().map(SplitTarget::counting).collect();
        Self::with_targets(header, targets, config)
    }

    /// Uses `flag` as the interrupt flag
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    /// Returns a handle that stops processing before the next read when set
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    #[must_use]
    pub fn targets(&self) -> &[SplitTarget<W>] {
        &self.targets
    }

    #[must_use]
    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Offers a single record to every target
    ///
    /// The search window is resolved once and shared by all targets.
    pub fn process_record(&mut self, record: &Record) -> Result<()> {
        let region = resolve_region(&self.header, &record.header, self.config.ignore_clipping);
        trace!(
            "{}: searching bases {region:?}",
            String::from_utf8_lossy(record.name())
        );
        let text = region_text(record.bases(), region);

        let offer = |target: &mut SplitTarget<W>| target.offer(record, text).map(|_| ());
        match &self.pool {
            Some(pool) => pool.install(|| self.targets.par_iter_mut().try_for_each(offer))?,
            None => self.targets.iter_mut().try_for_each(offer)?,
        }
        self.records_processed += 1;
        Ok(())
    }

    /// Processes every read of `reader`, stopping early if the interrupt flag is set
    ///
    /// Outputs are left open; call [`Splitter::finalize_all`] afterwards, or use
    /// [`Splitter::run`] to do both.
    pub fn process_reader<R: Read>(&mut self, reader: &mut SffReader<R>) -> Result<()> {
        info!(
            "Splitting {} reads across {} adapters",
            reader.remaining(),
            self.targets.len()
        );
        loop {
            if self.interrupt.load(Ordering::SeqCst) {
                warn!(
                    "Interrupted after {} reads; finalizing outputs",
                    self.records_processed
                );
                self.interrupted = true;
                break;
            }
            let Some(record) = reader.next_record() else {
                break;
            };
            self.process_record(&record?)?;
        }
        Ok(())
    }

    /// Finalizes every target
    ///
    /// All targets are attempted even if one fails; the first error is returned. Outputs
    /// without a match are deleted under [`EmptyOutputPolicy::Remove`]. Returns the inner
    /// writer of every target that was finalized by this call and kept.
    pub fn finalize_all(&mut self) -> Result<Vec<Option<W>>> {
        let mut outputs = Vec::with_capacity(self.targets.len());
        let mut first_error: Option<Error> = None;
        for target in &mut self.targets {
            match target.finalize() {
                Ok(Some(inner))
                    if target.count == 0
                        && self.config.empty_outputs == EmptyOutputPolicy::Remove =>
                {
                    drop(inner);
                    if let Some(path) = target.path.take() {
                        match fs::remove_file(&path) {
                            Ok(()) => info!("Removed empty output {path:?}"),
                            Err(e) => {
                                error!("Failed to remove empty output {path:?}: {e}");
                                first_error.get_or_insert(e.into());
                            }
                        }
                    }
                    outputs.push(None);
                }
                Ok(inner) => outputs.push(inner),
                Err(e) => {
                    error!(
                        "Failed to finalize split output {}: {e}",
                        target.pattern.index
                    );
                    first_error.get_or_insert(e);
                    outputs.push(None);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }

    /// Processes every read of `reader`, then finalizes all outputs
    ///
    /// Outputs are finalized even if processing fails.
    pub fn run<R: Read>(&mut self, reader: &mut SffReader<R>) -> Result<SplitSummary> {
        let processed = self.process_reader(reader);
        let finalized = self.finalize_all();
        processed?;
        finalized?;
        Ok(self.summary())
    }

    /// Per-adapter counts so far
    #[must_use]
    pub fn summary(&self) -> SplitSummary {
        SplitSummary {
            records_processed: self.records_processed,
            interrupted: self.interrupted,
            targets: self
                .targets
                .iter()
                .map(|target| TargetSummary {
                    pattern: target.pattern.clone(),
                    count: target.count,
                    path: target.path.clone(),
                })
                .collect(),
        }
    }
}

impl Splitter<BufWriter<File>> {
    /// Creates a splitter writing to files named after `config`
    ///
    /// In a dry run no file is created.
    ///
    /// # Errors
    ///
    /// Returns an error if an output cannot be created or the worker pool cannot be built.
    pub fn create(header: &CommonHeader, patterns: Vec<Pattern>, config: SplitConfig) -> Result<Self> {
        if config.dry_run {
            return Self::dry_run(header, patterns, config);
        }

        let mut writers = Vec::with_capacity(patterns.len());
        let mut paths = Vec::with_capacity(patterns.len());
        for pattern in &patterns {
            let path = config.output_path(pattern.index);
            let file = File::create(&path).map_err(|source| ResourceError::CreateOutput {
                index: pattern.index,
                path: path.clone(),
                source,
            })?;
            debug!("Opened {path:?} for adapter {}", pattern.label);
            writers.push(BufWriter::new(file));
            paths.push(path);
        }

        let mut splitter = Self::from_writers(header, patterns, writers, config)?;
        for (target, path) in splitter.targets.iter_mut().zip(paths) {
            target.path = Some(path);
        }
        Ok(splitter)
    }
}
