use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use sff_split::sff::{ReadData, ReadHeader};
use sff_split::{
    load_patterns, CommonHeader, EmptyOutputPolicy, Error, FormatError, Record, SffReader,
    SffWriter, SplitConfigBuilder, Splitter,
};

const ADAPTERS: &str = "\
# barcode adapters
IonXpress_001 CTAAGGTAAC
IonXpress_002 TAAGGAGAAC
IonXpress_003 AAGAGGATTC
IonXpress_004 GGGGGGGGGGGGGGGGGGGG
";

const SEQUENCES: [&[u8]; 3] = [b"CTAAGGTAAC", b"TAAGGAGAAC", b"AAGAGGATTC"];

fn header() -> CommonHeader {
    CommonHeader::new(b"TACG".repeat(25), b"TCAG".to_vec())
}

fn random_bases(rng: &mut SmallRng, len: usize) -> Vec<u8> {
    // no G, so the poly-G adapter never matches by chance
    (0..len).map(|_| b"ACT"[rng.random_range(0..3usize)]).collect()
}

/// Writes `nreads` random reads, each carrying one adapter (or none) after the key
///
/// Returns the adapter index of each read.
fn write_input(path: &Path, nreads: usize, seed: u64) -> Result<Vec<Option<usize>>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let header = header();
    let mut writer = SffWriter::new(BufWriter::new(File::create(path)?), header.clone());

    let mut carried = Vec::with_capacity(nreads);
    for i in 0..nreads {
        let adapter = rng.random_range(0..=SEQUENCES.len());
        let mut bases = b"TCAG".to_vec();
        let prefix_len = rng.random_range(0..8);
        bases.extend(random_bases(&mut rng, prefix_len));
        if let Some(sequence) = SEQUENCES.get(adapter) {
            bases.extend_from_slice(sequence);
            carried.push(Some(adapter));
        } else {
            carried.push(None);
        }
        let suffix_len = rng.random_range(10..40);
        bases.extend(random_bases(&mut rng, suffix_len));

        let nbases = bases.len();
        let record = Record {
            header: ReadHeader::new(format!("read_{i:05}").into_bytes(), nbases as u32)
                .with_quality_clip(5, nbases as u16),
            data: ReadData {
                flowgram: (0..header.flow_len()).map(|_| rng.random()).collect(),
                flow_index: (0..nbases).map(|_| rng.random_range(0..4)).collect(),
                quality: (0..nbases).map(|_| rng.random_range(2..41)).collect(),
                bases,
            },
        };
        writer.write_record(&record)?;
    }
    writer.finish()?;
    Ok(carried)
}

fn read_all(path: &Path) -> Result<(u32, Vec<Record>)> {
    let mut reader = SffReader::from_path(path)?;
    let nreads = reader.header().nreads;
    let mut records = Vec::new();
    while let Some(record) = reader.next_record() {
        records.push(record?);
    }
    Ok((nreads, records))
}

struct Fixture {
    dir: TempDir,
    carried: Vec<Option<usize>>,
}
impl Fixture {
    fn new(nreads: usize, seed: u64) -> Result<Self> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("adapters.txt"), ADAPTERS)?;
        let carried = write_input(&dir.path().join("input.sff"), nreads, seed)?;
        Ok(Self { dir, carried })
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("input.sff")
    }

    fn adapters(&self) -> PathBuf {
        self.dir.path().join("adapters.txt")
    }

    fn out_dir(&self) -> Result<PathBuf> {
        let out = self.dir.path().join("out");
        fs::create_dir_all(&out)?;
        Ok(out)
    }

    fn expected_count(&self, adapter: usize) -> usize {
        self.carried.iter().filter(|c| **c == Some(adapter)).count()
    }
}

#[test]
fn test_split_files() -> Result<()> {
    let fixture = Fixture::new(500, 42)?;
    let out = fixture.out_dir()?;
    let patterns = load_patterns(fixture.adapters())?;
    assert_eq!(patterns.len(), 4);

    let config = SplitConfigBuilder::default()
        .output_dir(&out)
        .threads(4)
        .build();
    let mut reader = SffReader::from_path(fixture.input())?;
    let mut splitter = Splitter::create(reader.header(), patterns, config)?;
    let summary = splitter.run(&mut reader)?;
    assert_eq!(summary.records_processed, 500);
    assert!(!summary.interrupted);

    let (_, input_records) = read_all(&fixture.input())?;
    for (adapter, target) in summary.targets.iter().enumerate() {
        let path = out.join(format!("split_{:03}.sff", adapter + 1));
        assert_eq!(target.path.as_deref(), Some(path.as_path()));

        let (nreads, records) = read_all(&path)?;
        let expected = fixture.expected_count(adapter);
        assert_eq!(nreads as usize, expected);
        assert_eq!(records.len(), expected);
        assert_eq!(target.count as usize, expected);

        // outputs hold unmodified input records, in input order
        let expected_records: Vec<_> = input_records
            .iter()
            .zip(&fixture.carried)
            .filter(|(_, c)| **c == Some(adapter))
            .map(|(r, _)| r)
            .collect();
        assert_eq!(records.iter().collect::<Vec<_>>(), expected_records);
    }
    Ok(())
}

#[test]
fn test_split_outputs_keep_input_header() -> Result<()> {
    let fixture = Fixture::new(50, 7)?;
    let out = fixture.out_dir()?;
    let config = SplitConfigBuilder::default()
        .output_dir(&out)
        .prefix("barcode")
        .threads(1)
        .build();
    let mut reader = SffReader::from_path(fixture.input())?;
    let mut splitter = Splitter::create(reader.header(), load_patterns(fixture.adapters())?, config)?;
    splitter.run(&mut reader)?;

    let input = SffReader::from_path(fixture.input())?;
    let output = SffReader::from_path(out.join("barcode_001.sff"))?;
    assert_eq!(output.header().flow, input.header().flow);
    assert_eq!(output.header().key, input.header().key);
    assert_eq!(output.header().header_len, input.header().header_len);
    assert_eq!(output.header().index_offset, 0);
    assert_eq!(output.header().index_len, 0);
    Ok(())
}

#[test]
fn test_dry_run_creates_nothing() -> Result<()> {
    let fixture = Fixture::new(200, 3)?;
    let out = fixture.out_dir()?;
    let config = SplitConfigBuilder::default()
        .output_dir(&out)
        .dry_run(true)
        .build();
    let mut reader = SffReader::from_path(fixture.input())?;
    let mut splitter = Splitter::create(reader.header(), load_patterns(fixture.adapters())?, config)?;
    let summary = splitter.run(&mut reader)?;

    assert_eq!(fs::read_dir(&out)?.count(), 0);
    for (adapter, target) in summary.targets.iter().enumerate() {
        assert_eq!(target.count as usize, fixture.expected_count(adapter));
        assert!(target.path.is_none());
    }
    Ok(())
}

#[test]
fn test_clipping_can_be_ignored() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("input.sff");
    let header = header();

    // the adapter lies beyond the quality clip
    let bases = b"TCAGTTTTTTCTAAGGTAAC".to_vec();
    let record = Record {
        header: ReadHeader::new(b"clipped".to_vec(), bases.len() as u32).with_quality_clip(5, 10),
        data: ReadData {
            flowgram: vec![0; usize::from(header.flow_len())],
            flow_index: vec![1; bases.len()],
            quality: vec![30; bases.len()],
            bases,
        },
    };
    let mut writer = SffWriter::new(BufWriter::new(File::create(&input)?), header);
    writer.write_record(&record)?;
    writer.finish()?;

    let patterns = sff_split::patterns::parse_patterns("IonXpress_001 CTAAGGTAAC");
    for (ignore_clipping, expected) in [(false, 0), (true, 1)] {
        let config = SplitConfigBuilder::default()
            .ignore_clipping(ignore_clipping)
            .dry_run(true)
            .build();
        let mut reader = SffReader::from_path(&input)?;
        let mut splitter = Splitter::create(reader.header(), patterns.clone(), config)?;
        let summary = splitter.run(&mut reader)?;
        assert_eq!(summary.targets[0].count, expected);
    }
    Ok(())
}

#[test]
fn test_interrupt_finalizes_outputs() -> Result<()> {
    let fixture = Fixture::new(100, 11)?;
    let out = fixture.out_dir()?;
    let config = SplitConfigBuilder::default().output_dir(&out).build();
    let mut reader = SffReader::from_path(fixture.input())?;
    let mut splitter = Splitter::create(reader.header(), load_patterns(fixture.adapters())?, config)?;

    // process a few reads, then interrupt
    for _ in 0..10 {
        let record = reader.next_record().unwrap()?;
        splitter.process_record(&record)?;
    }
    splitter.interrupt_handle().store(true, std::sync::atomic::Ordering::SeqCst);
    let summary = splitter.run(&mut reader)?;
    assert!(summary.interrupted);
    assert_eq!(summary.records_processed, 10);

    let mut total = 0;
    for (adapter, target) in summary.targets.iter().enumerate() {
        let (nreads, records) = read_all(&out.join(format!("split_{:03}.sff", adapter + 1)))?;
        assert_eq!(nreads as usize, records.len());
        assert_eq!(u64::from(nreads), target.count);
        total += records.len();
    }
    let expected = fixture.carried[..10].iter().filter(|c| c.is_some()).count();
    assert_eq!(total, expected);
    Ok(())
}

#[test]
fn test_remove_empty_outputs() -> Result<()> {
    let fixture = Fixture::new(100, 5)?;
    let out = fixture.out_dir()?;
    let config = SplitConfigBuilder::default()
        .output_dir(&out)
        .empty_outputs(EmptyOutputPolicy::Remove)
        .build();
    let mut reader = SffReader::from_path(fixture.input())?;
    let mut splitter = Splitter::create(reader.header(), load_patterns(fixture.adapters())?, config)?;
    let summary = splitter.run(&mut reader)?;

    // the poly-G adapter never matches
    assert_eq!(summary.targets[3].count, 0);
    assert!(summary.targets[3].path.is_none());
    assert!(!out.join("split_004.sff").exists());
    assert!(out.join("split_001.sff").exists());
    Ok(())
}

#[test]
fn test_empty_outputs_are_valid_by_default() -> Result<()> {
    let fixture = Fixture::new(20, 9)?;
    let out = fixture.out_dir()?;
    let config = SplitConfigBuilder::default().output_dir(&out).build();
    let mut reader = SffReader::from_path(fixture.input())?;
    let mut splitter = Splitter::create(reader.header(), load_patterns(fixture.adapters())?, config)?;
    splitter.run(&mut reader)?;

    let (nreads, records) = read_all(&out.join("split_004.sff"))?;
    assert_eq!(nreads, 0);
    assert!(records.is_empty());
    Ok(())
}

#[test]
fn test_missing_inputs() {
    let dir = TempDir::new().unwrap();
    assert!(load_patterns(dir.path().join("missing.txt")).is_err());
    assert!(SffReader::from_path(dir.path().join("missing.sff")).is_err());
    // a directory is not a regular file
    assert!(SffReader::from_path(dir.path()).is_err());
}

#[test]
fn test_missing_output_dir() -> Result<()> {
    let fixture = Fixture::new(5, 1)?;
    let config = SplitConfigBuilder::default()
        .output_dir(fixture.dir.path().join("does/not/exist"))
        .build();
    let reader = SffReader::from_path(fixture.input())?;
    let result = Splitter::create(reader.header(), load_patterns(fixture.adapters())?, config);
    assert!(matches!(
        result,
        Err(sff_split::Error::ResourceError(
            sff_split::ResourceError::CreateOutput { index: 0, .. }
        ))
    ));
    Ok(())
}

#[test]
fn test_truncated_input_aborts_with_finalized_outputs() -> Result<()> {
    let nreads = 60;
    let fixture = Fixture::new(nreads, 13)?;

    // cut the last record inside its data section
    let input = OpenOptions::new().write(true).open(fixture.input())?;
    let len = input.metadata()?.len();
    input.set_len(len - 20)?;
    drop(input);

    let out = fixture.out_dir()?;
    let config = SplitConfigBuilder::default()
        .output_dir(&out)
        .threads(2)
        .build();
    let mut reader = SffReader::from_path(fixture.input())?;
    let mut splitter = Splitter::create(reader.header(), load_patterns(fixture.adapters())?, config)?;

    let err = splitter.run(&mut reader).unwrap_err();
    assert!(matches!(
        err,
        Error::FormatError(FormatError::Truncated { .. })
    ));
    let summary = splitter.summary();
    assert_eq!(summary.records_processed as usize, nreads - 1);

    // every output was finalized with the reads written before the failure
    for (adapter, target) in summary.targets.iter().enumerate() {
        let (count, records) = read_all(&out.join(format!("split_{:03}.sff", adapter + 1)))?;
        assert_eq!(count as usize, records.len());
        assert_eq!(u64::from(count), target.count);
        let expected = fixture.carried[..nreads - 1]
            .iter()
            .filter(|c| **c == Some(adapter))
            .count();
        assert_eq!(records.len(), expected);
    }
    Ok(())
}
