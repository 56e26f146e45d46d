use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fxhash::FxHashMap;

use pangenomix_core::fasta::{FastaRecord, FastaRecordReader};
use pangenomix_core::utils::{genome_progress_bar, get_dynamic_reader};

use crate::digest::SequenceHash;

///
/// Distinct sequences seen so far, each with every header that carried it.
/// Entries keep first-encounter order; the first header of an entry is its
/// representative.
///
#[derive(Debug, Default, Clone)]
pub struct NonRedundantSet {
    index: FxHashMap<SequenceHash, usize>,
    entries: Vec<(SequenceHash, Vec<String>)>,
}

impl NonRedundantSet {
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Register `header` for `hash`. Returns `true` if the sequence had not
    /// been seen before.
    ///
    pub fn insert(&mut self, hash: SequenceHash, header: &str) -> bool {
        match self.index.get(&hash) {
            Some(&i) => {
                self.entries[i].1.push(header.to_string());
                false
            }
            None => {
                self.index.insert(hash, self.entries.len());
                self.entries.push((hash, vec![header.to_string()]));
                true
            }
        }
    }

    pub fn headers(&self, hash: &SequenceHash) -> Option<&[String]> {
        self.index.get(hash).map(|&i| self.entries[i].1.as_slice())
    }

    pub fn representative(&self, hash: &SequenceHash) -> Option<&str> {
        self.headers(hash).and_then(|h| h.first()).map(|h| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SequenceHash, &[String])> {
        self.entries.iter().map(|(h, headers)| (h, headers.as_slice()))
    }

    /// Header groups of sequences seen under more than one header.
    pub fn synonym_groups(&self) -> impl Iterator<Item = &[String]> {
        self.entries
            .iter()
            .map(|(_, headers)| headers.as_slice())
            .filter(|headers| headers.len() > 1)
    }

    /// Number of distinct sequences.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of headers across all sequences.
    pub fn total_headers(&self) -> usize {
        self.entries.iter().map(|(_, h)| h.len()).sum()
    }
}

///
/// Accumulates records from any number of FASTA streams, writing each
/// distinct sequence to `writer` the first time it is seen.
///
pub struct SequenceStore<W: Write> {
    writer: W,
    set: NonRedundantSet,
    missing: Vec<String>,
}

impl<W: Write> SequenceStore<W> {
    pub fn new(writer: W) -> Self {
        SequenceStore {
            writer,
            set: NonRedundantSet::new(),
            missing: Vec::new(),
        }
    }

    ///
    /// Add one record. Records without a sequence are remembered as missing,
    /// records without a header are dropped.
    ///
    pub fn push(&mut self, record: &FastaRecord) -> io::Result<()> {
        if record.header.is_empty() {
            log::debug!("Skipping FASTA record without a header");
            return Ok(());
        }
        if record.is_empty() {
            log::debug!("No sequence for header {}", record.header);
            self.missing.push(record.header.clone());
            return Ok(());
        }

        let hash = SequenceHash::from_parts(&record.lines);
        if self.set.insert(hash, &record.header) {
            record.write_to(&mut self.writer)?;
        }
        Ok(())
    }

    pub fn set(&self) -> &NonRedundantSet {
        &self.set
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Flush the output and hand back what was collected.
    pub fn finish(mut self) -> io::Result<ConsolidatedSequences> {
        self.writer.flush()?;
        Ok(ConsolidatedSequences {
            nonredundant: self.set,
            missing: self.missing,
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConsolidatedSequences {
    pub nonredundant: NonRedundantSet,
    pub missing: Vec<String>,
}

///
/// Merge the FASTA records of `sources` into a non-redundant FASTA file.
///
/// # Arguments
///
/// - sources: per-genome FASTA files, read in the given order
/// - nr_out: non-redundant FASTA output
/// - synonyms_out: tab-separated header groups of duplicated sequences
/// - missing_out: optional list of headers that had no sequence
///
pub fn consolidate(
    sources: &[PathBuf],
    nr_out: &Path,
    synonyms_out: &Path,
    missing_out: Option<&Path>,
) -> Result<ConsolidatedSequences> {
    let file = File::create(nr_out).with_context(|| format!("Failed to create {:?}", nr_out))?;
    let mut store = SequenceStore::new(BufWriter::new(file));

    let bar = genome_progress_bar(sources.len(), "Consolidating sequences");
    for source in sources {
        for record in FastaRecordReader::from_path(source)? {
            let record = record.with_context(|| format!("Failed to read {:?}", source))?;
            store.push(&record)?;
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let consolidated = store.finish()?;
    log::info!(
        "Found {} distinct sequences across {} headers in {} files",
        consolidated.nonredundant.len(),
        consolidated.nonredundant.total_headers(),
        sources.len()
    );

    write_synonyms(&consolidated.nonredundant, synonyms_out)?;
    if !consolidated.missing.is_empty() {
        log::warn!("{} headers had no sequence", consolidated.missing.len());
    }
    if let Some(path) = missing_out {
        write_missing(&consolidated.missing, path)?;
    }

    Ok(consolidated)
}

///
/// Write one line per duplicated sequence: representative first, then every
/// synonym, tab-separated.
///
pub fn write_synonyms(set: &NonRedundantSet, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for headers in set.synonym_groups() {
        writeln!(writer, "{}", headers.join("\t"))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_missing(missing: &[String], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for header in missing {
        writeln!(writer, "{}", header)?;
    }
    writer.flush()?;
    Ok(())
}

///
/// Read a synonym file back as representative -> synonyms.
///
pub fn load_synonyms(path: &Path) -> Result<FxHashMap<String, Vec<String>>> {
    let reader = get_dynamic_reader(path)?;
    let mut synonyms = FxHashMap::default();
    for line in reader.lines() {
        let line = line?;
        let mut headers = line.split('\t').map(str::trim).filter(|h| !h.is_empty());
        if let Some(representative) = headers.next() {
            synonyms
                .entry(representative.to_string())
                .or_insert_with(Vec::new)
                .extend(headers.map(String::from));
        }
    }
    Ok(synonyms)
}
