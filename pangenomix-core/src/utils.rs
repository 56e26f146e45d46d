use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::NamedTempFile;

use crate::errors::PangenomeError;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    let reader = BufReader::new(file);

    Ok(reader)
}

///
/// Derive a genome identifier from a per-genome file path: the file name
/// without its directory and without its (last) extension. A trailing `.gz`
/// is removed first, so `dir/562.1234.faa.gz` gives `562.1234`.
///
pub fn genome_name_from_path(path: &Path) -> std::result::Result<String, PangenomeError> {
    let invalid = || PangenomeError::InvalidGenomePath(path.display().to_string());
    let file_name = path.file_name().and_then(|f| f.to_str()).ok_or_else(invalid)?;
    let file_name = file_name.strip_suffix(".gz").unwrap_or(file_name);
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(invalid)?;
    if stem.is_empty() {
        return Err(invalid());
    }
    Ok(stem.to_string())
}

///
/// Genome name of a per-genome derived file such as
/// `derived/<genome>_upstream_v2.fna`: the file name up to `_<label>`.
/// Files without the label fall back to their stem.
///
pub fn genome_from_derived_path(path: &Path, label: &str) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let marker = format!("_{}", label);
    let genome = match file_name.find(&marker) {
        Some(pos) => &file_name[..pos],
        None => file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem),
    };
    (!genome.is_empty()).then(|| genome.to_string())
}

///
/// Write a file through a temporary sibling and move it into place once the
/// writer closure succeeds. On any error the temporary file is removed and
/// `destination` is left untouched.
///
pub fn write_atomically<F>(destination: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }

    tmp.persist(destination)
        .with_context(|| format!("Failed to move temporary file to {:?}", destination))?;

    Ok(())
}

///
/// List the files in `dir` whose name ends with `extension`, sorted by path.
///
pub fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|f| f.to_str())
            .is_some_and(|f| f.ends_with(extension));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

///
/// Progress bar for loops over genome files.
///
pub fn genome_progress_bar(len: usize, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    )
    .map(|s| s.progress_chars("##-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(message.to_string());
    bar
}

/// Annotation and contig files of one genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeFiles {
    pub genome: String,
    pub gff: PathBuf,
    pub fna: PathBuf,
}

///
/// Pair every `<genome>.gff` in `gff_dir` with `<genome>.fna` in `fna_dir`.
/// Genomes missing either file are skipped with a warning.
///
pub fn find_matching_genome_files(gff_dir: &Path, fna_dir: &Path) -> Result<Vec<GenomeFiles>> {
    let mut pairs = Vec::new();
    for gff in list_files_with_extension(gff_dir, ".gff")? {
        let genome = genome_name_from_path(&gff)?;
        let fna = fna_dir.join(format!("{}.fna", genome));
        if fna.is_file() {
            pairs.push(GenomeFiles { genome, gff, fna });
        } else {
            log::warn!("No contigs found for genome {} (expected {:?})", genome, fna);
        }
    }
    Ok(pairs)
}
