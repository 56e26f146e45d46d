use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use pangenomix_core::fasta::FastaRecordReader;
use pangenomix_core::utils::write_atomically;

use crate::resolver::HeaderToFeatureMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameSummary {
    pub renamed: usize,
    pub missing: Vec<String>,
}

///
/// Rewrite a non-redundant FASTA so every header is replaced by its feature
/// name. Record order and sequence layout are kept; records whose header has
/// no feature are dropped. `nr_out` may equal `nr_in`.
///
pub fn rename(
    nr_in: &Path,
    header_to_feature: &HeaderToFeatureMap,
    nr_out: &Path,
) -> Result<RenameSummary> {
    let mut summary = RenameSummary::default();

    write_atomically(nr_out, |writer| {
        for record in FastaRecordReader::from_path(nr_in)? {
            let record = record.with_context(|| format!("Failed to read {:?}", nr_in))?;
            match header_to_feature.get(&record.header) {
                Some(feature) => {
                    record.write_renamed(writer, feature)?;
                    summary.renamed += 1;
                }
                None => {
                    log::warn!("MISSING: {}", record.header);
                    summary.missing.push(record.header);
                }
            }
        }
        Ok(())
    })?;

    log::info!(
        "Renamed {} sequences in {:?} ({} without a name)",
        summary.renamed,
        nr_out,
        summary.missing.len()
    );

    Ok(summary)
}

///
/// Sort a FASTA file by header in place with Exonerate's `fastasort`.
///
/// Sorting is best-effort: if the tool cannot be run or exits with an error
/// the unsorted file is kept and `Ok(false)` is returned.
///
pub fn sort_fasta(path: &Path, fastasort: &Path) -> Result<bool> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let sorted = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
    let stdout: File = sorted.reopen()?;

    log::info!("Sorting sequences by header...");
    let output = Command::new(fastasort)
        .arg(path)
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::piped())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            sorted
                .persist(path)
                .with_context(|| format!("Failed to replace {:?} with sorted output", path))?;
            Ok(true)
        }
        Ok(output) => {
            log::warn!(
                "Aborting sort, {} exited with {}: {}",
                fastasort.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            Ok(false)
        }
        Err(e) => {
            log::warn!("Aborting sort, failed to run {}: {}", fastasort.display(), e);
            Ok(false)
        }
    }
}
