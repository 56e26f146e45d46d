use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bio::alphabets::dna;
use serde::{Deserialize, Serialize};

use pangenomix_core::fasta::write_wrapped;
use pangenomix_core::gff::read_gff;
use pangenomix_core::models::Strand;
use pangenomix_core::utils::{GenomeFiles, genome_progress_bar, write_atomically};
use pangenomix_tables::GenomeSource;

use crate::extract::load_contigs;

const LINE_WIDTH: usize = 70;

fn default_allowed_features() -> Vec<String> {
    ["transcript", "tRNA", "rRNA", "misc_binding"]
        .into_iter()
        .map(String::from)
        .collect()
}

///
/// Settings for extracting non-coding features.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoncodingParams {
    /// Extra bases taken from the 5' and 3' ends of each feature.
    pub flanking: (usize, usize),
    /// GFF feature types to extract.
    pub allowed_features: Vec<String>,
    /// Inserted into per-genome output names: `<genome>_noncoding<footer>.fna`.
    pub footer: String,
    pub overwrite: bool,
}

impl Default for NoncodingParams {
    fn default() -> Self {
        NoncodingParams {
            flanking: (0, 0),
            allowed_features: default_allowed_features(),
            footer: String::new(),
            overwrite: false,
        }
    }
}

///
/// Extract every feature of an allowed type from one genome, optionally
/// extended by `flanking` bases, and write them wrapped at 70 columns under
/// their `ID`. Windows are clipped at contig ends.
///
/// Returns the number of sequences written.
///
pub fn extract_noncoding(
    gff: &Path,
    contigs: &Path,
    output: &Path,
    flanking: (usize, usize),
    allowed_features: &[String],
) -> Result<usize> {
    let records = read_gff(gff)?;
    let contigs = load_contigs(contigs)?;

    let mut written = 0usize;
    write_atomically(output, |writer| {
        for (i, record) in records.iter().enumerate() {
            if !allowed_features.iter().any(|t| *t == record.feature_type) {
                continue;
            }
            let Some(contig) = contigs.get(&record.contig) else {
                log::debug!("Contig {} not found for feature #{}", record.contig, i + 1);
                continue;
            };
            let id = record.id().with_context(|| {
                format!("{:?}: {} feature #{} has no ID attribute", gff, record.feature_type, i + 1)
            })?;

            let start = record.start.saturating_sub(flanking.0).min(contig.len());
            let stop = (record.stop + flanking.1).min(contig.len()).max(start);
            let window = &contig[start..stop];
            let sequence = match record.strand {
                Strand::Reverse => dna::revcomp(window),
                _ => window.to_vec(),
            };

            write_wrapped(writer, id, &String::from_utf8_lossy(&sequence), LINE_WIDTH)?;
            written += 1;
        }
        Ok(())
    })?;

    log::debug!("Extracted {} non-coding sequences from {:?}", written, gff);
    Ok(written)
}

/// `<genome dir>/derived/<genome>_noncoding<footer>.fna`
pub fn noncoding_path(genome: &GenomeFiles, footer: &str) -> PathBuf {
    let dir = genome.fna.parent().unwrap_or_else(|| Path::new("."));
    dir.join("derived")
        .join(format!("{}_noncoding{}.fna", genome.genome, footer))
}

///
/// Run [`extract_noncoding`] for every genome, reusing existing outputs
/// unless `params.overwrite` is set. Each output is returned under its
/// genome's name.
///
pub fn extract_noncoding_for_genomes(
    genomes: &[GenomeFiles],
    params: &NoncodingParams,
) -> Result<Vec<GenomeSource>> {
    let mut sources = Vec::with_capacity(genomes.len());
    let bar = genome_progress_bar(genomes.len(), "Extracting non-coding sequences");
    for genome in genomes {
        let output = noncoding_path(genome, &params.footer);
        if output.is_file() && !params.overwrite {
            log::debug!("Using existing {:?}", output);
        } else {
            if let Some(dir) = output.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {:?}", dir))?;
            }
            extract_noncoding(
                &genome.gff,
                &genome.fna,
                &output,
                params.flanking,
                &params.allowed_features,
            )?;
        }
        sources.push(GenomeSource::new(&genome.genome, output));
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;

    const GFF: &str = "##gff-version 3\n\
accn|c1\tPATRIC\ttRNA\t3\t6\t.\t+\t0\tID=t1\n\
accn|c1\tPATRIC\trRNA\t3\t6\t.\t-\t0\tID=r1\n\
accn|c1\tPATRIC\tCDS\t1\t9\t.\t+\t0\tID=p1\n\
accn|c2\tPATRIC\ttRNA\t1\t3\t.\t+\t0\tID=t2\n";

    #[fixture]
    fn genome() -> (tempfile::TempDir, GenomeFiles) {
        let dir = tempfile::tempdir().unwrap();
        let gff = dir.path().join("g1.gff");
        let fna = dir.path().join("g1.fna");
        fs::write(&gff, GFF).unwrap();
        fs::write(&fna, ">c1 first contig\nAACGTTGGCA\n").unwrap();
        (
            dir,
            GenomeFiles {
                genome: "g1".to_string(),
                gff,
                fna,
            },
        )
    }

    #[rstest]
    fn test_extract_noncoding(genome: (tempfile::TempDir, GenomeFiles)) {
        let (dir, files) = genome;
        let out = dir.path().join("nc.fna");
        let n = extract_noncoding(&files.gff, &files.fna, &out, (0, 0), &default_allowed_features())
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(fs::read_to_string(&out).unwrap(), ">t1\nCGTT\n>r1\nAACG\n");
    }

    #[rstest]
    fn test_extract_noncoding_flanking_is_clipped(genome: (tempfile::TempDir, GenomeFiles)) {
        let (dir, files) = genome;
        let out = dir.path().join("nc.fna");
        let allowed = vec!["tRNA".to_string()];
        extract_noncoding(&files.gff, &files.fna, &out, (5, 2), &allowed).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), ">t1\nAACGTTGG\n");
    }

    #[rstest]
    fn test_extract_noncoding_wraps_long_sequences() {
        let dir = tempfile::tempdir().unwrap();
        let gff = dir.path().join("g.gff");
        let fna = dir.path().join("g.fna");
        fs::write(&gff, "accn|c1\tPATRIC\ttranscript\t1\t75\t.\t+\t0\tID=t1\n").unwrap();
        fs::write(&fna, format!(">c1\n{}\n", "A".repeat(80))).unwrap();
        let out = dir.path().join("nc.fna");

        extract_noncoding(&gff, &fna, &out, (0, 0), &default_allowed_features()).unwrap();

        let expected = format!(">t1\n{}\n{}\n", "A".repeat(70), "A".repeat(5));
        assert_eq!(fs::read_to_string(&out).unwrap(), expected);
    }

    #[rstest]
    fn test_extract_noncoding_for_genomes(genome: (tempfile::TempDir, GenomeFiles)) {
        let (dir, files) = genome;
        let params = NoncodingParams {
            footer: "_v1".to_string(),
            ..NoncodingParams::default()
        };

        let sources = extract_noncoding_for_genomes(&[files], &params).unwrap();

        let expected = dir.path().join("derived").join("g1_noncoding_v1.fna");
        assert_eq!(sources, vec![GenomeSource::new("g1", expected.clone())]);
        assert!(expected.is_file());
    }

    #[rstest]
    fn test_noncoding_params_default() {
        let params = NoncodingParams::default();
        assert_eq!(params.flanking, (0, 0));
        assert_eq!(params.allowed_features.len(), 4);
    }
}
