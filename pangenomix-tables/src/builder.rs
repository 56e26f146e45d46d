use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use fxhash::FxHashSet;

use pangenomix_cluster::HeaderToFeatureMap;
use pangenomix_core::fasta::FastaRecordReader;
use pangenomix_core::models::gene_of;
use pangenomix_core::utils::{genome_name_from_path, genome_progress_bar};

use crate::table::{FeatureTable, FeatureTableBuilder};

/// One genome's sequence file and the column name it gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeSource {
    pub genome: String,
    pub path: PathBuf,
}

impl GenomeSource {
    pub fn new(genome: &str, path: PathBuf) -> Self {
        GenomeSource {
            genome: genome.to_string(),
            path,
        }
    }

    /// Column named after the file (directory and extension removed).
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let genome = genome_name_from_path(&path)?;
        Ok(GenomeSource { genome, path })
    }
}

///
/// Gene rows in the order their first allele appears among the sorted
/// alleles.
///
pub fn genes_from_alleles(alleles: &[String]) -> Result<Vec<String>> {
    let mut seen = FxHashSet::default();
    let mut genes = Vec::new();
    for allele in alleles {
        let gene = gene_of(allele)?;
        if seen.insert(gene.clone()) {
            genes.push(gene);
        }
    }
    Ok(genes)
}

///
/// Build the allele x genome and gene x genome tables from per-genome
/// sequence files, columns named after the files.
///
pub fn build_feature_tables(
    header_to_allele: &HeaderToFeatureMap,
    genome_paths: &[PathBuf],
) -> Result<(FeatureTable, FeatureTable)> {
    let sources = genome_paths
        .iter()
        .cloned()
        .map(GenomeSource::from_path)
        .collect::<Result<Vec<_>>>()?;
    build_feature_tables_from_sources(header_to_allele, &sources)
}

///
/// Build the allele x genome and gene x genome tables.
///
/// Every record of every genome is looked up by header; the allele it maps
/// to and that allele's gene are marked present. Records with no sequence
/// are skipped and unknown headers are logged as missing.
///
pub fn build_feature_tables_from_sources(
    header_to_allele: &HeaderToFeatureMap,
    sources: &[GenomeSource],
) -> Result<(FeatureTable, FeatureTable)> {
    let mut sources = sources.to_vec();
    sources.sort_by(|a, b| a.genome.cmp(&b.genome));
    if let Some(pair) = sources.windows(2).find(|w| w[0].genome == w[1].genome) {
        bail!(
            "Genome name {} is shared by {:?} and {:?}",
            pair[0].genome,
            pair[0].path,
            pair[1].path
        );
    }
    let genomes: Vec<String> = sources.iter().map(|s| s.genome.clone()).collect();

    let alleles = header_to_allele.features();
    let genes = genes_from_alleles(&alleles)?;
    log::info!(
        "Building tables for {} alleles, {} genes and {} genomes",
        alleles.len(),
        genes.len(),
        genomes.len()
    );

    let mut allele_table = FeatureTableBuilder::new(alleles, genomes.clone());
    let mut gene_table = FeatureTableBuilder::new(genes, genomes);

    let bar = genome_progress_bar(sources.len(), "Scanning genomes");
    for source in &sources {
        let mut missing = 0usize;
        for record in FastaRecordReader::from_path(&source.path)? {
            let record = record.with_context(|| format!("Failed to read {:?}", source.path))?;
            if record.is_empty() {
                continue;
            }
            match header_to_allele.get(&record.header) {
                Some(allele) => {
                    allele_table.set(allele, &source.genome);
                    gene_table.set(&gene_of(allele)?, &source.genome);
                }
                None => {
                    log::warn!("MISSING: {} ({})", record.header, source.genome);
                    missing += 1;
                }
            }
        }
        if missing > 0 {
            log::warn!("{} headers of {} have no allele", missing, source.genome);
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    Ok((allele_table.build()?, gene_table.build()?))
}
