use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use fxhash::FxHashSet;

use pangenomix_core::fasta::FastaRecordReader;
use pangenomix_core::models::gene_of;

use crate::table::FeatureTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominantAllele {
    pub gene: String,
    pub allele: String,
    /// Sum of the genome counts of all the gene's alleles.
    pub gene_count: usize,
    pub allele_count: usize,
}

///
/// Most common allele of every gene in an allele x genome table. Ties go to
/// the allele listed first. Genes absent from every genome are left out.
///
pub fn find_dominant_alleles(alleles: &FeatureTable) -> Result<Vec<DominantAllele>> {
    let mut dominant: Vec<DominantAllele> = Vec::new();
    for (allele, count) in alleles.features().iter().zip(alleles.genome_counts()) {
        let gene = gene_of(allele)?;
        match dominant.last_mut() {
            Some(current) if current.gene == gene => {
                if count > current.allele_count {
                    current.allele = allele.clone();
                    current.allele_count = count;
                }
                current.gene_count += count;
            }
            _ => dominant.push(DominantAllele {
                gene,
                allele: allele.clone(),
                gene_count: count,
                allele_count: count,
            }),
        }
    }
    dominant.retain(|d| d.gene_count > 0);
    Ok(dominant)
}

///
/// Find the dominant alleles and copy their sequences from `allele_fasta`
/// to `dominant_out`.
///
pub fn extract_dominant_alleles(
    alleles: &FeatureTable,
    allele_fasta: &Path,
    dominant_out: &Path,
) -> Result<Vec<DominantAllele>> {
    let dominant = find_dominant_alleles(alleles)?;
    let wanted: FxHashSet<&str> = dominant.iter().map(|d| d.allele.as_str()).collect();

    let file = File::create(dominant_out)
        .with_context(|| format!("Failed to create {:?}", dominant_out))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0usize;
    for record in FastaRecordReader::from_path(allele_fasta)? {
        let record = record?;
        if wanted.contains(record.header.as_str()) {
            record.write_to(&mut writer)?;
            written += 1;
        }
    }
    writer.flush()?;

    log::info!(
        "Found {} dominant alleles, exported {} sequences",
        dominant.len(),
        written
    );
    Ok(dominant)
}

///
/// Write dominant alleles as a TSV with a header row.
///
pub fn write_dominant_alleles(dominant: &[DominantAllele], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "gene\tdominant_allele\tgene_count\tallele_count")?;
    for d in dominant {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            d.gene, d.allele, d.gene_count, d.allele_count
        )?;
    }
    writer.flush()?;
    Ok(())
}
