use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pangenomix_cluster::{
    ClusterParams, HeaderToFeatureMap, cluster_with_cdhit, load_feature_to_allele, rename,
    resolve, sort_fasta, write_allele_names,
};
use pangenomix_core::models::{ClusterKind, ProximalSide};
use pangenomix_core::utils::GenomeFiles;
use pangenomix_proximal::{
    NoncodingParams, ProximalParams, consolidate_proximal, extract_for_genomes,
    extract_noncoding_for_genomes,
};
use pangenomix_seqstore::{ConsolidatedSequences, consolidate};
use pangenomix_tables::{
    FeatureTable, GenomeSource, build_feature_tables_from_sources, write_table_to_mtx,
};

///
/// Locations of everything a CDS or non-coding pan-genome run writes into
/// its output directory.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PangenomeOutputs {
    /// Non-redundant sequences, renamed to alleles once clustering is done.
    pub nr_fasta: PathBuf,
    /// Scratch output handed to CD-HIT; removed after clustering.
    pub cdhit_out: PathBuf,
    pub cluster_file: PathBuf,
    pub allele_names: PathBuf,
    pub redundant_headers: PathBuf,
    pub missing_headers: PathBuf,
    /// Prefix of the allele x genome Matrix Market files.
    pub allele_table: PathBuf,
    /// Prefix of the gene x genome Matrix Market files.
    pub gene_table: PathBuf,
}

impl PangenomeOutputs {
    fn with_prefix(output_dir: &Path, prefix: &str, nr_extension: &str, tables: &str) -> Self {
        let nr_fasta = output_dir.join(format!("{}_nr.{}", prefix, nr_extension));
        let cdhit_out = output_dir.join(format!("{}_nr.{}.cdhit", prefix, nr_extension));
        let cluster_file = output_dir.join(format!("{}_nr.{}.cdhit.clstr", prefix, nr_extension));
        PangenomeOutputs {
            nr_fasta,
            cdhit_out,
            cluster_file,
            allele_names: output_dir.join(format!("{}_allele_names.tsv", prefix)),
            redundant_headers: output_dir.join(format!("{}_redundant_headers.tsv", prefix)),
            missing_headers: output_dir.join(format!("{}_missing_headers.txt", prefix)),
            allele_table: output_dir.join(format!("{}_allele", tables)),
            gene_table: output_dir.join(format!("{}_gene", tables)),
        }
    }

    /// `<name>_nr.faa`, `<name>_strain_by_allele_*`, ...
    pub fn cds(output_dir: &Path, name: &str) -> Self {
        Self::with_prefix(output_dir, name, "faa", &format!("{}_strain_by", name))
    }

    /// `<name>_noncoding_nr.fna`, `<name>_strain_by_noncoding_allele_*`, ...
    pub fn noncoding(output_dir: &Path, name: &str) -> Self {
        Self::with_prefix(
            output_dir,
            &format!("{}_noncoding", name),
            "fna",
            &format!("{}_strain_by_noncoding", name),
        )
    }
}

/// Tables produced by a pan-genome run, with the header naming behind them.
#[derive(Debug, Clone)]
pub struct Pangenome {
    pub alleles: FeatureTable,
    pub genes: FeatureTable,
    pub header_to_allele: HeaderToFeatureMap,
}

fn create_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))
}

///
/// Merge every genome's sequences into the non-redundant FASTA, recording
/// redundant and sequence-less headers alongside it.
///
pub fn consolidate_genomes(
    sources: &[GenomeSource],
    outputs: &PangenomeOutputs,
) -> Result<ConsolidatedSequences> {
    log::info!("Identifying non-redundant sequences...");
    let paths: Vec<PathBuf> = sources.iter().map(|s| s.path.clone()).collect();
    consolidate(
        &paths,
        &outputs.nr_fasta,
        &outputs.redundant_headers,
        Some(&outputs.missing_headers),
    )
}

///
/// Cluster the non-redundant FASTA with CD-HIT (CD-HIT-EST for nucleotide
/// files). Only the `.clstr` file is kept.
///
pub fn cluster_nonredundant(outputs: &PangenomeOutputs, params: &ClusterParams) -> Result<()> {
    cluster_with_cdhit(&outputs.nr_fasta, &outputs.cdhit_out, params)?;
    if outputs.cdhit_out.exists() {
        fs::remove_file(&outputs.cdhit_out)
            .with_context(|| format!("Failed to remove {:?}", outputs.cdhit_out))?;
    }
    Ok(())
}

///
/// Name every clustered sequence, rename the non-redundant FASTA in place
/// and build and save the allele and gene tables.
///
pub fn name_and_tabulate(
    sources: &[GenomeSource],
    outputs: &PangenomeOutputs,
    name: &str,
    kind: ClusterKind,
    fastasort: Option<&Path>,
) -> Result<Pangenome> {
    log::info!("Naming alleles from {:?}...", outputs.cluster_file);
    let resolution = resolve(
        &outputs.cluster_file,
        Some(&outputs.redundant_headers),
        name,
        kind,
    )?;
    write_allele_names(&resolution.assignments, &outputs.allele_names)?;
    rename(&outputs.nr_fasta, &resolution.header_to_allele, &outputs.nr_fasta)?;
    if let Some(fastasort) = fastasort {
        sort_fasta(&outputs.nr_fasta, fastasort)?;
    }

    let (alleles, genes) = build_feature_tables_from_sources(&resolution.header_to_allele, sources)?;
    let allele_paths = write_table_to_mtx(&alleles, &outputs.allele_table)?;
    log::info!("Saved allele table to {:?}", allele_paths.matrix);
    let gene_paths = write_table_to_mtx(&genes, &outputs.gene_table)?;
    log::info!("Saved gene table to {:?}", gene_paths.matrix);

    Ok(Pangenome {
        alleles,
        genes,
        header_to_allele: resolution.header_to_allele,
    })
}

fn build_pangenome(
    sources: &[GenomeSource],
    outputs: &PangenomeOutputs,
    name: &str,
    kind: ClusterKind,
    params: &ClusterParams,
) -> Result<Pangenome> {
    consolidate_genomes(sources, outputs)?;
    cluster_nonredundant(outputs, params)?;
    name_and_tabulate(sources, outputs, name, kind, params.fastasort.as_deref())
}

///
/// Build a protein pan-genome from per-genome FAA files. Genomes are named
/// after their files.
///
/// # Arguments
///
/// - faa_paths: one protein FASTA per genome
/// - output_dir: where all outputs are written; created if missing
/// - name: prefix of output files and allele names
/// - params: CD-HIT arguments and optional tool locations
///
pub fn build_cds_pangenome(
    faa_paths: &[PathBuf],
    output_dir: &Path,
    name: &str,
    params: &ClusterParams,
) -> Result<Pangenome> {
    create_output_dir(output_dir)?;
    let sources = faa_paths
        .iter()
        .cloned()
        .map(GenomeSource::from_path)
        .collect::<Result<Vec<_>>>()?;
    let outputs = PangenomeOutputs::cds(output_dir, name);
    build_pangenome(&sources, &outputs, name, ClusterKind::Cds, params)
}

///
/// Build a pan-genome of non-coding features (tRNAs, rRNAs, ...) extracted
/// from GFF/FNA pairs. Extracted sequences are written next to each genome
/// under `derived/`.
///
pub fn build_noncoding_pangenome(
    genomes: &[GenomeFiles],
    output_dir: &Path,
    name: &str,
    noncoding: &NoncodingParams,
    params: &ClusterParams,
) -> Result<Pangenome> {
    create_output_dir(output_dir)?;
    log::info!("Extracting non-coding sequences for {} genomes...", genomes.len());
    let sources = extract_noncoding_for_genomes(genomes, noncoding)?;
    let outputs = PangenomeOutputs::noncoding(output_dir, name);
    build_pangenome(&sources, &outputs, name, ClusterKind::Noncoding, params)
}

/// `<name>_nr_<side>.fna` and the `<name>_strain_by_<side>` table prefix.
pub fn proximal_outputs(output_dir: &Path, name: &str, side: ProximalSide) -> (PathBuf, PathBuf) {
    (
        output_dir.join(format!("{}_nr_{}.fna", name, side)),
        output_dir.join(format!("{}_strain_by_{}", name, side)),
    )
}

///
/// Extract the upstream or downstream region of every named coding
/// sequence and classify them into per-gene variants.
///
/// `allele_names` is the `<name>_allele_names.tsv` of an earlier CDS run
/// over the same genomes.
///
pub fn build_proximal_pangenome(
    genomes: &[GenomeFiles],
    allele_names: &Path,
    output_dir: &Path,
    name: &str,
    side: ProximalSide,
    params: &ProximalParams,
    fastasort: Option<&Path>,
) -> Result<FeatureTable> {
    create_output_dir(output_dir)?;
    log::info!("Loading allele names from {:?}...", allele_names);
    let feature_to_allele = load_feature_to_allele(allele_names)?;

    log::info!("Extracting {} sequences for {} genomes...", side, genomes.len());
    let genome_proximals = extract_for_genomes(genomes, Some(&feature_to_allele), side, params)?;

    let (nr_out, table_prefix) = proximal_outputs(output_dir, name, side);
    log::info!("Identifying non-redundant {} sequences per gene...", side);
    let table = consolidate_proximal(&genome_proximals, &feature_to_allele, side, &nr_out)?;
    if let Some(fastasort) = fastasort {
        sort_fasta(&nr_out, fastasort)?;
    }

    let paths = write_table_to_mtx(&table, &table_prefix)?;
    log::info!("Saved {} table to {:?}", side, paths.matrix);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_cds_outputs() {
        let outputs = PangenomeOutputs::cds(Path::new("out"), "Ec");
        assert_eq!(outputs.nr_fasta, Path::new("out/Ec_nr.faa"));
        assert_eq!(outputs.cdhit_out, Path::new("out/Ec_nr.faa.cdhit"));
        assert_eq!(outputs.cluster_file, Path::new("out/Ec_nr.faa.cdhit.clstr"));
        assert_eq!(outputs.allele_names, Path::new("out/Ec_allele_names.tsv"));
        assert_eq!(outputs.redundant_headers, Path::new("out/Ec_redundant_headers.tsv"));
        assert_eq!(outputs.missing_headers, Path::new("out/Ec_missing_headers.txt"));
        assert_eq!(outputs.allele_table, Path::new("out/Ec_strain_by_allele"));
        assert_eq!(outputs.gene_table, Path::new("out/Ec_strain_by_gene"));
    }

    #[rstest]
    fn test_noncoding_outputs() {
        let outputs = PangenomeOutputs::noncoding(Path::new("out"), "Ec");
        assert_eq!(outputs.nr_fasta, Path::new("out/Ec_noncoding_nr.fna"));
        assert_eq!(outputs.cluster_file, Path::new("out/Ec_noncoding_nr.fna.cdhit.clstr"));
        assert_eq!(outputs.allele_names, Path::new("out/Ec_noncoding_allele_names.tsv"));
        assert_eq!(outputs.allele_table, Path::new("out/Ec_strain_by_noncoding_allele"));
        assert_eq!(outputs.gene_table, Path::new("out/Ec_strain_by_noncoding_gene"));
    }

    #[rstest]
    #[case(ProximalSide::Upstream, "out/Ec_nr_upstream.fna", "out/Ec_strain_by_upstream")]
    #[case(ProximalSide::Downstream, "out/Ec_nr_downstream.fna", "out/Ec_strain_by_downstream")]
    fn test_proximal_outputs(
        #[case] side: ProximalSide,
        #[case] nr: &str,
        #[case] table: &str,
    ) {
        let (nr_out, prefix) = proximal_outputs(Path::new("out"), "Ec", side);
        assert_eq!(nr_out, Path::new(nr));
        assert_eq!(prefix, Path::new(table));
    }
}
