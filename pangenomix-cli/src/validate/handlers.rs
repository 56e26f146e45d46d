use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;

use pangenomix::cluster::load_feature_to_allele;
use pangenomix::core::models::ProximalSide;
use pangenomix::core::utils::list_files_with_extension;
use pangenomix::tables::{
    GenomeDiscrepancy, read_table_from_mtx, validate_gene_table, validate_proximal_table_direct,
    validate_table_against_fasta,
};

use crate::utils::{parse_pair, path_arg};

fn log_discrepancies(discrepancies: &[GenomeDiscrepancy]) {
    for d in discrepancies {
        log::warn!(
            "{}: {} only in table, {} only in genome",
            d.genome,
            d.table_only.len(),
            d.genome_only.len()
        );
        log::debug!("{}: table only {:?}", d.genome, d.table_only);
        log::debug!("{}: genome only {:?}", d.genome, d.genome_only);
    }
}

pub fn run_validate_genes(matches: &ArgMatches) -> Result<()> {
    let genes = read_table_from_mtx(&path_arg(matches, "genes")?)?;
    let alleles = read_table_from_mtx(&path_arg(matches, "alleles")?)?;

    let report = validate_gene_table(&genes, &alleles)?;
    log_discrepancies(&report.discrepancies);
    if report.is_consistent() {
        log::info!("Gene table is consistent across {} genomes", report.genomes_checked);
    } else {
        log::warn!(
            "Gene table disagrees with allele table in {} of {} genomes",
            report.discrepancies.len(),
            report.genomes_checked
        );
    }
    Ok(())
}

pub fn run_validate_fasta(matches: &ArgMatches) -> Result<()> {
    let table = read_table_from_mtx(&path_arg(matches, "table")?)?;
    let features = path_arg(matches, "features")?;
    let genomes: Vec<PathBuf> = matches
        .get_many::<PathBuf>("genomes")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();
    let feature_to_allele = match matches.get_one::<PathBuf>("allele-names") {
        Some(path) => Some(load_feature_to_allele(path)?),
        None => None,
    };

    let report =
        validate_table_against_fasta(&table, &genomes, &features, feature_to_allele.as_ref())?;
    log_discrepancies(&report.discrepancies);
    for genome in &report.unknown_genomes {
        log::warn!("{} is not a table column", genome);
    }
    if report.unmatched_sequences > 0 {
        log::warn!(
            "{} genome sequences match no feature in {:?}",
            report.unmatched_sequences,
            features
        );
    }
    if report.is_consistent() {
        log::info!("Table is consistent across {} genomes", report.genomes_checked);
    } else {
        log::warn!(
            "Table disagrees with {} of {} genomes",
            report.discrepancies.len() + report.unknown_genomes.len(),
            report.genomes_checked
        );
    }
    Ok(())
}

pub fn run_validate_proximal(matches: &ArgMatches) -> Result<()> {
    let table = read_table_from_mtx(&path_arg(matches, "table")?)?;
    let features = path_arg(matches, "features")?;
    let fna_dir = path_arg(matches, "fna-dir")?;
    let side = matches
        .get_one::<String>("side")
        .context("Missing required argument --side")?;
    let side = ProximalSide::from_str(side)?;
    let limits = match matches.get_one::<String>("limits") {
        Some(limits) => parse_pair::<i64>(limits)?,
        None => side.default_limits(),
    };

    let contigs = list_files_with_extension(&fna_dir, ".fna")?;
    let report = validate_proximal_table_direct(&table, &contigs, &features, limits, side)?;

    for (codon, count) in &report.codon_counts {
        log::info!("{}\t{}", codon, count);
    }
    if report.unchecked > 0 {
        log::info!("{} truncated {} sequences were not checked", report.unchecked, side);
    }
    if report.missing.is_empty() {
        log::info!("All checked {} sequences found in {} genomes", side, report.genomes_checked);
    } else {
        for (genome, feature) in &report.missing {
            log::debug!("{}: {} not found", genome, feature);
        }
        log::warn!(
            "{} {} sequences were not found in their genomes",
            report.missing.len(),
            side
        );
    }
    Ok(())
}
