use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::ArgMatches;

use pangenomix::build_cds_pangenome;
use pangenomix::core::utils::list_files_with_extension;

use crate::config::PipelineConfig;
use crate::utils::{cluster_params, path_arg};

pub fn run_cds(matches: &ArgMatches, config: &PipelineConfig) -> Result<()> {
    let mut faa_paths: Vec<PathBuf> = matches
        .get_many::<PathBuf>("faa")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();
    if let Some(dir) = matches.get_one::<PathBuf>("faa-dir") {
        faa_paths.extend(list_files_with_extension(dir, ".faa")?);
    }
    if faa_paths.is_empty() {
        bail!("No protein FASTA files given; pass files or --faa-dir");
    }

    let output = path_arg(matches, "output")?;
    let default_name = "Test".to_string();
    let name = matches.get_one::<String>("name").unwrap_or(&default_name);
    let params = cluster_params(matches, &config.cluster);

    log::info!("Building CDS pan-genome {} from {} genomes", name, faa_paths.len());
    let pangenome = build_cds_pangenome(&faa_paths, &output, name, &params)?;
    log::info!(
        "{} alleles in {} genes across {} genomes",
        pangenome.alleles.features().len(),
        pangenome.genes.features().len(),
        pangenome.genes.genomes().len()
    );
    Ok(())
}
