use anyhow::Result;
use clap::ArgMatches;

use pangenomix::build_noncoding_pangenome;

use crate::config::PipelineConfig;
use crate::utils::{cluster_params, genome_files, parse_pair, path_arg};

pub fn run_noncoding(matches: &ArgMatches, config: &PipelineConfig) -> Result<()> {
    let genomes = genome_files(matches)?;
    let output = path_arg(matches, "output")?;
    let default_name = "Test".to_string();
    let name = matches.get_one::<String>("name").unwrap_or(&default_name);

    let mut noncoding = config.noncoding.clone();
    if let Some(flanking) = matches.get_one::<String>("flanking") {
        noncoding.flanking = parse_pair::<usize>(flanking)?;
    }
    if let Some(features) = matches.get_many::<String>("feature") {
        noncoding.allowed_features = features.cloned().collect();
    }
    if let Some(footer) = matches.get_one::<String>("footer") {
        noncoding.footer = footer.clone();
    }
    noncoding.overwrite |= matches.get_flag("overwrite");

    let params = cluster_params(matches, &config.cluster);
    let pangenome = build_noncoding_pangenome(&genomes, &output, name, &noncoding, &params)?;
    log::info!(
        "{} non-coding alleles in {} clusters",
        pangenome.alleles.features().len(),
        pangenome.genes.features().len()
    );
    Ok(())
}
