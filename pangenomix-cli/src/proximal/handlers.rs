use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;

use pangenomix::build_proximal_pangenome;
use pangenomix::core::models::ProximalSide;

use crate::config::PipelineConfig;
use crate::utils::{genome_files, is_file, parse_pair, path_arg};

pub fn run_proximal(matches: &ArgMatches, config: &PipelineConfig) -> Result<()> {
    let side = matches
        .get_one::<String>("side")
        .context("Missing required argument --side")?;
    let side = ProximalSide::from_str(side)?;
    let allele_names = path_arg(matches, "allele-names")?;
    is_file(&allele_names)?;
    let genomes = genome_files(matches)?;
    let output = path_arg(matches, "output")?;
    let default_name = "Test".to_string();
    let name = matches.get_one::<String>("name").unwrap_or(&default_name);

    let mut params = config.proximal.clone();
    if let Some(limits) = matches.get_one::<String>("limits") {
        params.limits = Some(parse_pair::<i64>(limits)?);
    }
    if let Some(max_overlap) = matches.get_one::<usize>("max-overlap") {
        params.max_overlap = Some(*max_overlap);
    }
    if let Some(footer) = matches.get_one::<String>("footer") {
        params.footer = footer.clone();
    }
    params.include_fragments |= matches.get_flag("include-fragments");
    params.overwrite |= matches.get_flag("overwrite");

    let fastasort = matches
        .get_one::<PathBuf>("fastasort")
        .or(config.cluster.fastasort.as_ref());

    let table = build_proximal_pangenome(
        &genomes,
        &allele_names,
        &output,
        name,
        side,
        &params,
        fastasort.map(PathBuf::as_path),
    )?;
    log::info!(
        "{} {} variants across {} genomes",
        table.features().len(),
        side,
        table.genomes().len()
    );
    Ok(())
}
