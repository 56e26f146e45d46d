use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command, arg, value_parser};

use pangenomix::cluster::ClusterParams;
use pangenomix::core::utils::{GenomeFiles, find_matching_genome_files};

pub fn path_arg(matches: &ArgMatches, name: &str) -> Result<PathBuf> {
    matches
        .get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("Missing required argument --{}", name))
}

///
/// Parse a `X,Y` pair such as `-50,3`.
///
pub fn parse_pair<T>(value: &str) -> Result<(T, T)>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some((first, second)) = value.split_once(',') else {
        bail!("Expected two comma-separated values, got '{}'", value);
    };
    let first = first
        .trim()
        .parse::<T>()
        .with_context(|| format!("Invalid value in '{}'", value))?;
    let second = second
        .trim()
        .parse::<T>()
        .with_context(|| format!("Invalid value in '{}'", value))?;
    Ok((first, second))
}

pub fn with_cluster_args(command: Command) -> Command {
    command
        .arg(arg!(--identity <C> "CD-HIT sequence identity threshold (-c)"))
        .arg(arg!(--"word-size" <N> "CD-HIT word length (-n)"))
        .arg(
            arg!(--"cdhit-dir" <DIR> "Directory containing cd-hit/cd-hit-est")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--fastasort <PATH> "Exonerate fastasort binary, to sort output FASTA files")
                .value_parser(value_parser!(PathBuf)),
        )
}

/// Config-file clustering settings with command line overrides applied.
pub fn cluster_params(matches: &ArgMatches, config: &ClusterParams) -> ClusterParams {
    let mut params = config.clone();
    if let Some(identity) = matches.get_one::<String>("identity") {
        params.set_arg("-c", identity);
    }
    if let Some(word_size) = matches.get_one::<String>("word-size") {
        params.set_arg("-n", word_size);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("cdhit-dir") {
        params.cdhit_dir = Some(dir.clone());
    }
    if let Some(fastasort) = matches.get_one::<PathBuf>("fastasort") {
        params.fastasort = Some(fastasort.clone());
    }
    params
}

pub fn with_genome_args(command: Command) -> Command {
    command
        .arg(
            arg!(--"gff-dir" <DIR> "Directory of <genome>.gff annotations")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"fna-dir" <DIR> "Directory of <genome>.fna contigs (defaults to --gff-dir)")
                .value_parser(value_parser!(PathBuf)),
        )
}

pub fn genome_files(matches: &ArgMatches) -> Result<Vec<GenomeFiles>> {
    let gff_dir = path_arg(matches, "gff-dir")?;
    let fna_dir = matches
        .get_one::<PathBuf>("fna-dir")
        .cloned()
        .unwrap_or_else(|| gff_dir.clone());
    let genomes = find_matching_genome_files(&gff_dir, &fna_dir)?;
    if genomes.is_empty() {
        bail!("No matching GFF/FNA pairs found in {:?} and {:?}", gff_dir, fna_dir);
    }
    log::info!("Found {} genomes", genomes.len());
    Ok(genomes)
}

pub fn output_arg() -> Arg {
    arg!(-o --output <DIR> "Output directory")
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

pub fn name_arg() -> Arg {
    arg!(-n --name <NAME> "Prefix for output files and feature names").default_value("Test")
}

pub fn is_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("File not found: {:?}", path);
    }
    Ok(())
}
