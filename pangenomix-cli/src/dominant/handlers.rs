use std::path::PathBuf;

use anyhow::Result;
use clap::ArgMatches;

use pangenomix::tables::{extract_dominant_alleles, read_table_from_mtx, write_dominant_alleles};

use crate::utils::{is_file, path_arg};

pub fn run_dominant(matches: &ArgMatches) -> Result<()> {
    let alleles = read_table_from_mtx(&path_arg(matches, "alleles")?)?;
    let fasta = path_arg(matches, "fasta")?;
    is_file(&fasta)?;
    let output = path_arg(matches, "output")?;

    let dominant = extract_dominant_alleles(&alleles, &fasta, &output)?;
    if let Some(summary) = matches.get_one::<PathBuf>("summary") {
        write_dominant_alleles(&dominant, summary)?;
    }
    Ok(())
}
