use std::path::PathBuf;

use clap::{Arg, Command, arg, value_parser};

pub const DOMINANT_CMD: &str = "dominant";

pub fn create_dominant_cli() -> Command {
    Command::new(DOMINANT_CMD)
        .about("Export the most common allele of every gene.")
        .arg(
            Arg::new("alleles")
                .help("Allele table prefix, e.g. out/Test_strain_by_allele")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("fasta")
                .help("Allele FASTA, e.g. out/Test_nr.faa")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-o --output <FILE> "FASTA of dominant allele sequences")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--summary <FILE> "Also write gene/allele counts as TSV")
                .value_parser(value_parser!(PathBuf)),
        )
}
