use std::path::PathBuf;

use clap::{Arg, Command, arg, value_parser};

use crate::utils::{name_arg, output_arg, with_cluster_args};

pub const CDS_CMD: &str = "cds";

pub fn create_cds_cli() -> Command {
    let command = Command::new(CDS_CMD)
        .about("Build allele x genome and gene x genome tables from per-genome protein FASTA files.")
        .arg(
            Arg::new("faa")
                .help("Protein FASTA files, one per genome")
                .num_args(0..)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"faa-dir" <DIR> "Use every .faa file in this directory")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(output_arg())
        .arg(name_arg());
    with_cluster_args(command)
}
