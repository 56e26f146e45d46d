use std::path::PathBuf;

use clap::{Arg, Command, arg, value_parser};

pub const VALIDATE_CMD: &str = "validate";
pub const VALIDATE_GENES_CMD: &str = "genes";
pub const VALIDATE_FASTA_CMD: &str = "fasta";
pub const VALIDATE_PROXIMAL_CMD: &str = "proximal";

fn table_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .help(help)
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

pub fn create_validate_cli() -> Command {
    Command::new(VALIDATE_CMD)
        .about("Check saved tables against each other or against the sequences they came from.")
        .subcommand_required(true)
        .subcommand(
            Command::new(VALIDATE_GENES_CMD)
                .about("Check that a gene table agrees with its allele table.")
                .arg(table_arg("genes", "Gene table prefix, e.g. out/Test_strain_by_gene"))
                .arg(table_arg("alleles", "Allele table prefix, e.g. out/Test_strain_by_allele")),
        )
        .subcommand(
            Command::new(VALIDATE_FASTA_CMD)
                .about("Re-derive each genome's features from its FASTA file and compare with the table.")
                .arg(table_arg("table", "Table prefix"))
                .arg(table_arg("features", "Non-redundant FASTA named after the table's rows"))
                .arg(
                    Arg::new("genomes")
                        .help("Per-genome FASTA files")
                        .num_args(1..)
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"allele-names" <FILE> "Allele names file; required for proximal tables")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new(VALIDATE_PROXIMAL_CMD)
                .about("Check that every proximal sequence claimed for a genome occurs in its contigs.")
                .arg(table_arg("table", "Proximal table prefix, e.g. out/Test_strain_by_upstream"))
                .arg(table_arg("features", "Non-redundant proximal FASTA"))
                .arg(
                    arg!(--"fna-dir" <DIR> "Directory of <genome>.fna contigs")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--side <SIDE> "upstream or downstream")
                        .required(true)
                        .value_parser(["upstream", "downstream"]),
                )
                .arg(
                    arg!(--limits <LIMITS> "Window used for extraction as X,Y")
                        .allow_hyphen_values(true),
                ),
        )
}
