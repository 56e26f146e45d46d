use std::path::PathBuf;

use clap::{Command, arg, value_parser};

use crate::utils::{name_arg, output_arg, with_genome_args};

pub const PROXIMAL_CMD: &str = "proximal";

pub fn create_proximal_cli() -> Command {
    let command = Command::new(PROXIMAL_CMD)
        .about("Classify the regions flanking each coding sequence into per-gene upstream or downstream variants.")
        .arg(
            arg!(--"allele-names" <FILE> "<name>_allele_names.tsv from a previous cds run")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--side <SIDE> "upstream or downstream")
                .required(true)
                .value_parser(["upstream", "downstream"]),
        )
        .arg(output_arg())
        .arg(name_arg())
        .arg(
            arg!(--limits <LIMITS> "Window relative to the start/stop codon as X,Y, e.g. -50,3")
                .allow_hyphen_values(true),
        )
        .arg(
            arg!(--"max-overlap" <N> "Truncate flanks reaching more than N bases into neighbouring genes")
                .value_parser(value_parser!(usize)),
        )
        .arg(arg!(--"include-fragments" "Keep flanks cut short by contig ends"))
        .arg(arg!(--footer <TEXT> "Inserted into per-genome file names: <genome>_<side><footer>.fna"))
        .arg(arg!(--overwrite "Re-extract even if per-genome files exist"))
        .arg(
            arg!(--fastasort <PATH> "Exonerate fastasort binary, to sort the output FASTA")
                .value_parser(value_parser!(PathBuf)),
        );
    with_genome_args(command)
}
