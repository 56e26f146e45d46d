use clap::{Command, arg};

use crate::utils::{name_arg, output_arg, with_cluster_args, with_genome_args};

pub const NONCODING_CMD: &str = "noncoding";

pub fn create_noncoding_cli() -> Command {
    let command = Command::new(NONCODING_CMD)
        .about("Build tables of non-coding features (tRNA, rRNA, ...) extracted from GFF/FNA pairs.")
        .arg(output_arg())
        .arg(name_arg())
        .arg(arg!(--flanking <FLANKING> "Bases to add at the 5' and 3' ends of each feature, as X,Y"))
        .arg(
            arg!(--feature <TYPE> "GFF feature type to extract; repeat for several")
                .action(clap::ArgAction::Append),
        )
        .arg(arg!(--footer <TEXT> "Inserted into per-genome file names: <genome>_noncoding<footer>.fna"))
        .arg(arg!(--overwrite "Re-extract even if per-genome files exist"));
    with_cluster_args(with_genome_args(command))
}
