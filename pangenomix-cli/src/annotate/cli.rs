use std::path::PathBuf;

use clap::{ArgAction, Command, arg, value_parser};

pub const ANNOTATE_CMD: &str = "annotate";

pub fn create_annotate_cli() -> Command {
    Command::new(ANNOTATE_CMD)
        .about("Map GFF product annotations onto allele names, collapsed to genes by default.")
        .arg(
            arg!(--"gff-dir" <DIR> "Directory of <genome>.gff annotations")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"allele-names" <FILE> "Allele names file from a cds or noncoding run")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-o --output <FILE> "Annotation TSV to write")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--feature <TYPE> "GFF feature type to read; repeat for several (default: all)")
                .action(ArgAction::Append),
        )
        .arg(arg!(--"no-collapse" "Report every allele instead of collapsing to genes"))
        .arg(arg!(--"flexible-locus-tag" "Also match headers without the locus tag"))
        .arg(
            arg!(--batch <N> "GFF files loaded at once")
                .value_parser(value_parser!(usize))
                .default_value("100"),
        )
}
