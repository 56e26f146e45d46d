mod annotate;
mod cds;
mod config;
mod dominant;
mod noncoding;
mod proximal;
mod utils;
mod validate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Command, arg, value_parser};

use config::PipelineConfig;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "pangenomix";
    pub const BIN_NAME: &str = "pangenomix";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Build binary allele, gene and flanking-region x genome tables for bacterial pan-genomes.")
        .subcommand_required(true)
        .arg(
            arg!(-v --verbose "Increase logging verbosity")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            arg!(--config <FILE> "TOML file with [cluster], [proximal] and [noncoding] settings")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(cds::cli::create_cds_cli())
        .subcommand(noncoding::cli::create_noncoding_cli())
        .subcommand(proximal::cli::create_proximal_cli())
        .subcommand(validate::cli::create_validate_cli())
        .subcommand(dominant::cli::create_dominant_cli())
        .subcommand(annotate::cli::create_annotate_cli())
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    init_logging(matches.get_count("verbose"));
    log::debug!("{} v{}", consts::PKG_NAME, consts::VERSION);
    let config = PipelineConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    match matches.subcommand() {
        //
        // CDS PAN-GENOME
        //
        Some((cds::cli::CDS_CMD, matches)) => {
            cds::handlers::run_cds(matches, &config)?;
        }

        //
        // NON-CODING PAN-GENOME
        //
        Some((noncoding::cli::NONCODING_CMD, matches)) => {
            noncoding::handlers::run_noncoding(matches, &config)?;
        }

        //
        // UPSTREAM / DOWNSTREAM VARIANTS
        //
        Some((proximal::cli::PROXIMAL_CMD, matches)) => {
            proximal::handlers::run_proximal(matches, &config)?;
        }

        //
        // VALIDATION
        //
        Some((validate::cli::VALIDATE_CMD, matches)) => match matches.subcommand() {
            Some((validate::cli::VALIDATE_GENES_CMD, matches)) => {
                validate::handlers::run_validate_genes(matches)?;
            }
            Some((validate::cli::VALIDATE_FASTA_CMD, matches)) => {
                validate::handlers::run_validate_fasta(matches)?;
            }
            Some((validate::cli::VALIDATE_PROXIMAL_CMD, matches)) => {
                validate::handlers::run_validate_proximal(matches)?;
            }
            _ => unreachable!("Validate subcommand not found"),
        },

        //
        // DOMINANT ALLELES
        //
        Some((dominant::cli::DOMINANT_CMD, matches)) => {
            dominant::handlers::run_dominant(matches)?;
        }

        //
        // ANNOTATIONS
        //
        Some((annotate::cli::ANNOTATE_CMD, matches)) => {
            annotate::handlers::run_annotate(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
