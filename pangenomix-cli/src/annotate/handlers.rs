use anyhow::Result;
use clap::ArgMatches;

use pangenomix::core::utils::list_files_with_extension;
use pangenomix::tables::{AnnotationParams, extract_annotations};

use crate::utils::{is_file, path_arg};

/// Annotation settings from the command line.
pub fn annotation_params(matches: &ArgMatches) -> AnnotationParams {
    let defaults = AnnotationParams::default();
    AnnotationParams {
        allowed_features: matches
            .get_many::<String>("feature")
            .map(|types| types.cloned().collect()),
        collapse_alleles: !matches.get_flag("no-collapse"),
        flexible_locus_tag: matches.get_flag("flexible-locus-tag"),
        batch: matches.get_one::<usize>("batch").copied().unwrap_or(defaults.batch),
    }
}

pub fn run_annotate(matches: &ArgMatches) -> Result<()> {
    let gff_dir = path_arg(matches, "gff-dir")?;
    let allele_names = path_arg(matches, "allele-names")?;
    is_file(&allele_names)?;
    let output = path_arg(matches, "output")?;

    let gffs = list_files_with_extension(&gff_dir, ".gff")?;
    log::info!("Reading annotations from {} GFF files in {:?}", gffs.len(), gff_dir);
    extract_annotations(&gffs, &allele_names, &output, &annotation_params(matches))?;
    Ok(())
}
