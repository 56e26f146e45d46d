//! # pangenomix-tables
//!
//! Binary feature x genome presence tables backed by `sprs` sparse
//! matrices: building allele and gene tables from per-genome sequence
//! files, persisting them as Matrix Market triplets, and checking them
//! against the sequences they were built from. GFF product annotations
//! can be carried over to the same allele and gene names.
pub mod annotations;
pub mod builder;
pub mod dominant;
pub mod matrix_market;
pub mod table;
pub mod validate;

pub use annotations::{
    AnnotationParams, FeatureAnnotation, annotate_alleles, annotate_features, collapse_to_genes,
    extract_annotations, write_annotations,
};
pub use builder::{GenomeSource, build_feature_tables, build_feature_tables_from_sources, genes_from_alleles};
pub use dominant::{DominantAllele, extract_dominant_alleles, find_dominant_alleles, write_dominant_alleles};
pub use matrix_market::{TablePaths, read_table_from_mtx, write_table_to_mtx};
pub use table::{FeatureTable, FeatureTableBuilder};
pub use validate::{
    FastaTableReport, GeneTableReport, GenomeDiscrepancy, ProximalTableReport, boundary_codon,
    validate_gene_table, validate_proximal_table_direct, validate_table_against_fasta,
};
