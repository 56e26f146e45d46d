//! # pangenomix-cluster
//!
//! Turns a non-redundant FASTA into named alleles: runs CD-HIT/CD-HIT-EST,
//! parses its `.clstr` membership file, names every member
//! `<name>_<C|T><cluster#>A<allele#>` and rewrites the FASTA under the new
//! names.
pub mod cdhit;
pub mod clstr;
pub mod rename;
pub mod resolver;

pub use cdhit::{ClusterParams, ClusterProgram, cluster_file_for, cluster_with_cdhit};
pub use clstr::{Cluster, ClusterMember, read_cluster_file};
pub use rename::{RenameSummary, rename, sort_fasta};
pub use resolver::{
    AlleleAssignment, HeaderToFeatureMap, Resolution, load_allele_names, load_feature_to_allele,
    load_header_to_allele, read_allele_assignments, resolve, write_allele_names,
};
