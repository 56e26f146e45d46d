//! # pangenomix-core
//!
//! Shared building blocks for the pangenomix crates: the feature-name model
//! (`<name>_C12A3`), streaming FASTA and GFF readers, and small file helpers
//! for gzip-aware input and atomic output.
pub mod errors;
pub mod fasta;
pub mod gff;
pub mod models;
pub mod utils;
