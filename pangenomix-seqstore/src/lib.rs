//! # pangenomix-seqstore
//!
//! Content-addressed deduplication of FASTA records. Every distinct sequence
//! across a collection of per-genome FASTA files is written once to a
//! non-redundant file; headers that carried an already-seen sequence are kept
//! as synonyms of the first one.
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use pangenomix_seqstore::consolidate;
//!
//! let genomes = vec![PathBuf::from("g1.faa"), PathBuf::from("g2.faa")];
//! let result = consolidate(&genomes, Path::new("nr.faa"), Path::new("syn.tsv"), None).unwrap();
//! println!("{} distinct sequences", result.nonredundant.len());
//! ```
pub mod digest;
pub mod store;

pub use digest::SequenceHash;
pub use store::{
    ConsolidatedSequences, NonRedundantSet, SequenceStore, consolidate, load_synonyms,
    write_missing, write_synonyms,
};
