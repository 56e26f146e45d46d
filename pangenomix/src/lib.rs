//! # pangenomix
//!
//! Pan-genome construction for collections of annotated genomes. Protein
//! (or non-coding) sequences of every genome are merged into a
//! non-redundant set, clustered into genes with CD-HIT, named
//! `<name>_C#A#` / `<name>_T#A#` and tabulated as binary allele x genome
//! and gene x genome matrices. Flanking regions of coding sequences can be
//! added on top as per-gene upstream/downstream variants.
//!
//! The pipelines live in [`pipeline`]; the building blocks are re-exported
//! below.
pub mod pipeline;

#[doc(inline)]
pub use pangenomix_core as core;

#[doc(inline)]
pub use pangenomix_seqstore as seqstore;

#[doc(inline)]
pub use pangenomix_cluster as cluster;

#[doc(inline)]
pub use pangenomix_tables as tables;

#[doc(inline)]
pub use pangenomix_proximal as proximal;

pub use pipeline::{
    Pangenome, PangenomeOutputs, build_cds_pangenome, build_noncoding_pangenome,
    build_proximal_pangenome,
};
