//! # pangenomix-proximal
//!
//! Sequence extraction from annotated contigs: the regions flanking each
//! coding feature (upstream of the start codon, downstream of the stop
//! codon) and whole non-coding features such as tRNAs and rRNAs.
//!
//! Flanking sequences of all genomes are consolidated into per-gene
//! proximal variants named `<gene>U<n>` or `<gene>D<n>`.
pub mod consolidate;
pub mod extract;
pub mod neighbors;
pub mod noncoding;

pub use consolidate::consolidate_proximal;
pub use extract::{
    ProximalParams, ProximalSequence, derived_path, extract, extract_for_genomes, extract_window,
    load_contigs, proximal_footer, proximal_window,
};
pub use neighbors::StrandOccupancy;
pub use noncoding::{NoncodingParams, extract_noncoding, extract_noncoding_for_genomes, noncoding_path};
