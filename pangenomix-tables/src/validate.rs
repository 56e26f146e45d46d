//! Read-only consistency checks over built tables. Findings are logged and
//! returned; nothing here modifies a table.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fxhash::FxHashMap;

use pangenomix_cluster::HeaderToFeatureMap;
use pangenomix_core::fasta::{FastaRecordReader, read_fasta, reverse_complement};
use pangenomix_core::models::{
    ProximalSide, gene_of, genome_from_proximal_path, split_proximal_header, trim_variant,
};
use pangenomix_core::utils::{genome_from_derived_path, genome_name_from_path, genome_progress_bar};
use pangenomix_seqstore::SequenceHash;

use crate::table::FeatureTable;

const NONCODING_LABEL: &str = "noncoding";

/// Differences between what a table claims for a genome and what was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeDiscrepancy {
    pub genome: String,
    pub table_only: Vec<String>,
    pub genome_only: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GeneTableReport {
    pub genomes_checked: usize,
    pub discrepancies: Vec<GenomeDiscrepancy>,
}

impl GeneTableReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

///
/// Check that, in every genome, a gene is marked present exactly when at
/// least one of its alleles is. `table_only` lists genes present without
/// alleles, `genome_only` genes implied by alleles but absent.
///
pub fn validate_gene_table(genes: &FeatureTable, alleles: &FeatureTable) -> Result<GeneTableReport> {
    let mut report = GeneTableReport::default();

    let genomes: BTreeSet<&str> = genes
        .genomes()
        .iter()
        .chain(alleles.genomes())
        .map(|g| g.as_str())
        .collect();

    for genome in genomes {
        let from_genes: BTreeSet<String> =
            genes.features_in(genome).into_iter().map(String::from).collect();
        let from_alleles = alleles
            .features_in(genome)
            .into_iter()
            .map(gene_of)
            .collect::<std::result::Result<BTreeSet<String>, _>>()?;

        report.genomes_checked += 1;
        if from_genes != from_alleles {
            let discrepancy = GenomeDiscrepancy {
                genome: genome.to_string(),
                table_only: from_genes.difference(&from_alleles).cloned().collect(),
                genome_only: from_alleles.difference(&from_genes).cloned().collect(),
            };
            log::warn!(
                "{}: {} genes without alleles, {} alleles without genes",
                genome,
                discrepancy.table_only.len(),
                discrepancy.genome_only.len()
            );
            report.discrepancies.push(discrepancy);
        }
    }

    log::info!(
        "Checked {} genomes, {} inconsistent",
        report.genomes_checked,
        report.discrepancies.len()
    );
    Ok(report)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FastaTableReport {
    pub genomes_checked: usize,
    /// Genome files whose name matches no table column.
    pub unknown_genomes: Vec<String>,
    pub discrepancies: Vec<GenomeDiscrepancy>,
    /// Genome sequences that match no non-redundant feature.
    pub unmatched_sequences: usize,
}

impl FastaTableReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty() && self.unknown_genomes.is_empty()
    }
}

fn hash_key(sequence: &str, cluster: Option<&str>) -> SequenceHash {
    match cluster {
        Some(cluster) => SequenceHash::from_parts([sequence, cluster]),
        None => SequenceHash::of(sequence),
    }
}

fn table_column_for(table: &FeatureTable, path: &Path) -> Result<Option<String>> {
    let name = genome_name_from_path(path)?;
    if table.has_genome(&name) {
        return Ok(Some(name));
    }
    // derived files are `<genome>_<side|noncoding><footer>.fna`
    let mut derived = [ProximalSide::Upstream, ProximalSide::Downstream]
        .into_iter()
        .filter_map(|side| genome_from_proximal_path(path, side))
        .chain(genome_from_derived_path(path, NONCODING_LABEL));
    Ok(derived.find(|genome| table.has_genome(genome)))
}

///
/// Re-derive each genome's features from its sequence file and compare them
/// with the table.
///
/// Sequences are identified by content against `features_fasta`, the
/// non-redundant file whose headers are the table's row names. For proximal
/// tables pass `feature_to_allele`: identical flanks of different genes are
/// then told apart by the gene they flank.
///
pub fn validate_table_against_fasta(
    table: &FeatureTable,
    genome_fastas: &[PathBuf],
    features_fasta: &Path,
    feature_to_allele: Option<&HeaderToFeatureMap>,
) -> Result<FastaTableReport> {
    let proximal = feature_to_allele.is_some();

    let mut known: FxHashMap<SequenceHash, String> = FxHashMap::default();
    for record in read_fasta(features_fasta)? {
        let cluster = proximal.then(|| trim_variant(&record.header));
        known.insert(hash_key(&record.sequence(), cluster), record.header.clone());
    }

    let mut report = FastaTableReport::default();
    let bar = genome_progress_bar(genome_fastas.len(), "Validating genomes");
    for path in genome_fastas {
        bar.inc(1);
        let Some(genome) = table_column_for(table, path)? else {
            log::warn!("No table column for {:?}", path);
            report
                .unknown_genomes
                .push(genome_name_from_path(path)?);
            continue;
        };

        let mut found: BTreeSet<String> = BTreeSet::new();
        for record in FastaRecordReader::from_path(path)? {
            let record = record.with_context(|| format!("Failed to read {:?}", path))?;
            if record.is_empty() {
                continue;
            }
            let cluster = match feature_to_allele {
                Some(map) => {
                    let feature = split_proximal_header(&record.header)
                        .map(|(feature, _)| feature)
                        .unwrap_or(&record.header);
                    match map.get(feature) {
                        Some(allele) => Some(trim_variant(allele).to_string()),
                        None => {
                            report.unmatched_sequences += 1;
                            continue;
                        }
                    }
                }
                None => None,
            };
            match known.get(&hash_key(&record.sequence(), cluster.as_deref())) {
                Some(feature) => {
                    found.insert(feature.clone());
                }
                None => report.unmatched_sequences += 1,
            }
        }

        let claimed: BTreeSet<String> =
            table.features_in(&genome).into_iter().map(String::from).collect();
        report.genomes_checked += 1;
        if claimed != found {
            let discrepancy = GenomeDiscrepancy {
                genome: genome.clone(),
                table_only: claimed.difference(&found).cloned().collect(),
                genome_only: found.difference(&claimed).cloned().collect(),
            };
            log::warn!(
                "{}: {} features only in table, {} only in genome",
                genome,
                discrepancy.table_only.len(),
                discrepancy.genome_only.len()
            );
            report.discrepancies.push(discrepancy);
        }
    }
    bar.finish_and_clear();

    if report.unmatched_sequences > 0 {
        log::warn!(
            "{} genome sequences matched no known feature",
            report.unmatched_sequences
        );
    }
    log::info!(
        "Checked {} genomes, {} inconsistent",
        report.genomes_checked,
        report.discrepancies.len()
    );
    Ok(report)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProximalTableReport {
    pub genomes_checked: usize,
    /// (genome, feature) pairs whose sequence was not found in the genome.
    pub missing: Vec<(String, String)>,
    /// Features not checked because their length differs from the window.
    pub unchecked: usize,
    /// Start codons (upstream) or stop codons (downstream) of all
    /// non-redundant proximal sequences, when the window covers them.
    pub codon_counts: BTreeMap<String, usize>,
}

///
/// Codon at the boundary between the flank and the coding sequence, if the
/// limits cover a full codon.
///
pub fn boundary_codon(sequence: &str, limits: (i64, i64), side: ProximalSide) -> Option<&str> {
    let (l0, l1) = limits;
    let (start, stop) = match side {
        ProximalSide::Upstream if l1 >= 3 => {
            let start = sequence.len().checked_sub(l1 as usize)?;
            (start, start + 3)
        }
        ProximalSide::Downstream if l0 <= -3 => {
            let stop = (-l0) as usize;
            (stop - 3, stop)
        }
        _ => return None,
    };
    sequence.get(start..stop)
}

///
/// Confirm that every fixed-length proximal sequence claimed for a genome
/// occurs somewhere in that genome's contigs, on either strand. Does not
/// check where it occurs.
///
pub fn validate_proximal_table_direct(
    table: &FeatureTable,
    genome_contigs: &[PathBuf],
    nr_proximal: &Path,
    limits: (i64, i64),
    side: ProximalSide,
) -> Result<ProximalTableReport> {
    let window = (limits.1 - limits.0).max(0) as usize;
    let sequences: FxHashMap<String, String> = read_fasta(nr_proximal)?
        .into_iter()
        .map(|record| {
            let sequence = record.sequence();
            (record.header, sequence)
        })
        .collect();

    let mut report = ProximalTableReport::default();
    for sequence in sequences.values() {
        if let Some(codon) = boundary_codon(sequence, limits, side) {
            *report.codon_counts.entry(codon.to_string()).or_insert(0) += 1;
        }
    }

    let bar = genome_progress_bar(genome_contigs.len(), "Scanning contigs");
    for path in genome_contigs {
        bar.inc(1);
        let Some(genome) = table_column_for(table, path)? else {
            log::warn!("No table column for {:?}", path);
            continue;
        };

        let mut pending: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for feature in table.features_in(&genome) {
            match sequences.get(feature) {
                Some(sequence) if sequence.len() == window => {
                    pending.entry(sequence.as_str()).or_default().push(feature)
                }
                _ => report.unchecked += 1,
            }
        }

        for record in FastaRecordReader::from_path(path)? {
            if pending.is_empty() {
                break;
            }
            let record = record.with_context(|| format!("Failed to read {:?}", path))?;
            let contig = record.sequence();
            for strand in [contig.clone(), reverse_complement(&contig)] {
                if strand.len() < window {
                    continue;
                }
                for i in 0..=strand.len() - window {
                    if let Some(candidate) = strand.get(i..i + window) {
                        pending.remove(candidate);
                    }
                }
            }
        }

        for features in pending.values() {
            for feature in features {
                log::warn!("Missing {} from {}", feature, genome);
                report.missing.push((genome.clone(), feature.to_string()));
            }
        }
        report.genomes_checked += 1;
    }
    bar.finish_and_clear();

    report.missing.sort();
    if !report.codon_counts.is_empty() {
        log::info!("Boundary codon distribution: {:?}", report.codon_counts);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::FeatureTableBuilder;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn table(features: &[&str], genomes: &[&str], present: &[(&str, &str)]) -> FeatureTable {
        let mut builder = FeatureTableBuilder::new(labels(features), labels(genomes));
        for (feature, genome) in present {
            assert!(builder.set(feature, genome));
        }
        builder.build().unwrap()
    }

    #[rstest]
    fn test_consistent_gene_table() {
        let alleles = table(&["T_C0A0", "T_C0A1", "T_C1A0"], &["g1", "g2"], &[("T_C0A0", "g1"), ("T_C0A1", "g1"), ("T_C1A0", "g2")]);
        let genes = table(&["T_C0", "T_C1"], &["g1", "g2"], &[("T_C0", "g1"), ("T_C1", "g2")]);
        let report = validate_gene_table(&genes, &alleles).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.genomes_checked, 2);
    }

    #[rstest]
    fn test_inconsistent_gene_table() {
        let alleles = table(&["T_C0A0", "T_C1A0"], &["g1"], &[("T_C0A0", "g1")]);
        let genes = table(&["T_C0", "T_C1"], &["g1"], &[("T_C1", "g1")]);
        let report = validate_gene_table(&genes, &alleles).unwrap();
        assert_eq!(
            report.discrepancies,
            vec![GenomeDiscrepancy {
                genome: "g1".to_string(),
                table_only: vec!["T_C1".to_string()],
                genome_only: vec!["T_C0".to_string()],
            }]
        );
    }

    #[rstest]
    fn test_table_against_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let nr = dir.path().join("nr.faa");
        fs::write(&nr, ">T_C0A0\nMKV\n>T_C1A0\nMA\n").unwrap();
        let g1 = dir.path().join("g1.faa");
        let g2 = dir.path().join("g2.faa");
        fs::write(&g1, ">x\nMK\nV\n>y\nMA\n").unwrap();
        fs::write(&g2, ">z\nMA\n>w\nMWW\n").unwrap();

        let good = table(&["T_C0A0", "T_C1A0"], &["g1", "g2"], &[("T_C0A0", "g1"), ("T_C1A0", "g1"), ("T_C1A0", "g2")]);
        let report = validate_table_against_fasta(&good, &[g1.clone(), g2.clone()], &nr, None).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.unmatched_sequences, 1);

        let bad = table(&["T_C0A0", "T_C1A0"], &["g1", "g2"], &[("T_C0A0", "g1"), ("T_C0A0", "g2"), ("T_C1A0", "g2")]);
        let report = validate_table_against_fasta(&bad, &[g1, g2], &nr, None).unwrap();
        assert_eq!(report.discrepancies.len(), 2);
        assert_eq!(report.discrepancies[0].genome_only, vec!["T_C1A0"]);
        assert_eq!(report.discrepancies[1].table_only, vec!["T_C0A0"]);
    }

    #[rstest]
    fn test_proximal_table_against_fasta_separates_genes() {
        let dir = tempfile::tempdir().unwrap();
        let nr = dir.path().join("nr_upstream.fna");
        fs::write(&nr, ">T_C0U0\nACGTACGT\n>T_C1U0\nACGTACGT\n").unwrap();
        let g1 = dir.path().join("g1_upstream.fna");
        fs::write(&g1, ">fig|1.peg.1_upstream(-5,3)\nACGTACGT\n").unwrap();

        let mut map = HeaderToFeatureMap::new();
        map.insert("fig|1.peg.1", "T_C1A4");

        let prox = table(&["T_C0U0", "T_C1U0"], &["g1"], &[("T_C1U0", "g1")]);
        let report = validate_table_against_fasta(&prox, &[g1], &nr, Some(&map)).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.unmatched_sequences, 0);
    }

    #[rstest]
    #[case("g1_upstream_v2.fna")]
    #[case("g1_downstream.fna")]
    #[case("g1_noncoding_trna.fna")]
    #[case("g1.fna")]
    fn test_derived_files_map_to_their_genome(#[case] file_name: &str) {
        let columns = table(&["T_C0A0"], &["g1", "g2"], &[]);
        let path = Path::new("derived").join(file_name);
        assert_eq!(table_column_for(&columns, &path).unwrap().as_deref(), Some("g1"));
    }

    #[rstest]
    fn test_proximal_table_against_fasta_with_custom_footer() {
        let dir = tempfile::tempdir().unwrap();
        let nr = dir.path().join("nr_upstream.fna");
        fs::write(&nr, ">T_C0U0\nACGTACGT\n").unwrap();
        let g1 = dir.path().join("g1_upstream_v2.fna");
        fs::write(&g1, ">fig|1.peg.1_upstream(-5,3)\nACGTACGT\n").unwrap();

        let mut map = HeaderToFeatureMap::new();
        map.insert("fig|1.peg.1", "T_C0A0");

        let prox = table(&["T_C0U0"], &["g1"], &[("T_C0U0", "g1")]);
        let report = validate_table_against_fasta(&prox, &[g1], &nr, Some(&map)).unwrap();
        assert!(report.unknown_genomes.is_empty());
        assert_eq!(report.genomes_checked, 1);
        assert!(report.is_consistent());
    }

    #[rstest]
    #[case("AAAAAATGC", (-6, 3), ProximalSide::Upstream, Some("ATG"))]
    #[case("AAAAAATGCCC", (-6, 5), ProximalSide::Upstream, Some("ATG"))]
    #[case("TAACCCCC", (-3, 5), ProximalSide::Downstream, Some("TAA"))]
    #[case("GGTGACCC", (-5, 3), ProximalSide::Downstream, Some("TGA"))]
    #[case("AAAA", (-4, 0), ProximalSide::Upstream, None)]
    fn test_boundary_codon(
        #[case] sequence: &str,
        #[case] limits: (i64, i64),
        #[case] side: ProximalSide,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(boundary_codon(sequence, limits, side), expected);
    }

    #[rstest]
    fn test_proximal_table_direct() {
        let dir = tempfile::tempdir().unwrap();
        let nr = dir.path().join("nr_upstream.fna");
        // second sequence only occurs as a reverse complement, third nowhere
        fs::write(&nr, ">T_C0U0\nCCATG\n>T_C1U0\nGGCAT\n>T_C2U0\nTTTTT\n>T_C3U0\nCATG\n").unwrap();
        let g1 = dir.path().join("g1.fna");
        fs::write(&g1, ">ctg1\nAACCATGAA\n>ctg2\nATGCCAA\n").unwrap();

        let prox = table(
            &["T_C0U0", "T_C1U0", "T_C2U0", "T_C3U0"],
            &["g1"],
            &[("T_C0U0", "g1"), ("T_C1U0", "g1"), ("T_C2U0", "g1"), ("T_C3U0", "g1")],
        );
        let report =
            validate_proximal_table_direct(&prox, &[g1], &nr, (-2, 3), ProximalSide::Upstream).unwrap();

        assert_eq!(report.genomes_checked, 1);
        assert_eq!(report.missing, vec![("g1".to_string(), "T_C2U0".to_string())]);
        assert_eq!(report.unchecked, 1);
        assert_eq!(report.codon_counts.get("ATG"), Some(&2));
    }
}
