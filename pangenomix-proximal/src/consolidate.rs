use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fxhash::FxHashMap;

use pangenomix_cluster::HeaderToFeatureMap;
use pangenomix_core::fasta::FastaRecordReader;
use pangenomix_core::models::{
    FeatureName, ProximalSide, breakdown_feature_name, genome_from_proximal_path,
    split_proximal_header,
};
use pangenomix_tables::{FeatureTable, FeatureTableBuilder};

///
/// Numbers distinct flanking sequences per gene in order of first
/// appearance, naming them `<gene>U<n>` or `<gene>D<n>`.
///
#[derive(Debug, Default)]
struct VariantRegistry {
    per_gene: FxHashMap<String, FxHashMap<String, usize>>,
}

impl VariantRegistry {
    /// Index of `sequence` within `gene`, and whether it is new.
    fn register(&mut self, gene: &str, sequence: String) -> (usize, bool) {
        let variants = self.per_gene.entry(gene.to_string()).or_default();
        let next = variants.len();
        match variants.get(&sequence) {
            Some(&index) => (index, false),
            None => {
                variants.insert(sequence, next);
                (next, true)
            }
        }
    }
}

///
/// Merge per-genome flanking sequence files into a non-redundant FASTA of
/// proximal variants and a variant x genome table.
///
/// Records are mapped back to alleles through `feature_to_allele` (keyed by
/// GFF feature ID); records that cannot be mapped are logged and skipped.
///
pub fn consolidate_proximal(
    genome_proximals: &[PathBuf],
    feature_to_allele: &HeaderToFeatureMap,
    side: ProximalSide,
    nr_out: &Path,
) -> Result<FeatureTable> {
    // variants are numbered in order of first appearance, scanning files by path
    let mut paths: Vec<&PathBuf> = genome_proximals.iter().collect();
    paths.sort();

    let mut sources: Vec<(String, &PathBuf)> = Vec::with_capacity(paths.len());
    let mut seen: BTreeMap<String, &PathBuf> = BTreeMap::new();
    for path in paths {
        let genome = genome_from_proximal_path(path, side)
            .with_context(|| format!("Can't determine genome name from {:?}", path))?;
        if let Some(other) = seen.insert(genome.clone(), path) {
            bail!("Genome name {} is shared by {:?} and {:?}", genome, other, path);
        }
        sources.push((genome, path));
    }

    let file = File::create(nr_out).with_context(|| format!("Failed to create {:?}", nr_out))?;
    let mut writer = BufWriter::new(file);

    let mut registry = VariantRegistry::default();
    let mut present: Vec<(String, String)> = Vec::new();
    let mut unmapped = 0usize;

    for (genome, path) in &sources {
        for record in FastaRecordReader::from_path(path)? {
            let record = record.with_context(|| format!("Failed to read {:?}", path))?;
            if record.is_empty() {
                continue;
            }
            let feature = split_proximal_header(&record.header)
                .map(|(feature, _)| feature)
                .unwrap_or(&record.header);
            let Some(allele) = feature_to_allele.get(feature) else {
                log::warn!("MISSING: {} ({})", feature, genome);
                unmapped += 1;
                continue;
            };

            let gene = breakdown_feature_name(allele)?.parent();
            let sequence = record.sequence();
            let (index, is_new) = registry.register(&gene.to_string(), sequence.clone());
            let variant = FeatureName::variant(
                gene.name(),
                gene.kind(),
                gene.cluster_index(),
                side.variant_kind(),
                index,
            )
            .to_string();

            if is_new {
                writeln!(writer, ">{}", variant)?;
                writeln!(writer, "{}", sequence)?;
            }
            present.push((variant, genome.clone()));
        }
    }
    writer.flush()?;

    if unmapped > 0 {
        log::warn!("{} {} sequences could not be mapped to an allele", unmapped, side);
    }

    let variants: Vec<String> = present
        .iter()
        .map(|(variant, _)| variant.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let genomes: Vec<String> = seen.into_keys().collect();
    log::info!(
        "Found {} distinct {} variants across {} genomes",
        variants.len(),
        side,
        genomes.len()
    );

    let mut builder = FeatureTableBuilder::new(variants, genomes);
    for (variant, genome) in &present {
        builder.set(variant, genome);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;

    #[rstest]
    fn test_consolidate_proximal() {
        let dir = tempfile::tempdir().unwrap();
        let g2 = dir.path().join("g2_upstream.fna");
        let g1 = dir.path().join("g1_upstream.fna");
        fs::write(
            &g1,
            ">p1_upstream(-5,3)\nAAAAATG\n>p2_upstream(-5,3)\nCCCCATG\n>p9_upstream(-5,3)\nGGGGATG\n",
        )
        .unwrap();
        fs::write(&g2, ">q1_upstream(-5,3)\nTTTTATG\n>q2_upstream(-5,3)\nCCCCATG\n").unwrap();

        let mut map = HeaderToFeatureMap::new();
        map.insert("p1", "T_C0A0");
        map.insert("q1", "T_C0A1");
        map.insert("p2", "T_C1A0");
        map.insert("q2", "T_C1A3");

        let nr = dir.path().join("T_nr_upstream.fna");
        let table = consolidate_proximal(&[g2, g1], &map, ProximalSide::Upstream, &nr).unwrap();

        assert_eq!(
            fs::read_to_string(&nr).unwrap(),
            ">T_C0U0\nAAAAATG\n>T_C1U0\nCCCCATG\n>T_C0U1\nTTTTATG\n"
        );
        assert_eq!(table.features(), &["T_C0U0".to_string(), "T_C0U1".to_string(), "T_C1U0".to_string()]);
        assert_eq!(table.genomes(), &["g1".to_string(), "g2".to_string()]);
        assert_eq!(table.features_in("g1"), vec!["T_C0U0", "T_C1U0"]);
        assert_eq!(table.features_in("g2"), vec!["T_C0U1", "T_C1U0"]);
    }

    #[rstest]
    fn test_consolidate_proximal_numbers_variants_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        // "g1.2_upstream.fna" sorts before "g1_upstream.fna"
        let g1 = dir.path().join("g1_upstream.fna");
        let g12 = dir.path().join("g1.2_upstream.fna");
        fs::write(&g1, ">p1_upstream(-5,3)\nAAAAATG\n").unwrap();
        fs::write(&g12, ">q1_upstream(-5,3)\nTTTTATG\n").unwrap();

        let mut map = HeaderToFeatureMap::new();
        map.insert("p1", "T_C0A0");
        map.insert("q1", "T_C0A1");

        let nr = dir.path().join("T_nr_upstream.fna");
        let table = consolidate_proximal(&[g1, g12], &map, ProximalSide::Upstream, &nr).unwrap();

        assert_eq!(
            fs::read_to_string(&nr).unwrap(),
            ">T_C0U0\nTTTTATG\n>T_C0U1\nAAAAATG\n"
        );
        assert_eq!(table.genomes(), &["g1".to_string(), "g1.2".to_string()]);
        assert_eq!(table.features_in("g1"), vec!["T_C0U1"]);
        assert_eq!(table.features_in("g1.2"), vec!["T_C0U0"]);
    }

    #[rstest]
    fn test_consolidate_proximal_rejects_shared_genome_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("g1_upstream.fna");
        let b = dir.path().join("g1_upstream_v2.fna");
        fs::write(&a, "").unwrap();
        fs::write(&b, "").unwrap();

        let nr = dir.path().join("T_nr_upstream.fna");
        let err = consolidate_proximal(
            &[a, b],
            &HeaderToFeatureMap::new(),
            ProximalSide::Upstream,
            &nr,
        )
        .unwrap_err();
        assert!(err.to_string().contains("g1"));
    }
}
