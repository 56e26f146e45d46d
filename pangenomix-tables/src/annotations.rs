//! GFF `product` annotations carried over to allele and gene names.
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fxhash::{FxHashMap, FxHashSet};

use pangenomix_cluster::read_allele_assignments;
use pangenomix_core::gff::{read_gff, unescape_attribute};
use pangenomix_core::models::{breakdown_feature_name, gene_of};
use pangenomix_core::utils::{genome_progress_bar, get_dynamic_reader, write_atomically};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationParams {
    /// GFF feature types to read products from; `None` reads every type.
    pub allowed_features: Option<Vec<String>>,
    /// Report one line per gene with its most common allele annotation.
    pub collapse_alleles: bool,
    /// Record products under both `ID` and `ID|locus_tag` when a locus tag
    /// is present, instead of only the latter.
    pub flexible_locus_tag: bool,
    /// GFF files loaded at once.
    pub batch: usize,
}

impl Default for AnnotationParams {
    fn default() -> Self {
        AnnotationParams {
            allowed_features: None,
            collapse_alleles: true,
            flexible_locus_tag: false,
            batch: 100,
        }
    }
}

/// A feature name and its distinct annotations, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureAnnotation {
    pub feature: String,
    pub annotations: Vec<String>,
}

fn load_products(
    gff: &Path,
    params: &AnnotationParams,
    products: &mut FxHashMap<String, String>,
) -> Result<()> {
    for record in read_gff(gff)? {
        if let Some(allowed) = &params.allowed_features {
            if !allowed.contains(&record.feature_type) {
                continue;
            }
        }
        let (Some(id), Some(product)) = (record.id(), record.attribute("product")) else {
            continue;
        };
        let product = unescape_attribute(product);
        match record.attribute("locus_tag") {
            Some(locus_tag) => {
                if params.flexible_locus_tag {
                    products.insert(id.to_string(), product.clone());
                }
                products.insert(format!("{}|{}", id, locus_tag), product);
            }
            None => {
                products.insert(id.to_string(), product);
            }
        }
    }
    Ok(())
}

fn apply_products(rows: &mut [FeatureAnnotation], products: &FxHashMap<String, String>) {
    for row in rows {
        let mut seen = FxHashSet::default();
        row.annotations = std::mem::take(&mut row.annotations)
            .into_iter()
            .map(|header| products.get(&header).cloned().unwrap_or(header))
            .filter(|annotation| seen.insert(annotation.clone()))
            .collect();
    }
}

///
/// Replace every header of an allele-names file with the `product` of the
/// matching GFF feature. Headers without a product are kept as they are.
///
pub fn annotate_alleles(
    genome_gffs: &[PathBuf],
    allele_names: &Path,
    params: &AnnotationParams,
) -> Result<Vec<FeatureAnnotation>> {
    let mut rows: Vec<FeatureAnnotation> = read_allele_assignments(allele_names)?
        .into_iter()
        .map(|assignment| FeatureAnnotation {
            feature: assignment.allele,
            annotations: assignment.headers,
        })
        .collect();

    let bar = genome_progress_bar(genome_gffs.len(), "Loading annotations");
    for (i, batch) in genome_gffs.chunks(params.batch.max(1)).enumerate() {
        let mut products = FxHashMap::default();
        for gff in batch {
            load_products(gff, params, &mut products)?;
            bar.inc(1);
        }
        log::debug!("Loaded {} annotations from batch {}", products.len(), i + 1);
        apply_products(&mut rows, &products);
    }
    bar.finish_and_clear();

    Ok(rows)
}

///
/// Collapse allele annotations to one line per gene carrying the most
/// common annotation set, followed by the alleles that disagree with it.
/// Ties go to the allele listed first.
///
pub fn collapse_to_genes(alleles: Vec<FeatureAnnotation>) -> Result<Vec<FeatureAnnotation>> {
    let mut genes: Vec<(String, Vec<FeatureAnnotation>)> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    for allele in alleles {
        let gene = gene_of(&allele.feature)?;
        let position = *index.entry(gene.clone()).or_insert_with(|| {
            genes.push((gene, Vec::new()));
            genes.len() - 1
        });
        genes[position].1.push(allele);
    }

    let mut collapsed = Vec::new();
    for (gene, members) in genes {
        let mut counts: Vec<(&Vec<String>, usize)> = Vec::new();
        for member in &members {
            match counts.iter_mut().find(|(a, _)| **a == member.annotations) {
                Some((_, count)) => *count += 1,
                None => counts.push((&member.annotations, 1)),
            }
        }
        let mut consensus = &members[0].annotations;
        let mut best = 0;
        for (annotations, count) in counts {
            if count > best {
                consensus = annotations;
                best = count;
            }
        }

        collapsed.push(FeatureAnnotation {
            feature: gene,
            annotations: consensus.clone(),
        });
        for member in &members {
            if member.annotations != *consensus {
                collapsed.push(member.clone());
            }
        }
    }
    Ok(collapsed)
}

///
/// Write `feature\tannotation...` lines.
///
pub fn write_annotations(annotations: &[FeatureAnnotation], path: &Path) -> Result<()> {
    write_atomically(path, |writer| {
        for row in annotations {
            writeln!(writer, "{}\t{}", row.feature, row.annotations.join("\t"))?;
        }
        Ok(())
    })
}

///
/// Annotate the alleles of an allele-names file from the genomes' GFF files
/// and write them to `annotations_out`, collapsed to genes unless
/// `params.collapse_alleles` is off.
///
pub fn extract_annotations(
    genome_gffs: &[PathBuf],
    allele_names: &Path,
    annotations_out: &Path,
    params: &AnnotationParams,
) -> Result<Vec<FeatureAnnotation>> {
    let alleles = annotate_alleles(genome_gffs, allele_names, params)?;
    let annotations = if params.collapse_alleles {
        collapse_to_genes(alleles)?
    } else {
        alleles
    };
    write_annotations(&annotations, annotations_out)?;
    log::info!(
        "Wrote {} annotations to {:?}",
        annotations.len(),
        annotations_out
    );
    Ok(annotations)
}

///
/// Look up annotations for table features in files written by
/// [`extract_annotations`]. A variant without its own line falls back to
/// its gene's annotation; multiple annotations are joined with `;`.
///
pub fn annotate_features(
    features: &[String],
    annotation_files: &[PathBuf],
) -> Result<Vec<Option<String>>> {
    let mut wanted: FxHashSet<String> = features.iter().cloned().collect();
    for feature in features {
        wanted.insert(gene_of(feature)?);
    }

    let mut known: FxHashMap<String, String> = FxHashMap::default();
    for path in annotation_files {
        let reader = get_dynamic_reader(path)?;
        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read {:?}", path))?;
            let mut fields = line.split('\t');
            let Some(feature) = fields.next() else {
                continue;
            };
            if wanted.contains(feature) {
                known.insert(feature.to_string(), fields.collect::<Vec<_>>().join(";"));
            }
        }
    }

    features
        .iter()
        .map(|feature| -> Result<Option<String>> {
            if let Some(annotation) = known.get(feature) {
                return Ok(Some(annotation.clone()));
            }
            let name = breakdown_feature_name(feature)?;
            if name.variant_kind().is_none() {
                return Ok(None);
            }
            Ok(known.get(&name.parent().to_string()).cloned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;
    use tempfile::TempDir;

    fn row(feature: &str, annotations: &[&str]) -> FeatureAnnotation {
        FeatureAnnotation {
            feature: feature.to_string(),
            annotations: annotations.iter().map(|a| a.to_string()).collect(),
        }
    }

    struct AnnotationRun {
        dir: TempDir,
        gffs: Vec<PathBuf>,
        allele_names: PathBuf,
    }

    #[fixture]
    fn run() -> AnnotationRun {
        let dir = tempfile::tempdir().unwrap();
        let g1 = dir.path().join("g1.gff");
        let g2 = dir.path().join("g2.gff");
        fs::write(
            &g1,
            "##gff-version 3\n\
             accn|c1\tPATRIC\tCDS\t1\t9\t.\t+\t0\tID=fig|1.1.peg.1;locus_tag=L1;product=DNA gyrase%2C subunit A\n\
             accn|c1\tPATRIC\tCDS\t20\t29\t.\t+\t0\tID=fig|1.1.peg.2;product=hypothetical protein\n\
             accn|c1\tPATRIC\ttRNA\t40\t49\t.\t+\t0\tID=fig|1.1.rna.1;product=tRNA-Ala\n",
        )
        .unwrap();
        fs::write(
            &g2,
            "accn|c1\tPATRIC\tCDS\t1\t9\t.\t+\t0\tID=fig|2.1.peg.1;locus_tag=L9;product=DNA gyrase%2C subunit A\n\
             accn|c1\tPATRIC\tCDS\t20\t29\t.\t+\t0\tID=fig|2.1.peg.2;product=DNA gyrase\n\
             accn|c1\tPATRIC\tCDS\t40\t49\t.\t+\t0\tID=fig|2.1.peg.3;product=hypothetical protein\n",
        )
        .unwrap();
        let allele_names = dir.path().join("T_allele_names.tsv");
        fs::write(
            &allele_names,
            "T_C0A0\tfig|1.1.peg.1|L1\tfig|2.1.peg.1|L9\n\
             T_C0A1\tfig|2.1.peg.2\n\
             T_C1A0\tfig|1.1.peg.2\n\
             T_C1A1\tfig|2.1.peg.3\n\
             T_C2A0\tfig|9.9.peg.1\n",
        )
        .unwrap();
        AnnotationRun {
            gffs: vec![g1, g2],
            allele_names,
            dir,
        }
    }

    #[rstest]
    fn test_annotate_alleles(run: AnnotationRun) {
        let params = AnnotationParams {
            batch: 1,
            ..AnnotationParams::default()
        };
        let alleles = annotate_alleles(&run.gffs, &run.allele_names, &params).unwrap();
        assert_eq!(
            alleles,
            vec![
                row("T_C0A0", &["DNA gyrase, subunit A"]),
                row("T_C0A1", &["DNA gyrase"]),
                row("T_C1A0", &["hypothetical protein"]),
                row("T_C1A1", &["hypothetical protein"]),
                row("T_C2A0", &["fig|9.9.peg.1"]),
            ]
        );
    }

    #[rstest]
    fn test_locus_tag_naming(run: AnnotationRun) {
        let names = run.dir.path().join("two_term.tsv");
        fs::write(&names, "T_C0A0\tfig|1.1.peg.1\n").unwrap();

        let strict = annotate_alleles(&run.gffs, &names, &AnnotationParams::default()).unwrap();
        assert_eq!(strict, vec![row("T_C0A0", &["fig|1.1.peg.1"])]);

        let flexible = AnnotationParams {
            flexible_locus_tag: true,
            ..AnnotationParams::default()
        };
        let flexible = annotate_alleles(&run.gffs, &names, &flexible).unwrap();
        assert_eq!(flexible, vec![row("T_C0A0", &["DNA gyrase, subunit A"])]);
    }

    #[rstest]
    fn test_allowed_features(run: AnnotationRun) {
        let names = run.dir.path().join("rna.tsv");
        fs::write(&names, "T_T0A0\tfig|1.1.rna.1\n").unwrap();
        let params = AnnotationParams {
            allowed_features: Some(vec!["CDS".to_string()]),
            ..AnnotationParams::default()
        };
        let alleles = annotate_alleles(&run.gffs, &names, &params).unwrap();
        assert_eq!(alleles, vec![row("T_T0A0", &["fig|1.1.rna.1"])]);
    }

    #[rstest]
    fn test_collapse_to_genes() {
        let alleles = vec![
            row("T_C0A0", &["gyrase"]),
            row("T_C0A1", &["gyrase B"]),
            row("T_C0A2", &["gyrase B"]),
            row("T_C1A0", &["kinase"]),
        ];
        assert_eq!(
            collapse_to_genes(alleles).unwrap(),
            vec![
                row("T_C0", &["gyrase B"]),
                row("T_C0A0", &["gyrase"]),
                row("T_C1", &["kinase"]),
            ]
        );
    }

    #[rstest]
    fn test_collapse_tie_goes_to_first_allele() {
        let alleles = vec![
            row("T_C3A0", &["porin", "outer membrane protein"]),
            row("T_C3A1", &["hypothetical protein"]),
        ];
        assert_eq!(
            collapse_to_genes(alleles).unwrap(),
            vec![
                row("T_C3", &["porin", "outer membrane protein"]),
                row("T_C3A1", &["hypothetical protein"]),
            ]
        );
    }

    #[rstest]
    fn test_extract_annotations(run: AnnotationRun) {
        let out = run.dir.path().join("T_annotations.tsv");
        extract_annotations(&run.gffs, &run.allele_names, &out, &AnnotationParams::default())
            .unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "T_C0\tDNA gyrase, subunit A\n\
             T_C0A1\tDNA gyrase\n\
             T_C1\thypothetical protein\n\
             T_C2\tfig|9.9.peg.1\n"
        );

        let uncollapsed = run.dir.path().join("T_allele_annotations.tsv");
        let params = AnnotationParams {
            collapse_alleles: false,
            ..AnnotationParams::default()
        };
        extract_annotations(&run.gffs, &run.allele_names, &uncollapsed, &params).unwrap();
        assert_eq!(
            fs::read_to_string(&uncollapsed).unwrap().lines().next(),
            Some("T_C0A0\tDNA gyrase, subunit A")
        );
    }

    #[rstest]
    fn test_annotate_features(run: AnnotationRun) {
        let path = run.dir.path().join("T_annotations.tsv");
        fs::write(&path, "T_C0\tgyrase\nT_C0A1\tgyrase B\tpartial\nT_C1\tkinase\n").unwrap();
        let features: Vec<String> = ["T_C0A1", "T_C0U3", "T_C1", "T_C5", "T_C5A0"]
            .iter()
            .map(|f| f.to_string())
            .collect();

        let annotations = annotate_features(&features, &[path]).unwrap();
        assert_eq!(
            annotations,
            vec![
                Some("gyrase B;partial".to_string()),
                Some("gyrase".to_string()),
                Some("kinase".to_string()),
                None,
                None,
            ]
        );
    }
}
