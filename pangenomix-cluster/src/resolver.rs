use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use fxhash::FxHashMap;

use pangenomix_core::models::{ClusterKind, VariantKind, create_feature_name};
use pangenomix_core::utils::get_dynamic_reader;
use pangenomix_seqstore::load_synonyms;

use crate::clstr::read_cluster_file;

///
/// Maps original sequence headers (representatives and synonyms alike) to
/// the feature they were assigned to.
///
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderToFeatureMap {
    map: FxHashMap<String, String>,
}

impl HeaderToFeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, header: &str, feature: &str) {
        self.map.insert(header.to_string(), feature.to_string());
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.map.get(header).map(|f| f.as_str())
    }

    pub fn contains(&self, header: &str) -> bool {
        self.map.contains_key(header)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(h, f)| (h.as_str(), f.as_str()))
    }

    /// Distinct feature names, sorted.
    pub fn features(&self) -> Vec<String> {
        self.map
            .values()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn extend(&mut self, other: HeaderToFeatureMap) {
        self.map.extend(other.map);
    }
}

/// All headers named after one allele; the representative comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleAssignment {
    pub allele: String,
    pub headers: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct Resolution {
    pub header_to_allele: HeaderToFeatureMap,
    pub assignments: Vec<AlleleAssignment>,
}

///
/// Name every clustered sequence `<name>_<C|T><cluster#>A<allele#>`.
///
/// # Arguments
///
/// - cluster_file: CD-HIT `.clstr` file
/// - synonym_file: optional synonym groups from consolidation; synonyms get
///   their representative's name
/// - name: naming prefix
/// - kind: whether the clusters hold coding or non-coding sequences
///
pub fn resolve(
    cluster_file: &Path,
    synonym_file: Option<&Path>,
    name: &str,
    kind: ClusterKind,
) -> Result<Resolution> {
    let synonyms = match synonym_file {
        Some(path) => load_synonyms(path)?,
        None => FxHashMap::default(),
    };

    let mut resolution = Resolution::default();
    for cluster in read_cluster_file(cluster_file)? {
        for member in cluster.members {
            let allele = create_feature_name(
                name,
                kind,
                cluster.index,
                Some((VariantKind::Allele, member.allele)),
            );

            let mut headers = vec![member.header];
            if let Some(extra) = synonyms.get(&headers[0]) {
                headers.extend(extra.iter().cloned());
            }
            for header in &headers {
                resolution.header_to_allele.insert(header, &allele);
            }
            resolution
                .assignments
                .push(AlleleAssignment { allele, headers });
        }
    }

    log::info!(
        "Named {} alleles covering {} headers",
        resolution.assignments.len(),
        resolution.header_to_allele.len()
    );

    Ok(resolution)
}

///
/// Write `allele\trepresentative\tsynonym...` lines, one per allele.
///
pub fn write_allele_names(assignments: &[AlleleAssignment], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for assignment in assignments {
        writeln!(writer, "{}\t{}", assignment.allele, assignment.headers.join("\t"))?;
    }
    writer.flush()?;
    Ok(())
}

///
/// Read an allele-names file back into a header -> allele map.
///
pub fn load_allele_names(path: &Path) -> Result<HeaderToFeatureMap> {
    load_allele_names_with(path, |header| header.to_string())
}

///
/// Like [`load_allele_names`], but keys are trimmed to the first two
/// `|`-separated fields so PATRIC headers (`fig|562.1.peg.5|locus`) match
/// the bare `fig|562.1.peg.5` IDs used in GFF files.
///
pub fn load_feature_to_allele(path: &Path) -> Result<HeaderToFeatureMap> {
    load_allele_names_with(path, |header| {
        header.split('|').take(2).collect::<Vec<_>>().join("|")
    })
}

///
/// Read an allele-names file line by line, keeping both the allele order
/// and the header order within each allele.
///
pub fn read_allele_assignments(path: &Path) -> Result<Vec<AlleleAssignment>> {
    let reader = get_dynamic_reader(path)?;
    let mut assignments = Vec::new();
    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        let mut fields = line.split('\t').map(str::trim).filter(|f| !f.is_empty());
        if let Some(allele) = fields.next() {
            assignments.push(AlleleAssignment {
                allele: allele.to_string(),
                headers: fields.map(String::from).collect(),
            });
        }
    }
    Ok(assignments)
}

fn load_allele_names_with<F>(path: &Path, key: F) -> Result<HeaderToFeatureMap>
where
    F: Fn(&str) -> String,
{
    let mut map = HeaderToFeatureMap::new();
    for assignment in read_allele_assignments(path)? {
        for header in &assignment.headers {
            map.insert(&key(header), &assignment.allele);
        }
    }
    Ok(map)
}

///
/// Assemble a header -> allele map from whatever is at hand: a fresh cluster
/// file, a previously loaded map, and/or a synonym file to extend either.
///
pub fn load_header_to_allele(
    cluster_file: Option<&Path>,
    synonym_file: Option<&Path>,
    existing: Option<HeaderToFeatureMap>,
    name: &str,
    kind: ClusterKind,
) -> Result<HeaderToFeatureMap> {
    let mut map = existing.unwrap_or_default();

    match cluster_file {
        Some(path) => map.extend(resolve(path, synonym_file, name, kind)?.header_to_allele),
        None => {
            if let Some(path) = synonym_file {
                for (representative, synonyms) in load_synonyms(path)? {
                    if let Some(allele) = map.get(&representative).map(String::from) {
                        for synonym in synonyms {
                            map.insert(&synonym, &allele);
                        }
                    }
                }
            }
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct ClusterRun {
        dir: TempDir,
        clstr: PathBuf,
        synonyms: PathBuf,
    }

    #[fixture]
    fn run() -> ClusterRun {
        let dir = tempfile::tempdir().unwrap();
        let clstr = dir.path().join("nr.faa.cdhit.clstr");
        let synonyms = dir.path().join("syn.tsv");
        fs::write(
            &clstr,
            ">Cluster 0\n0\t10aa, >h1... *\n1\t9aa, >h2... at 90.00%\n>Cluster 1\n0\t20aa, >h3... *\n",
        )
        .unwrap();
        fs::write(&synonyms, "h1\th4\th5\n").unwrap();
        ClusterRun { dir, clstr, synonyms }
    }

    #[rstest]
    fn test_resolve_names_clusters(run: ClusterRun) {
        let resolution = resolve(&run.clstr, None, "Test", ClusterKind::Cds).unwrap();
        assert_eq!(resolution.header_to_allele.get("h1"), Some("Test_C0A0"));
        assert_eq!(resolution.header_to_allele.get("h2"), Some("Test_C0A1"));
        assert_eq!(resolution.header_to_allele.get("h3"), Some("Test_C1A0"));
        assert_eq!(resolution.header_to_allele.len(), 3);
        assert_eq!(
            resolution.header_to_allele.features(),
            vec!["Test_C0A0", "Test_C0A1", "Test_C1A0"]
        );
    }

    #[rstest]
    fn test_resolve_propagates_synonyms(run: ClusterRun) {
        let resolution =
            resolve(&run.clstr, Some(&run.synonyms), "Test", ClusterKind::Noncoding).unwrap();
        for header in ["h1", "h4", "h5"] {
            assert_eq!(resolution.header_to_allele.get(header), Some("Test_T0A0"));
        }
        assert_eq!(resolution.assignments[0].headers, vec!["h1", "h4", "h5"]);
    }

    #[rstest]
    fn test_allele_names_round_trip(run: ClusterRun) {
        let resolution = resolve(&run.clstr, Some(&run.synonyms), "Test", ClusterKind::Cds).unwrap();
        let out = run.dir.path().join("allele_names.tsv");
        write_allele_names(&resolution.assignments, &out).unwrap();

        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "Test_C0A0\th1\th4\th5\nTest_C0A1\th2\nTest_C1A0\th3\n"
        );
        assert_eq!(load_allele_names(&out).unwrap(), resolution.header_to_allele);
    }

    #[rstest]
    fn test_read_allele_assignments_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allele_names.tsv");
        fs::write(&path, "Test_C1A0\th3\n\nTest_C0A0\th1\th5\th4\n").unwrap();
        let assignments = read_allele_assignments(&path).unwrap();
        assert_eq!(
            assignments,
            vec![
                AlleleAssignment { allele: "Test_C1A0".to_string(), headers: vec!["h3".to_string()] },
                AlleleAssignment {
                    allele: "Test_C0A0".to_string(),
                    headers: vec!["h1".to_string(), "h5".to_string(), "h4".to_string()],
                },
            ]
        );
    }

    #[rstest]
    fn test_load_feature_to_allele_trims_locus_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allele_names.tsv");
        fs::write(&path, "Test_C0A0\tfig|562.1.peg.1|b0001\tfig|562.2.peg.9\n").unwrap();
        let map = load_feature_to_allele(&path).unwrap();
        assert_eq!(map.get("fig|562.1.peg.1"), Some("Test_C0A0"));
        assert_eq!(map.get("fig|562.2.peg.9"), Some("Test_C0A0"));
        assert_eq!(map.get("fig|562.1.peg.1|b0001"), None);
    }

    #[rstest]
    fn test_load_header_to_allele_extends_existing_map(run: ClusterRun) {
        let mut existing = HeaderToFeatureMap::new();
        existing.insert("h1", "Test_C0A0");
        let map =
            load_header_to_allele(None, Some(&run.synonyms), Some(existing), "Test", ClusterKind::Cds)
                .unwrap();
        assert_eq!(map.get("h5"), Some("Test_C0A0"));
        assert_eq!(map.len(), 3);
    }
}
