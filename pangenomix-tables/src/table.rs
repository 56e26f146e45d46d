use std::collections::BTreeSet;

use anyhow::{Result, bail};
use fxhash::FxHashMap;
use sprs::{CsMat, TriMat};

///
/// A binary feature x genome presence table.
///
/// Rows are features, columns are genomes. Only present cells are stored;
/// every stored value is 1. The matrix is kept in compressed sparse column
/// form so the features of one genome can be read directly.
///
#[derive(Debug, Clone)]
pub struct FeatureTable {
    features: Vec<String>,
    genomes: Vec<String>,
    feature_index: FxHashMap<String, usize>,
    genome_index: FxHashMap<String, usize>,
    matrix: CsMat<u8>,
}

fn index_labels(labels: &[String]) -> FxHashMap<String, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.clone(), i))
        .collect()
}

impl FeatureTable {
    ///
    /// Build a table from labels and the (row, column) cells that are
    /// present. Repeated cells collapse to a single 1.
    ///
    pub fn from_cells(
        features: Vec<String>,
        genomes: Vec<String>,
        cells: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self> {
        let (rows, cols) = (features.len(), genomes.len());
        let cells: BTreeSet<(usize, usize)> = cells.into_iter().collect();

        let mut triplets = TriMat::new((rows, cols));
        for (row, col) in cells {
            if row >= rows || col >= cols {
                bail!("Cell ({}, {}) outside a {}x{} table", row, col, rows, cols);
            }
            triplets.add_triplet(row, col, 1u8);
        }

        let feature_index = index_labels(&features);
        let genome_index = index_labels(&genomes);
        if feature_index.len() != rows {
            bail!("Feature labels are not unique");
        }
        if genome_index.len() != cols {
            bail!("Genome labels are not unique");
        }

        Ok(FeatureTable {
            features,
            genomes,
            feature_index,
            genome_index,
            matrix: triplets.to_csc(),
        })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn genomes(&self) -> &[String] {
        &self.genomes
    }

    /// (features, genomes)
    pub fn shape(&self) -> (usize, usize) {
        (self.features.len(), self.genomes.len())
    }

    /// Number of present cells.
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    pub fn has_genome(&self, genome: &str) -> bool {
        self.genome_index.contains_key(genome)
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.feature_index.contains_key(feature)
    }

    pub fn is_present(&self, feature: &str, genome: &str) -> bool {
        match (self.feature_index.get(feature), self.genome_index.get(genome)) {
            (Some(&row), Some(&col)) => self.matrix.get(row, col).is_some(),
            _ => false,
        }
    }

    fn rows_of_column(&self, col: usize) -> Vec<usize> {
        self.matrix
            .outer_view(col)
            .map(|column| column.indices().to_vec())
            .unwrap_or_default()
    }

    /// Features present in `genome`, in row order. Empty for unknown genomes.
    pub fn features_in(&self, genome: &str) -> Vec<&str> {
        match self.genome_index.get(genome) {
            Some(&col) => self
                .rows_of_column(col)
                .into_iter()
                .map(|row| self.features[row].as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of genomes each feature is present in, in row order.
    pub fn genome_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.features.len()];
        for col in 0..self.genomes.len() {
            for row in self.rows_of_column(col) {
                counts[row] += 1;
            }
        }
        counts
    }

    /// Present cells as (row, column), sorted by row then column.
    pub fn cells(&self) -> Vec<(usize, usize)> {
        let mut cells: Vec<(usize, usize)> = (0..self.genomes.len())
            .flat_map(|col| self.rows_of_column(col).into_iter().map(move |row| (row, col)))
            .collect();
        cells.sort_unstable();
        cells
    }
}

///
/// Collects presence calls against fixed row and column labels before
/// freezing them into a [`FeatureTable`].
///
#[derive(Debug, Clone)]
pub struct FeatureTableBuilder {
    features: Vec<String>,
    genomes: Vec<String>,
    feature_index: FxHashMap<String, usize>,
    genome_index: FxHashMap<String, usize>,
    cells: BTreeSet<(usize, usize)>,
}

impl FeatureTableBuilder {
    pub fn new(features: Vec<String>, genomes: Vec<String>) -> Self {
        FeatureTableBuilder {
            feature_index: index_labels(&features),
            genome_index: index_labels(&genomes),
            features,
            genomes,
            cells: BTreeSet::new(),
        }
    }

    ///
    /// Mark `feature` present in `genome`. Returns `false` if either label is
    /// not part of the table.
    ///
    pub fn set(&mut self, feature: &str, genome: &str) -> bool {
        match (self.feature_index.get(feature), self.genome_index.get(genome)) {
            (Some(&row), Some(&col)) => {
                self.cells.insert((row, col));
                true
            }
            _ => false,
        }
    }

    pub fn build(self) -> Result<FeatureTable> {
        FeatureTable::from_cells(self.features, self.genomes, self.cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[fixture]
    fn table() -> FeatureTable {
        let mut builder = FeatureTableBuilder::new(labels(&["a", "b", "c"]), labels(&["g1", "g2"]));
        assert!(builder.set("a", "g1"));
        assert!(builder.set("a", "g1"));
        assert!(builder.set("c", "g1"));
        assert!(builder.set("b", "g2"));
        assert!(!builder.set("z", "g2"));
        builder.build().unwrap()
    }

    #[rstest]
    fn test_presence(table: FeatureTable) {
        assert_eq!(table.shape(), (3, 2));
        assert_eq!(table.nnz(), 3);
        assert!(table.is_present("a", "g1"));
        assert!(!table.is_present("a", "g2"));
        assert!(!table.is_present("a", "g9"));
    }

    #[rstest]
    fn test_features_in(table: FeatureTable) {
        assert_eq!(table.features_in("g1"), vec!["a", "c"]);
        assert_eq!(table.features_in("g2"), vec!["b"]);
        assert!(table.features_in("g3").is_empty());
    }

    #[rstest]
    fn test_counts_and_cells(table: FeatureTable) {
        assert_eq!(table.genome_counts(), vec![1, 1, 1]);
        assert_eq!(table.cells(), vec![(0, 0), (1, 1), (2, 0)]);
    }

    #[rstest]
    fn test_out_of_bounds_cells_are_rejected() {
        let result = FeatureTable::from_cells(labels(&["a"]), labels(&["g1"]), vec![(1, 0)]);
        assert!(result.is_err());
    }

    #[rstest]
    fn test_duplicate_labels_are_rejected() {
        let result = FeatureTable::from_cells(labels(&["a", "a"]), labels(&["g1"]), vec![]);
        assert!(result.is_err());
    }
}
