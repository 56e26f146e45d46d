use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::write::GzEncoder;

use pangenomix_core::utils::get_dynamic_reader;

use crate::table::FeatureTable;

pub const MTX_HEADER: &str = "%%MatrixMarket matrix coordinate integer general";

/// Files making up one persisted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    pub matrix: PathBuf,
    pub features: PathBuf,
    pub genomes: PathBuf,
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl TablePaths {
    pub fn from_prefix(prefix: &Path) -> Self {
        TablePaths {
            matrix: with_suffix(prefix, "_matrix.mtx.gz"),
            features: with_suffix(prefix, "_features.tsv.gz"),
            genomes: with_suffix(prefix, "_genomes.tsv.gz"),
        }
    }
}

fn write_labels(labels: &[String], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));
    for label in labels {
        writeln!(writer, "{}", label)?;
    }
    writer.flush()?;
    Ok(())
}

///
/// Write a feature table to Matrix Market format.
///
/// Produces three files:
/// - {prefix}_matrix.mtx.gz: sparse triplets (feature, genome, 1), 1-based,
///   sorted by (row, col)
/// - {prefix}_features.tsv.gz: row labels, one per line
/// - {prefix}_genomes.tsv.gz: column labels, one per line
///
pub fn write_table_to_mtx(table: &FeatureTable, prefix: &Path) -> Result<TablePaths> {
    let paths = TablePaths::from_prefix(prefix);
    let cells = table.cells();
    let (rows, cols) = table.shape();

    let mtx_file = File::create(&paths.matrix)
        .with_context(|| format!("Failed to create {:?}", paths.matrix))?;
    let mut mtx_writer = BufWriter::new(GzEncoder::new(mtx_file, Compression::default()));

    writeln!(mtx_writer, "{}", MTX_HEADER)?;
    writeln!(mtx_writer, "{} {} {}", rows, cols, cells.len())?;
    for (row, col) in cells {
        writeln!(mtx_writer, "{} {} 1", row + 1, col + 1)?;
    }
    mtx_writer.flush()?;

    write_labels(table.features(), &paths.features)?;
    write_labels(table.genomes(), &paths.genomes)?;

    log::info!(
        "Wrote {}x{} table with {} entries to {:?}",
        rows,
        cols,
        table.nnz(),
        paths.matrix
    );

    Ok(paths)
}

fn read_labels(path: &Path) -> Result<Vec<String>> {
    let reader = get_dynamic_reader(path)?;
    let mut labels = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let label = line.trim_end_matches(['\r', '\n']);
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }
    Ok(labels)
}

fn parse_numbers<const N: usize>(line: &str, path: &Path, line_number: usize) -> Result<[usize; N]> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != N {
        bail!(
            "{:?} line {}: expected {} fields, found {}",
            path,
            line_number,
            N,
            fields.len()
        );
    }
    let mut numbers = [0usize; N];
    for (slot, field) in numbers.iter_mut().zip(fields) {
        *slot = field
            .parse()
            .with_context(|| format!("{:?} line {}: '{}' is not a number", path, line_number, field))?;
    }
    Ok(numbers)
}

///
/// Read a table written by [`write_table_to_mtx`]. Cells with value 0 are
/// treated as absent.
///
pub fn read_table_from_mtx(prefix: &Path) -> Result<FeatureTable> {
    let paths = TablePaths::from_prefix(prefix);
    let features = read_labels(&paths.features)?;
    let genomes = read_labels(&paths.genomes)?;

    let reader = get_dynamic_reader(&paths.matrix)?;
    let mut dims: Option<[usize; 3]> = None;
    let mut cells = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        match dims {
            None => {
                let [rows, cols, _] = parse_numbers::<3>(line, &paths.matrix, i + 1)?;
                if rows != features.len() || cols != genomes.len() {
                    bail!(
                        "{:?} declares a {}x{} matrix but has {} feature and {} genome labels",
                        paths.matrix,
                        rows,
                        cols,
                        features.len(),
                        genomes.len()
                    );
                }
                dims = Some([rows, cols, 0]);
            }
            Some(_) => {
                let [row, col, value] = parse_numbers::<3>(line, &paths.matrix, i + 1)?;
                if row == 0 || col == 0 {
                    bail!("{:?} line {}: indices are 1-based", paths.matrix, i + 1);
                }
                if value != 0 {
                    cells.push((row - 1, col - 1));
                }
            }
        }
    }

    if dims.is_none() {
        bail!("{:?} has no size line", paths.matrix);
    }

    FeatureTable::from_cells(features, genomes, cells)
}
