use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bio::alphabets::dna;
use bio::io::fasta;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use pangenomix_cluster::HeaderToFeatureMap;
use pangenomix_core::gff::{GffRecord, read_gff};
use pangenomix_core::models::{ProximalSide, Strand};
use pangenomix_core::utils::{GenomeFiles, genome_progress_bar, get_dynamic_reader, write_atomically};

use crate::neighbors::StrandOccupancy;

///
/// Settings for extracting flanking sequences.
///
/// `limits` are relative to the feature's start codon (upstream) or stop
/// codon (downstream) on the feature's own strand: `(-50, 3)` upstream
/// takes 50 nt before the start codon plus the codon itself.
///
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximalParams {
    /// Defaults to `(-50, 3)` upstream and `(-3, 50)` downstream.
    pub limits: Option<(i64, i64)>,
    /// Maximum overlap with neighbouring CDS on the same strand; unlimited if unset.
    pub max_overlap: Option<usize>,
    /// Keep windows cut short by contig ends.
    pub include_fragments: bool,
    /// Inserted into per-genome output names: `<genome>_<side><footer>.fna`.
    pub footer: String,
    /// Re-extract even if a per-genome output already exists.
    pub overwrite: bool,
}

impl ProximalParams {
    pub fn limits_for(&self, side: ProximalSide) -> (i64, i64) {
        self.limits.unwrap_or_else(|| side.default_limits())
    }
}

///
/// Suffix appended to a feature ID to name its flanking sequence, e.g.
/// `_upstream(-50,3)` or `_upstream(-50,3,0)` when overlap is limited.
///
pub fn proximal_footer(side: ProximalSide, limits: (i64, i64), max_overlap: Option<usize>) -> String {
    match max_overlap {
        Some(overlap) => format!("_{}({},{},{})", side, limits.0, limits.1, overlap),
        None => format!("_{}({},{})", side, limits.0, limits.1),
    }
}

///
/// Number of window bases that lie inside the feature itself. A window has
/// to be longer than this to contain any flanking sequence.
///
pub fn coding_length(side: ProximalSide, limits: (i64, i64)) -> i64 {
    match side {
        ProximalSide::Upstream => limits.1,
        ProximalSide::Downstream => -limits.0,
    }
}

///
/// Window `[start, stop)` in contig coordinates for a feature's flank,
/// before clamping to the contig. `None` for features without a strand.
///
pub fn proximal_window(
    feature: &GffRecord,
    side: ProximalSide,
    limits: (i64, i64),
    max_overlap: Option<usize>,
    occupancy: &StrandOccupancy,
) -> Option<(i64, i64)> {
    let (start, stop) = (feature.start as i64, feature.stop as i64);
    let (anchor, (l0, l1)) = match (side, feature.strand) {
        (ProximalSide::Upstream, Strand::Forward) => (start, limits),
        (ProximalSide::Downstream, Strand::Forward) => (stop, limits),
        (ProximalSide::Upstream, Strand::Reverse) => (stop, (-limits.1, -limits.0)),
        (ProximalSide::Downstream, Strand::Reverse) => (start, (-limits.1, -limits.0)),
        (_, Strand::Unknown) => return None,
    };
    let mut window = (anchor + l0, anchor + l1);

    if let Some(overlap) = max_overlap {
        let overlap = overlap as i64;
        let (left, right) =
            occupancy.neighbors(&feature.contig, feature.strand, feature.start, feature.stop);
        if let Some(left) = left {
            window.0 = window.0.max(left as i64 - overlap);
        }
        if let Some(right) = right {
            window.1 = window.1.min(right as i64 + overlap);
        }
    }

    Some(window)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximalSequence {
    pub sequence: String,
    /// The window ran past a contig end and was cut short.
    pub is_fragment: bool,
}

///
/// Cut a window out of a contig, clamped to the contig ends, reverse
/// complemented for features on the reverse strand.
///
pub fn extract_window(contig: &[u8], window: (i64, i64), strand: Strand) -> ProximalSequence {
    let len = contig.len() as i64;
    let start = window.0.clamp(0, len);
    let stop = window.1.clamp(start, len);
    let slice = &contig[start as usize..stop as usize];
    let bytes = match strand {
        Strand::Reverse => dna::revcomp(slice),
        _ => slice.to_vec(),
    };
    ProximalSequence {
        sequence: String::from_utf8_lossy(&bytes).into_owned(),
        is_fragment: window.0 < 0 || window.1 > len,
    }
}

///
/// Load contigs keyed by the first word of their header.
///
pub fn load_contigs(path: &Path) -> Result<FxHashMap<String, Vec<u8>>> {
    let reader = fasta::Reader::new(get_dynamic_reader(path)?);
    let mut contigs = FxHashMap::default();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read contigs from {:?}", path))?;
        contigs.insert(record.id().to_string(), record.seq().to_vec());
    }
    Ok(contigs)
}

///
/// Extract the upstream or downstream sequence of every coding feature of
/// one genome and write them to `output`, one unwrapped record per feature.
///
/// Only features whose `ID` appears in `feature_to_allele` are extracted,
/// or every CDS if no map is given. Returns the number of sequences written.
///
pub fn extract(
    gff: &Path,
    contigs: &Path,
    feature_to_allele: Option<&HeaderToFeatureMap>,
    side: ProximalSide,
    params: &ProximalParams,
    output: &Path,
) -> Result<usize> {
    let records = read_gff(gff)?;
    let contigs = load_contigs(contigs)?;
    let limits = params.limits_for(side);
    let footer = proximal_footer(side, limits, params.max_overlap);
    let min_length = coding_length(side, limits).max(0);
    let occupancy = match params.max_overlap {
        Some(_) => StrandOccupancy::from_records(&records),
        None => StrandOccupancy::default(),
    };

    let mut written = 0usize;
    write_atomically(output, |writer| {
        for (i, record) in records.iter().enumerate() {
            if record.feature_type != "CDS" {
                continue;
            }
            let id = record.id().with_context(|| {
                format!("{:?}: CDS feature #{} has no ID attribute", gff, i + 1)
            })?;
            if feature_to_allele.is_some_and(|map| !map.contains(id)) {
                continue;
            }
            let Some(contig) = contigs.get(&record.contig) else {
                log::debug!("Contig {} of {} not found", record.contig, id);
                continue;
            };
            let Some(window) =
                proximal_window(record, side, limits, params.max_overlap, &occupancy)
            else {
                log::debug!("Skipping {} without strand", id);
                continue;
            };

            let proximal = extract_window(contig, window, record.strand);
            if (proximal.sequence.len() as i64) > min_length
                && (!proximal.is_fragment || params.include_fragments)
            {
                writeln!(writer, ">{}{}", id, footer)?;
                writeln!(writer, "{}", proximal.sequence)?;
                written += 1;
            }
        }
        Ok(())
    })?;

    log::debug!("Extracted {} {} sequences from {:?}", written, side, gff);
    Ok(written)
}

///
/// Per-genome output path: `<genome dir>/derived/<genome>_<side><footer>.fna`,
/// where the genome dir is the directory of the contig file.
///
pub fn derived_path(genome: &GenomeFiles, side: &str, footer: &str) -> PathBuf {
    let dir = genome.fna.parent().unwrap_or_else(|| Path::new("."));
    dir.join("derived")
        .join(format!("{}_{}{}.fna", genome.genome, side, footer))
}

///
/// Run [`extract`] for every genome, reusing existing outputs unless
/// `params.overwrite` is set. Returns the per-genome output paths.
///
pub fn extract_for_genomes(
    genomes: &[GenomeFiles],
    feature_to_allele: Option<&HeaderToFeatureMap>,
    side: ProximalSide,
    params: &ProximalParams,
) -> Result<Vec<PathBuf>> {
    let mut outputs = Vec::with_capacity(genomes.len());
    let bar = genome_progress_bar(genomes.len(), "Extracting flanking sequences");
    for genome in genomes {
        let output = derived_path(genome, side.as_str(), &params.footer);
        if output.is_file() && !params.overwrite {
            log::debug!("Using existing {:?}", output);
        } else {
            if let Some(dir) = output.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {:?}", dir))?;
            }
            extract(&genome.gff, &genome.fna, feature_to_allele, side, params, &output)?;
        }
        outputs.push(output);
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;

    fn feature(start: usize, stop: usize, strand: Strand) -> GffRecord {
        GffRecord {
            contig: "c1".to_string(),
            feature_type: "CDS".to_string(),
            start,
            stop,
            strand,
            attributes: vec![("ID".to_string(), "f".to_string())],
        }
    }

    fn contig(len: usize) -> Vec<u8> {
        b"ACGGTCATTG".iter().cycle().take(len).copied().collect()
    }

    #[rstest]
    fn test_upstream_window_forward_strand() {
        // GFF 100..160 is [99, 160) 0-based
        let f = feature(99, 160, Strand::Forward);
        let window = proximal_window(&f, ProximalSide::Upstream, (-10, 3), None, &StrandOccupancy::default());
        assert_eq!(window, Some((89, 102)));

        let seq = contig(300);
        let proximal = extract_window(&seq, window.unwrap(), f.strand);
        assert_eq!(proximal.sequence.len(), 13);
        assert_eq!(proximal.sequence.as_bytes(), &seq[89..102]);
        assert!(!proximal.is_fragment);
    }

    #[rstest]
    #[case(ProximalSide::Upstream, Strand::Reverse, (157, 170))]
    #[case(ProximalSide::Downstream, Strand::Forward, (157, 170))]
    #[case(ProximalSide::Downstream, Strand::Reverse, (89, 102))]
    fn test_window_anchors(
        #[case] side: ProximalSide,
        #[case] strand: Strand,
        #[case] expected: (i64, i64),
    ) {
        let f = feature(99, 160, strand);
        let limits = match side {
            ProximalSide::Upstream => (-10, 3),
            ProximalSide::Downstream => (-3, 10),
        };
        assert_eq!(
            proximal_window(&f, side, limits, None, &StrandOccupancy::default()),
            Some(expected)
        );
    }

    #[rstest]
    fn test_strand_symmetry() {
        let seq = contig(400);
        let (x, y) = (-20i64, 3i64);
        let forward = feature(150, 300, Strand::Forward);
        let reverse = feature(150, 300, Strand::Reverse);
        let empty = StrandOccupancy::default();

        let up = proximal_window(&forward, ProximalSide::Upstream, (x, y), None, &empty).unwrap();
        let down = proximal_window(&reverse, ProximalSide::Downstream, (-y, -x), None, &empty).unwrap();
        let up = extract_window(&seq, up, Strand::Forward).sequence;
        let down = extract_window(&seq, down, Strand::Reverse).sequence;

        assert_eq!(
            up,
            String::from_utf8(dna::revcomp(down.as_bytes())).unwrap()
        );
    }

    #[rstest]
    fn test_overlap_truncation() {
        let records = vec![
            feature(0, 90, Strand::Forward),
            feature(99, 160, Strand::Forward),
        ];
        let occupancy = StrandOccupancy::from_records(&records);
        let window = proximal_window(&records[1], ProximalSide::Upstream, (-50, 3), Some(5), &occupancy);
        assert_eq!(window, Some((85, 102)));
        let window = proximal_window(&records[1], ProximalSide::Upstream, (-50, 3), Some(0), &occupancy);
        assert_eq!(window, Some((90, 102)));
    }

    #[rstest]
    fn test_fragments_are_clamped() {
        let seq = contig(50);
        let proximal = extract_window(&seq, (-5, 10), Strand::Forward);
        assert!(proximal.is_fragment);
        assert_eq!(proximal.sequence.as_bytes(), &seq[0..10]);
        let proximal = extract_window(&seq, (45, 60), Strand::Forward);
        assert!(proximal.is_fragment);
        assert_eq!(proximal.sequence.len(), 5);
        let proximal = extract_window(&seq, (70, 80), Strand::Forward);
        assert_eq!(proximal.sequence, "");
    }

    #[rstest]
    fn test_proximal_footer() {
        assert_eq!(proximal_footer(ProximalSide::Upstream, (-50, 3), None), "_upstream(-50,3)");
        assert_eq!(proximal_footer(ProximalSide::Downstream, (-3, 50), Some(0)), "_downstream(-3,50,0)");
    }

    struct Genome {
        _dir: tempfile::TempDir,
        files: GenomeFiles,
        contig: Vec<u8>,
    }

    #[fixture]
    fn genome() -> Genome {
        let dir = tempfile::tempdir().unwrap();
        let contig = contig(200);
        let gff = dir.path().join("g1.gff");
        let fna = dir.path().join("g1.fna");
        fs::write(
            &gff,
            [
                "##gff-version 3",
                "accn|c1\tPATRIC\tCDS\t100\t160\t.\t+\t0\tID=fig|1.1.peg.1;product=x",
                "accn|c1\tPATRIC\tCDS\t5\t40\t.\t+\t0\tID=fig|1.1.peg.2",
                "accn|c1\tPATRIC\tCDS\t180\t195\t.\t-\t0\tID=fig|1.1.peg.3",
                "accn|c1\tPATRIC\ttRNA\t60\t80\t.\t+\t0\tID=fig|1.1.rna.1",
                "accn|c9\tPATRIC\tCDS\t100\t160\t.\t+\t0\tID=fig|1.1.peg.4",
            ]
            .join("\n"),
        )
        .unwrap();
        fs::write(&fna, format!(">c1 chromosome\n{}\n", String::from_utf8(contig.clone()).unwrap())).unwrap();
        Genome {
            _dir: dir,
            files: GenomeFiles { genome: "g1".to_string(), gff, fna },
            contig,
        }
    }

    #[rstest]
    fn test_extract(genome: Genome) {
        let out = genome.files.fna.parent().unwrap().join("g1_upstream.fna");
        let params = ProximalParams { limits: Some((-10, 3)), ..Default::default() };

        let written = extract(&genome.files.gff, &genome.files.fna, None, ProximalSide::Upstream, &params, &out).unwrap();

        // peg.2 runs off the contig start and peg.3 off its end; peg.4 has no contig
        assert_eq!(written, 1);
        let expected = format!(
            ">fig|1.1.peg.1_upstream(-10,3)\n{}\n",
            String::from_utf8(genome.contig[89..102].to_vec()).unwrap()
        );
        assert_eq!(fs::read_to_string(&out).unwrap(), expected);
    }

    #[rstest]
    fn test_extract_with_fragments_and_allele_filter(genome: Genome) {
        let out = genome.files.fna.parent().unwrap().join("g1_upstream.fna");
        let params = ProximalParams {
            limits: Some((-10, 3)),
            include_fragments: true,
            ..Default::default()
        };
        let mut map = HeaderToFeatureMap::new();
        map.insert("fig|1.1.peg.2", "T_C0A0");
        map.insert("fig|1.1.peg.3", "T_C1A0");

        let written = extract(&genome.files.gff, &genome.files.fna, Some(&map), ProximalSide::Upstream, &params, &out).unwrap();

        assert_eq!(written, 2);
        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">fig|1.1.peg.2_upstream(-10,3)");
        // [ -6, 7 ) clamped to [0, 7)
        assert_eq!(lines[1].as_bytes(), &genome.contig[0..7]);
        assert_eq!(lines[2], ">fig|1.1.peg.3_upstream(-10,3)");
        // reverse strand: [192, 205) clamped to [192, 200), reverse complemented
        assert_eq!(lines[3].as_bytes(), dna::revcomp(&genome.contig[192..200]).as_slice());
    }

    #[rstest]
    fn test_extract_for_genomes_reuses_outputs(genome: Genome) {
        let params = ProximalParams { limits: Some((-10, 3)), ..Default::default() };
        let outputs = extract_for_genomes(&[genome.files.clone()], None, ProximalSide::Upstream, &params).unwrap();
        assert_eq!(outputs, vec![genome.files.fna.parent().unwrap().join("derived/g1_upstream.fna")]);

        fs::write(&outputs[0], "stale").unwrap();
        extract_for_genomes(&[genome.files.clone()], None, ProximalSide::Upstream, &params).unwrap();
        assert_eq!(fs::read_to_string(&outputs[0]).unwrap(), "stale");

        let params = ProximalParams { overwrite: true, ..params };
        extract_for_genomes(&[genome.files.clone()], None, ProximalSide::Upstream, &params).unwrap();
        assert!(fs::read_to_string(&outputs[0]).unwrap().starts_with(">fig|1.1.peg.1"));
    }
}
