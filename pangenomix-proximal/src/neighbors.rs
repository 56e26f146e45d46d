use fxhash::FxHashMap;

use pangenomix_core::gff::GffRecord;
use pangenomix_core::models::Strand;

///
/// Positions of the coding features on each contig and strand, used to find
/// the neighbours a flanking window may not run into.
///
#[derive(Debug, Default, Clone)]
pub struct StrandOccupancy {
    spans: FxHashMap<(String, Strand), Vec<(usize, usize)>>,
}

impl StrandOccupancy {
    ///
    /// Collect `CDS` features, sorted by position per contig and strand.
    /// Features with identical coordinates on the same strand count once.
    ///
    pub fn from_records(records: &[GffRecord]) -> Self {
        let mut spans: FxHashMap<(String, Strand), Vec<(usize, usize)>> = FxHashMap::default();
        for record in records.iter().filter(|r| r.feature_type == "CDS") {
            spans
                .entry((record.contig.clone(), record.strand))
                .or_default()
                .push((record.start, record.stop));
        }
        for features in spans.values_mut() {
            features.sort_unstable();
            features.dedup();
        }
        StrandOccupancy { spans }
    }

    ///
    /// For the feature at `[start, stop)`, the stop of the previous feature
    /// and the start of the next one on the same contig and strand. `None`
    /// means there is no neighbour on that side.
    ///
    pub fn neighbors(
        &self,
        contig: &str,
        strand: Strand,
        start: usize,
        stop: usize,
    ) -> (Option<usize>, Option<usize>) {
        let Some(features) = self.spans.get(&(contig.to_string(), strand)) else {
            return (None, None);
        };
        match features.binary_search(&(start, stop)) {
            Ok(i) => {
                let left = i.checked_sub(1).map(|j| features[j].1);
                let right = features.get(i + 1).map(|f| f.0);
                (left, right)
            }
            // not a CDS itself: neighbours are whatever surrounds its position
            Err(i) => {
                let left = i.checked_sub(1).map(|j| features[j].1);
                let right = features.get(i).map(|f| f.0);
                (left, right)
            }
        }
    }
}
