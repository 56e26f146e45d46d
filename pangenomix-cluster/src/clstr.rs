use std::io::BufRead;
use std::path::Path;

use anyhow::Result;

use pangenomix_core::errors::PangenomeError;
use pangenomix_core::utils::get_dynamic_reader;

/// One sequence assigned to a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMember {
    pub allele: usize,
    pub header: String,
    pub representative: bool,
}

/// A cluster as reported by the clusterer, members in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub index: usize,
    pub members: Vec<ClusterMember>,
}

///
/// Parse a CD-HIT `.clstr` file.
///
/// ```text
/// >Cluster 0
/// 0	330aa, >fig|562.1.peg.1... *
/// 1	329aa, >fig|562.2.peg.7... at 98.48%
/// ```
///
pub fn read_cluster_file(path: &Path) -> Result<Vec<Cluster>> {
    let reader = get_dynamic_reader(path)?;
    Ok(parse_clusters(reader, &path.display().to_string())?)
}

pub fn parse_clusters<R: BufRead>(
    reader: R,
    source: &str,
) -> std::result::Result<Vec<Cluster>, PangenomeError> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = i + 1;
        let malformed = |reason: &str| PangenomeError::ClusterParseError {
            path: source.to_string(),
            line: line_number,
            reason: reason.to_string(),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('>') {
            let index = trimmed
                .split_whitespace()
                .last()
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| malformed("cluster header does not end with a cluster number"))?;
            clusters.push(Cluster {
                index,
                members: Vec::new(),
            });
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(malformed("expected '<allele#> <length>, ><header>...'"));
        }
        let allele = fields[0]
            .parse::<usize>()
            .map_err(|_| malformed("allele number is not an integer"))?;
        let header = fields[2]
            .strip_prefix('>')
            .and_then(|h| h.strip_suffix("..."))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| malformed("header is not of the form '>header...'"))?;
        let representative = fields.last().is_some_and(|f| *f == "*");

        let cluster = clusters
            .last_mut()
            .ok_or_else(|| malformed("member line before any cluster header"))?;
        cluster.members.push(ClusterMember {
            allele,
            header: header.to_string(),
            representative,
        });
    }

    Ok(clusters)
}
