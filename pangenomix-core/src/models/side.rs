use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;

use crate::errors::PangenomeError;
use crate::models::feature::VariantKind;
use crate::utils::genome_from_derived_path;

/// Which flank of a coding feature a proximal sequence comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProximalSide {
    Upstream,
    Downstream,
}

impl ProximalSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProximalSide::Upstream => "upstream",
            ProximalSide::Downstream => "downstream",
        }
    }

    pub fn variant_kind(&self) -> VariantKind {
        match self {
            ProximalSide::Upstream => VariantKind::Upstream,
            ProximalSide::Downstream => VariantKind::Downstream,
        }
    }

    /// Default window limits relative to the anchoring codon.
    pub fn default_limits(&self) -> (i64, i64) {
        match self {
            ProximalSide::Upstream => (-50, 3),
            ProximalSide::Downstream => (-3, 50),
        }
    }
}

impl FromStr for ProximalSide {
    type Err = PangenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upstream" => Ok(ProximalSide::Upstream),
            "downstream" => Ok(ProximalSide::Downstream),
            _ => Err(PangenomeError::InvalidProximalSide(s.to_string())),
        }
    }
}

impl Display for ProximalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

///
/// Split a proximal sequence header such as `fig|562.1.peg.5_upstream(-50,3)`
/// into the feature ID and the side it was extracted from.
///
pub fn split_proximal_header(header: &str) -> Option<(&str, ProximalSide)> {
    for side in [ProximalSide::Upstream, ProximalSide::Downstream] {
        let marker = format!("_{}(", side.as_str());
        if let Some(pos) = header.rfind(&marker) {
            return Some((&header[..pos], side));
        }
    }
    None
}

///
/// Genome name of a per-genome proximal file: the file name up to
/// `_<side>`, so custom footers (`g1_upstream_v2.fna`) are ignored.
///
pub fn genome_from_proximal_path(path: &Path, side: ProximalSide) -> Option<String> {
    genome_from_derived_path(path, side.as_str())
}
