use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::PangenomeError;

///
/// The kind of sequence a cluster was built from. Encoded as a single
/// letter right after the last underscore of a feature name.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterKind {
    Cds,
    Noncoding,
}

impl ClusterKind {
    pub fn code(&self) -> char {
        match self {
            ClusterKind::Cds => 'C',
            ClusterKind::Noncoding => 'T',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'C' => Some(ClusterKind::Cds),
            'T' => Some(ClusterKind::Noncoding),
            _ => None,
        }
    }
}

impl FromStr for ClusterKind {
    type Err = PangenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cds" | "c" => Ok(ClusterKind::Cds),
            "noncoding" | "t" => Ok(ClusterKind::Noncoding),
            _ => Err(PangenomeError::InvalidClusterKind(s.to_string())),
        }
    }
}

impl Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKind::Cds => write!(f, "cds"),
            ClusterKind::Noncoding => write!(f, "noncoding"),
        }
    }
}

///
/// The kind of variant hanging off a cluster: a sequence variant of the
/// feature itself, or of its upstream/downstream flank.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKind {
    Allele,
    Upstream,
    Downstream,
}

impl VariantKind {
    pub fn code(&self) -> char {
        match self {
            VariantKind::Allele => 'A',
            VariantKind::Upstream => 'U',
            VariantKind::Downstream => 'D',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'A' => Some(VariantKind::Allele),
            'U' => Some(VariantKind::Upstream),
            'D' => Some(VariantKind::Downstream),
            _ => None,
        }
    }
}

impl FromStr for VariantKind {
    type Err = PangenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allele" | "a" => Ok(VariantKind::Allele),
            "upstream" | "u" => Ok(VariantKind::Upstream),
            "downstream" | "d" => Ok(VariantKind::Downstream),
            _ => Err(PangenomeError::InvalidVariantKind(s.to_string())),
        }
    }
}

impl Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Allele => write!(f, "allele"),
            VariantKind::Upstream => write!(f, "upstream"),
            VariantKind::Downstream => write!(f, "downstream"),
        }
    }
}

///
/// A structured pan-genome feature name.
///
/// Genes are `Cluster` names (`<name>_C12`), alleles and proximal variants
/// are `Variant` names (`<name>_C12A3`, `<name>_C12U0`). The textual form
/// is produced by `Display` and parsed back by `FromStr`.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureName {
    Cluster {
        name: String,
        kind: ClusterKind,
        cluster: usize,
    },
    Variant {
        name: String,
        kind: ClusterKind,
        cluster: usize,
        variant_kind: VariantKind,
        variant: usize,
    },
}

impl FeatureName {
    pub fn cluster(name: &str, kind: ClusterKind, cluster: usize) -> Self {
        FeatureName::Cluster {
            name: name.to_string(),
            kind,
            cluster,
        }
    }

    pub fn variant(
        name: &str,
        kind: ClusterKind,
        cluster: usize,
        variant_kind: VariantKind,
        variant: usize,
    ) -> Self {
        FeatureName::Variant {
            name: name.to_string(),
            kind,
            cluster,
            variant_kind,
            variant,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FeatureName::Cluster { name, .. } | FeatureName::Variant { name, .. } => name,
        }
    }

    pub fn kind(&self) -> ClusterKind {
        match self {
            FeatureName::Cluster { kind, .. } | FeatureName::Variant { kind, .. } => *kind,
        }
    }

    pub fn cluster_index(&self) -> usize {
        match self {
            FeatureName::Cluster { cluster, .. } | FeatureName::Variant { cluster, .. } => {
                *cluster
            }
        }
    }

    pub fn variant_kind(&self) -> Option<VariantKind> {
        match self {
            FeatureName::Cluster { .. } => None,
            FeatureName::Variant { variant_kind, .. } => Some(*variant_kind),
        }
    }

    ///
    /// The gene a feature belongs to. A gene is its own parent.
    ///
    pub fn parent(&self) -> FeatureName {
        FeatureName::cluster(self.name(), self.kind(), self.cluster_index())
    }
}

impl Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureName::Cluster {
                name,
                kind,
                cluster,
            } => write!(f, "{}_{}{}", name, kind.code(), cluster),
            FeatureName::Variant {
                name,
                kind,
                cluster,
                variant_kind,
                variant,
            } => write!(
                f,
                "{}_{}{}{}{}",
                name,
                kind.code(),
                cluster,
                variant_kind.code(),
                variant
            ),
        }
    }
}

fn parse_index(digits: &str, full: &str) -> Result<usize, PangenomeError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PangenomeError::InvalidFeatureName(full.to_string()));
    }
    digits
        .parse::<usize>()
        .map_err(|_| PangenomeError::InvalidFeatureName(full.to_string()))
}

impl FromStr for FeatureName {
    type Err = PangenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PangenomeError::InvalidFeatureName(s.to_string());

        let (name, footer) = s.rsplit_once('_').ok_or_else(invalid)?;
        let mut chars = footer.chars();
        let kind = chars
            .next()
            .and_then(ClusterKind::from_code)
            .ok_or_else(invalid)?;
        let rest = chars.as_str();

        match rest.find(|c: char| VariantKind::from_code(c).is_some()) {
            Some(pos) => {
                let variant_kind = rest[pos..]
                    .chars()
                    .next()
                    .and_then(VariantKind::from_code)
                    .ok_or_else(invalid)?;
                let cluster = parse_index(&rest[..pos], s)?;
                let variant = parse_index(&rest[pos + 1..], s)?;
                Ok(FeatureName::variant(
                    name,
                    kind,
                    cluster,
                    variant_kind,
                    variant,
                ))
            }
            None => Ok(FeatureName::cluster(name, kind, parse_index(rest, s)?)),
        }
    }
}

///
/// Build the textual name of a gene (`variant` is `None`) or of one of its
/// variants.
///
pub fn create_feature_name(
    name: &str,
    kind: ClusterKind,
    cluster: usize,
    variant: Option<(VariantKind, usize)>,
) -> String {
    match variant {
        Some((variant_kind, index)) => {
            FeatureName::variant(name, kind, cluster, variant_kind, index).to_string()
        }
        None => FeatureName::cluster(name, kind, cluster).to_string(),
    }
}

///
/// Parse a feature name into its components.
///
pub fn breakdown_feature_name(feature: &str) -> Result<FeatureName, PangenomeError> {
    FeatureName::from_str(feature)
}

///
/// Name of the gene an allele or proximal variant belongs to.
///
pub fn gene_of(feature: &str) -> Result<String, PangenomeError> {
    Ok(breakdown_feature_name(feature)?.parent().to_string())
}

///
/// Strip the variant code from a feature name, so `X_C3A12` becomes `X_C3`.
/// Gene names and anything without a variant code come back unchanged.
///
pub fn trim_variant(feature: &str) -> &str {
    let footer = feature.rfind('_').map_or(0, |pos| pos + 1);
    match feature[footer..].rfind(|c: char| VariantKind::from_code(c).is_some()) {
        // the first footer character is the cluster kind
        Some(pos) if pos > 0 => &feature[..footer + pos],
        _ => feature,
    }
}
