use thiserror::Error;

#[derive(Error, Debug)]
pub enum PangenomeError {
    #[error("Invalid feature name: {0}")]
    InvalidFeatureName(String),

    #[error("Invalid cluster kind: {0}")]
    InvalidClusterKind(String),

    #[error("Invalid variant kind: {0}")]
    InvalidVariantKind(String),

    #[error("Invalid proximal side: {0}")]
    InvalidProximalSide(String),

    #[error("Invalid strand: {0}")]
    InvalidStrand(String),

    #[error("Malformed GFF line {line} in {path}: {reason}")]
    GffParseError {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Malformed cluster file line {line} in {path}: {reason}")]
    ClusterParseError {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Can't determine genome name from path: {0}")]
    InvalidGenomePath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PangenomeError>;
