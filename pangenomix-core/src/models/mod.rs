pub mod feature;
pub mod side;
pub mod strand;

// re-export for cleaner imports
pub use self::feature::{
    ClusterKind, FeatureName, VariantKind, breakdown_feature_name, create_feature_name, gene_of,
    trim_variant,
};
pub use self::side::{ProximalSide, genome_from_proximal_path, split_proximal_header};
pub use self::strand::Strand;
