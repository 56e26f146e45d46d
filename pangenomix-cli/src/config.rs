use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pangenomix::cluster::ClusterParams;
use pangenomix::proximal::{NoncodingParams, ProximalParams};

///
/// Settings shared by all subcommands, read from a TOML file. Every
/// section is optional; command line flags override what is set here.
///
/// ```toml
/// [cluster]
/// args = [["-n", "5"], ["-c", "0.8"]]
/// fastasort = "/opt/exonerate/bin/fastasort"
///
/// [proximal]
/// limits = [-50, 3]
/// max_overlap = 0
///
/// [noncoding]
/// flanking = [10, 10]
/// ```
///
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub cluster: ClusterParams,
    pub proximal: ProximalParams,
    pub noncoding: NoncodingParams,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl TryFrom<&Path> for PipelineConfig {
    type Error = ConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let toml_str = read_to_string(path)?;
        let config = toml::from_str(&toml_str)?;
        Ok(config)
    }
}

impl PipelineConfig {
    /// Load `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => PipelineConfig::try_from(path),
            None => Ok(PipelineConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use std::path::PathBuf;

    #[rstest]
    fn test_try_from_toml() {
        let path = PathBuf::from("tests/data/pangenomix.toml");
        let config = PipelineConfig::try_from(path.as_path()).unwrap();

        assert_eq!(
            config.cluster.args,
            vec![
                ("-n".to_string(), "4".to_string()),
                ("-c".to_string(), "0.7".to_string())
            ]
        );
        assert_eq!(config.cluster.cdhit_dir, Some(PathBuf::from("/opt/cdhit")));
        assert_eq!(config.proximal.limits, Some((-100, 3)));
        assert_eq!(config.proximal.max_overlap, Some(0));
        assert_eq!(config.noncoding.flanking, (10, 5));
        assert_eq!(config.noncoding.allowed_features, vec!["tRNA".to_string()]);
    }

    #[rstest]
    fn test_missing_sections_use_defaults() {
        let config: PipelineConfig = toml::from_str("[proximal]\ninclude_fragments = true\n").unwrap();
        assert_eq!(config.cluster, ClusterParams::default());
        assert_eq!(config.noncoding, NoncodingParams::default());
        assert!(config.proximal.include_fragments);
        assert_eq!(config.proximal.limits, None);
    }

    #[rstest]
    fn test_load_without_path() {
        assert_eq!(PipelineConfig::load(None).unwrap(), PipelineConfig::default());
    }

    #[rstest]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[cluster\n").unwrap();
        assert!(matches!(
            PipelineConfig::try_from(path.as_path()),
            Err(ConfigError::Toml(_))
        ));
    }
}
