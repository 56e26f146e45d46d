use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use which::which;

/// Extensions clustered as nucleotide sequences.
pub const NUCLEOTIDE_EXTENSIONS: &[&str] = &["fna", "ffn", "fa", "fasta", "frn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterProgram {
    CdHit,
    CdHitEst,
}

impl ClusterProgram {
    ///
    /// Pick the clusterer for an input file: `cd-hit-est` for nucleotide
    /// FASTA, `cd-hit` for everything else.
    ///
    pub fn for_input(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext {
            Some(ext) if NUCLEOTIDE_EXTENSIONS.contains(&ext.as_str()) => ClusterProgram::CdHitEst,
            _ => ClusterProgram::CdHit,
        }
    }

    pub fn binary_name(&self) -> &'static str {
        match self {
            ClusterProgram::CdHit => "cd-hit",
            ClusterProgram::CdHitEst => "cd-hit-est",
        }
    }
}

///
/// Clustering options. `args` are passed to CD-HIT verbatim, in order,
/// after `-i <in> -o <out> -d 0`.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub args: Vec<(String, String)>,
    /// Directory holding `cd-hit`/`cd-hit-est`; looked up on `PATH` if unset.
    pub cdhit_dir: Option<PathBuf>,
    /// Exonerate's `fastasort`, used to sort renamed FASTA files if set.
    pub fastasort: Option<PathBuf>,
}

impl Default for ClusterParams {
    fn default() -> Self {
        ClusterParams {
            args: vec![
                ("-n".to_string(), "5".to_string()),
                ("-c".to_string(), "0.8".to_string()),
            ],
            cdhit_dir: None,
            fastasort: None,
        }
    }
}

impl ClusterParams {
    /// Set a clusterer argument, replacing an earlier value for the same key.
    pub fn set_arg(&mut self, key: &str, value: &str) {
        match self.args.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.args.push((key.to_string(), value.to_string())),
        }
    }
}

pub fn command_args(input: &Path, output: &Path, params: &ClusterParams) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        input.as_os_str().to_owned(),
        "-o".into(),
        output.as_os_str().to_owned(),
        "-d".into(),
        "0".into(),
    ];
    for (key, value) in &params.args {
        args.push(key.into());
        args.push(value.into());
    }
    args
}

///
/// Path of the cluster membership file CD-HIT writes next to `output`.
///
pub fn cluster_file_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".clstr");
    PathBuf::from(name)
}

///
/// Run CD-HIT (or CD-HIT-EST) on `input`, streaming its stdout to the log.
/// Returns the path of the generated `.clstr` file.
///
pub fn cluster_with_cdhit(input: &Path, output: &Path, params: &ClusterParams) -> Result<PathBuf> {
    let program = ClusterProgram::for_input(input);
    let binary = match &params.cdhit_dir {
        Some(dir) => dir.join(program.binary_name()),
        None => which(program.binary_name())
            .map_err(|e| anyhow!("{}: {e}", program.binary_name()))?,
    };

    let args = command_args(input, output, params);
    log::info!(
        "Running '{} {}'",
        binary.display(),
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let mut child = Command::new(&binary)
        .args(&args)
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to start {}", binary.display()))?;

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            log::info!("{}", line?);
        }
    }

    let status = child.wait()?;
    if !status.success() {
        bail!("{} exited with {}", program.binary_name(), status);
    }

    let clstr = cluster_file_for(output);
    if !clstr.is_file() {
        bail!(
            "{} finished but produced no cluster file at {}",
            program.binary_name(),
            clstr.display()
        );
    }

    Ok(clstr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("nr.faa", ClusterProgram::CdHit)]
    #[case("nr.fna", ClusterProgram::CdHitEst)]
    #[case("nr.FNA", ClusterProgram::CdHitEst)]
    #[case("nr", ClusterProgram::CdHit)]
    fn test_program_for_input(#[case] path: &str, #[case] expected: ClusterProgram) {
        assert_eq!(ClusterProgram::for_input(Path::new(path)), expected);
    }

    #[rstest]
    fn test_command_args_keep_order() {
        let mut params = ClusterParams::default();
        params.set_arg("-c", "0.9");
        params.set_arg("-M", "0");
        let args = command_args(Path::new("in.faa"), Path::new("out.cdhit"), &params);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["-i", "in.faa", "-o", "out.cdhit", "-d", "0", "-n", "5", "-c", "0.9", "-M", "0"]
        );
    }

    #[rstest]
    fn test_cluster_file_for() {
        assert_eq!(
            cluster_file_for(Path::new("out/nr.faa.cdhit")),
            PathBuf::from("out/nr.faa.cdhit.clstr")
        );
    }

    #[rstest]
    fn test_missing_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let params = ClusterParams {
            cdhit_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let result = cluster_with_cdhit(
            &dir.path().join("nr.faa"),
            &dir.path().join("nr.faa.cdhit"),
            &params,
        );
        assert!(result.is_err());
    }
}
