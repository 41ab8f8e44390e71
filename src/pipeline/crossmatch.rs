//! Positional cross-matching through an external tool.
//!
//! The pipeline only describes *what* to join ([`MatchJob`]); a
//! [`CrossMatcher`] decides how. [`Stilts`] runs the STILTS command line;
//! tests substitute an in-process fake.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;

use crate::config::{Config, XrayConfig};
use crate::pipeline::reader::{DEC_BEST, RA_BEST};

/// CDS name of the AllWISE source catalogue.
pub const ALLWISE_TABLE: &str = "ALLWISE";
/// CDS name of the Gaia EDR3 source catalogue.
pub const GAIA_TABLE: &str = "I/350/gaiaedr3";
/// Suffix of columns joined from AllWISE.
pub const ALLWISE_SUFFIX: &str = "_ALLWISE";
/// Suffix of columns joined from Gaia.
pub const GAIA_SUFFIX: &str = "_GAIA_DR3";

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{job} exited with {status}")]
    Failed { job: String, status: ExitStatus },

    #[error("{job} reported success but wrote no {}", path.display())]
    MissingOutput { job: String, path: PathBuf },

    #[error("cannot remove previous output {}: {source}", path.display())]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{job} failed: {message}")]
    Other { job: String, message: String },
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Probabilistic sky match where both sides carry a positional error
/// column; best match per row of the first table, unmatched rows dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyErrMatch {
    pub in1: PathBuf,
    pub in2: PathBuf,
    /// `"<RA> <DEC> <ERR>"` column expressions of `in1`.
    pub values1: String,
    /// `"<RA> <DEC> <ERR>"` column expressions of `in2`.
    pub values2: String,
    pub suffix2: String,
    /// Largest positional error considered, arcsec.
    pub max_error: f64,
    /// Table format of `in1` and of the output.
    pub format: String,
    /// Table format of `in2`, which is not written by this pipeline.
    pub format2: String,
    pub out: PathBuf,
}

/// Fixed-radius match of a local table against a remote CDS table, keeping
/// every local row that has a counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct CdsMatch {
    pub input: PathBuf,
    pub cds_table: String,
    pub radius_arcsec: f64,
    pub suffix: String,
    /// Table format of the input and the output.
    pub format: String,
    pub out: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchJob {
    SkyErr(SkyErrMatch),
    Cds(CdsMatch),
}

impl MatchJob {
    pub fn output(&self) -> &Path {
        match self {
            MatchJob::SkyErr(job) => &job.out,
            MatchJob::Cds(job) => &job.out,
        }
    }
}

/// STILTS format name for a table file, from its extension.
pub fn stilts_format(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => "parquet".to_string(),
        "fits" | "fit" | "fts" | "fz" => "fits".to_string(),
        "csv" => "csv".to_string(),
        "vot" | "votable" | "xml" => "votable".to_string(),
        "" => "(auto)".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Display for MatchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchJob::SkyErr(job) => write!(
                f,
                "sky match {} × {}",
                job.in1.display(),
                job.in2.display()
            ),
            MatchJob::Cds(job) => write!(f, "{} match of {}", job.cds_table, job.input.display()),
        }
    }
}

/// Join of the stacked training table against the X-ray catalogue.
pub fn xray_job(config: &Config, training: &Path, out: &Path) -> MatchJob {
    let XrayConfig {
        path,
        values,
        training_values,
        suffix,
        ..
    } = &config.xray;
    MatchJob::SkyErr(SkyErrMatch {
        in1: training.to_path_buf(),
        in2: path.clone(),
        values1: training_values.clone(),
        values2: values.clone(),
        suffix2: suffix.clone(),
        max_error: config.matcher.xray_max_error,
        format: config.format.clone(),
        format2: stilts_format(path),
        out: out.to_path_buf(),
    })
}

/// The AllWISE join followed by the Gaia join; the second consumes the
/// first one's output.
pub fn multiwavelength_jobs(
    config: &Config,
    input: &Path,
    allwise_out: &Path,
    out: &Path,
) -> [MatchJob; 2] {
    let radius_arcsec = config.matcher.radius_arcsec;
    [
        MatchJob::Cds(CdsMatch {
            input: input.to_path_buf(),
            cds_table: ALLWISE_TABLE.to_string(),
            radius_arcsec,
            suffix: ALLWISE_SUFFIX.to_string(),
            format: config.format.clone(),
            out: allwise_out.to_path_buf(),
        }),
        MatchJob::Cds(CdsMatch {
            input: allwise_out.to_path_buf(),
            cds_table: GAIA_TABLE.to_string(),
            radius_arcsec,
            suffix: GAIA_SUFFIX.to_string(),
            format: config.format.clone(),
            out: out.to_path_buf(),
        }),
    ]
}

// ---------------------------------------------------------------------------
// Matchers
// ---------------------------------------------------------------------------

/// Executes a cross-match job, writing the joined table to `job.output()`.
pub trait CrossMatcher {
    fn run(&self, job: &MatchJob) -> Result<(), MatchError>;
}

impl<M: CrossMatcher + ?Sized> CrossMatcher for &M {
    fn run(&self, job: &MatchJob) -> Result<(), MatchError> {
        (**self).run(job)
    }
}

/// Run `job` and make sure it wrote its output. An output left by an
/// earlier run is removed first, so an existing file afterwards is fresh.
pub fn cross_match<M: CrossMatcher + ?Sized>(matcher: &M, job: &MatchJob) -> Result<(), MatchError> {
    let output = job.output();
    if output.exists() {
        log::debug!("removing previous {}", output.display());
        std::fs::remove_file(output).map_err(|source| MatchError::StaleOutput {
            path: output.to_path_buf(),
            source,
        })?;
    }
    log::info!("running {job}");
    matcher.run(job)?;
    if !job.output().exists() {
        return Err(MatchError::MissingOutput {
            job: job.to_string(),
            path: job.output().to_path_buf(),
        });
    }
    log::info!("wrote {}", job.output().display());
    Ok(())
}

/// The STILTS command-line tool.
#[derive(Debug, Clone)]
pub struct Stilts {
    /// Program plus leading arguments, e.g. `java -jar stilts.jar`.
    command: Vec<String>,
}

impl Stilts {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Tool arguments for `job`, after the command prefix. Values are passed
    /// without a shell, so no quoting is applied.
    pub fn arguments(job: &MatchJob) -> Vec<String> {
        match job {
            MatchJob::SkyErr(m) => vec![
                "tmatch2".to_string(),
                format!("in1={}", m.in1.display()),
                format!("in2={}", m.in2.display()),
                format!("ifmt1={}", m.format),
                format!("ifmt2={}", m.format2),
                "matcher=skyerr".to_string(),
                "find=best1".to_string(),
                format!("params={}", m.max_error),
                format!("values1={}", m.values1),
                format!("values2={}", m.values2),
                "suffix1=".to_string(),
                format!("suffix2={}", m.suffix2),
                "join=1and2".to_string(),
                format!("out={}", m.out.display()),
                format!("ofmt={}", m.format),
            ],
            MatchJob::Cds(m) => vec![
                "cdsskymatch".to_string(),
                format!("cdstable={}", m.cds_table),
                format!("in={}", m.input.display()),
                format!("ifmt={}", m.format),
                format!("radius={}", m.radius_arcsec),
                format!("ra={RA_BEST}"),
                format!("dec={DEC_BEST}"),
                "find=each".to_string(),
                "omode=out".to_string(),
                "fixcols=all".to_string(),
                "suffixin=".to_string(),
                format!("suffixremote={}", m.suffix),
                format!("out={}", m.out.display()),
                format!("ofmt={}", m.format),
            ],
        }
    }
}

impl CrossMatcher for Stilts {
    fn run(&self, job: &MatchJob) -> Result<(), MatchError> {
        let Some((program, prefix)) = self.command.split_first() else {
            return Err(MatchError::Other {
                job: job.to_string(),
                message: "empty matcher command".to_string(),
            });
        };
        let args = Self::arguments(job);
        log::debug!("{} {} {}", program, prefix.join(" "), args.join(" "));

        let status = Command::new(program)
            .args(prefix)
            .args(&args)
            .status()
            .map_err(|source| MatchError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(MatchError::Failed {
                job: job.to_string(),
                status,
            });
        }
        Ok(())
    }
}
