//! Pipeline configuration loaded from a TOML file.
//!
//! A file holds any number of training-set versions; each version is an
//! ordered list of labelled input catalogues.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// X-ray flux column copied into `Fx` unless configured otherwise.
pub const DEFAULT_FLUX_COLUMN: &str = "SC_EP_8_FLUX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown training-set version '{0}'")]
    UnknownVersion(String),

    #[error("training-set version '{0}' lists no catalogues")]
    EmptyTrainingSet(String),

    #[error("label '{label}' appears more than once in version '{version}'")]
    DuplicateLabel { version: String, label: String },

    #[error("matcher command is empty")]
    EmptyMatcherCommand,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Training-set version used when none is given on the command line.
    pub version: String,
    /// Directory receiving the per-run tables.
    pub data_dir: PathBuf,
    /// File extension (and format) of the per-run tables.
    pub format: String,
    pub matcher: MatcherConfig,
    pub xray: XrayConfig,
    pub versions: BTreeMap<String, TrainingSet>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "v0001".to_string(),
            data_dir: PathBuf::from("../data"),
            format: "parquet".to_string(),
            matcher: MatcherConfig::default(),
            xray: XrayConfig::default(),
            versions: BTreeMap::new(),
        }
    }
}

/// External cross-match tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Program and leading arguments, e.g. `["java", "-jar", "stilts.jar"]`.
    pub command: Vec<String>,
    /// Search radius of the AllWISE and Gaia joins, arcsec.
    pub radius_arcsec: f64,
    /// Largest positional error considered by the X-ray join, arcsec.
    pub xray_max_error: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "java".to_string(),
                "-jar".to_string(),
                "../data/tools/stilts.jar".to_string(),
            ],
            radius_arcsec: 3.0,
            xray_max_error: 10.0,
        }
    }
}

/// The X-ray reference catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XrayConfig {
    pub path: PathBuf,
    /// RA, Dec and positional-error columns of the X-ray catalogue.
    pub values: String,
    /// RA, Dec and positional error of the stacked training table.
    pub training_values: String,
    /// Suffix given to clashing X-ray column names.
    pub suffix: String,
    /// Column copied into the `Fx` feature.
    pub flux_column: String,
}

impl Default for XrayConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("../data/cats/4XMM_slim_DR13cat_v1.0.parquet"),
            values: "SC_RA SC_DEC 5".to_string(),
            training_values: "RA_BEST DEC_BEST 1".to_string(),
            suffix: "XMM_".to_string(),
            flux_column: DEFAULT_FLUX_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSet {
    /// Stacking order is list order.
    pub catalogues: Vec<CatalogueSpec>,
}

/// One labelled input catalogue and the names of its position columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueSpec {
    pub label: String,
    pub path: PathBuf,
    pub ra_column: String,
    pub dec_column: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        if config.matcher.command.is_empty() {
            return Err(ConfigError::EmptyMatcherCommand);
        }
        Ok(config)
    }

    /// The catalogues of `version`, checked for emptiness and label clashes.
    pub fn training_set(&self, version: &str) -> Result<&TrainingSet, ConfigError> {
        let set = self
            .versions
            .get(version)
            .ok_or_else(|| ConfigError::UnknownVersion(version.to_string()))?;

        if set.catalogues.is_empty() {
            return Err(ConfigError::EmptyTrainingSet(version.to_string()));
        }

        let mut seen = HashSet::new();
        for cat in &set.catalogues {
            if !seen.insert(cat.label.as_str()) {
                return Err(ConfigError::DuplicateLabel {
                    version: version.to_string(),
                    label: cat.label.clone(),
                });
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = "v0002"
data_dir = "out"

[matcher]
command = ["stilts"]

[xray]
path = "xmm.parquet"

[[versions.v0002.catalogues]]
label = "QSO"
path = "milliquas.parquet"
ra_column = "RA"
dec_column = "DEC"

[[versions.v0002.catalogues]]
label = "STAR"
path = "stars.csv"
ra_column = "ra"
dec_column = "dec"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.version, "v0002");
        assert_eq!(cfg.format, "parquet");
        assert_eq!(cfg.matcher.command, ["stilts"]);
        assert_eq!(cfg.matcher.radius_arcsec, 3.0);
        assert_eq!(cfg.xray.path, PathBuf::from("xmm.parquet"));
        assert_eq!(cfg.xray.flux_column, DEFAULT_FLUX_COLUMN);
        assert_eq!(DEFAULT_FLUX_COLUMN, "SC_EP_8_FLUX");

        let set = cfg.training_set("v0002").unwrap();
        let labels: Vec<&str> = set.catalogues.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["QSO", "STAR"]);
        assert_eq!(set.catalogues[1].ra_column, "ra");
    }

    #[test]
    fn unknown_version() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        assert!(matches!(
            cfg.training_set("v9999"),
            Err(ConfigError::UnknownVersion(v)) if v == "v9999"
        ));
    }

    #[test]
    fn duplicate_label() {
        let text = SAMPLE.replace("label = \"STAR\"", "label = \"QSO\"");
        let cfg = Config::from_toml_str(&text).unwrap();
        assert!(matches!(
            cfg.training_set("v0002"),
            Err(ConfigError::DuplicateLabel { label, .. }) if label == "QSO"
        ));
    }

    #[test]
    fn empty_training_set() {
        let cfg = Config::from_toml_str("[versions.v0001]\ncatalogues = []\n").unwrap();
        assert!(matches!(
            cfg.training_set("v0001"),
            Err(ConfigError::EmptyTrainingSet(_))
        ));
    }

    #[test]
    fn empty_matcher_command() {
        let err = Config::from_toml_str("[matcher]\ncommand = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyMatcherCommand));
    }

    #[test]
    fn missing_catalogue_field_is_a_parse_error() {
        let text = "[[versions.v1.catalogues]]\nlabel = \"QSO\"\npath = \"a.csv\"\n";
        assert!(matches!(Config::from_toml_str(text), Err(ConfigError::Toml(_))));
    }
}
