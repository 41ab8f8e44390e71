//! Training-catalogue pipeline.
//!
//! ```text
//!  labelled catalogues (config)
//!        │  reader: RA_BEST, DEC_BEST, LABEL
//!        ▼
//!   ┌──────────┐
//!   │  stack    │  → train_<ver>
//!   └──────────┘
//!        │  crossmatch: X-ray (skyerr, best match)
//!        ▼
//!   ┌──────────┐
//!   │  xray     │  → train_<ver>_xray
//!   └──────────┘
//!        │  crossmatch: AllWISE, then Gaia (3", each)
//!        ▼
//!   ┌────────────────┐
//!   │ multiwavelength │  → train_<ver>_xray_w_multiwavelength
//!   └────────────────┘
//!        │  features
//!        ▼
//!     train_<ver>_features
//! ```
//!
//! Stages hand over through files; a failed stage stops the run.

pub mod crossmatch;
pub mod features;
pub mod reader;
pub mod stack;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{Config, TrainingSet};
use crate::data::loader::{load_table, write_table};
use crate::data::model::Table;
use crossmatch::{CrossMatcher, cross_match, multiwavelength_jobs, xray_job};
use features::compute_features;
use reader::read_catalogue;
use stack::stack_catalogues;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Stage {
    Stack,
    Xray,
    Multiwavelength,
    Features,
}

/// The files one run of a training-set version reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub stacked: PathBuf,
    pub xray: PathBuf,
    pub allwise: PathBuf,
    pub multiwavelength: PathBuf,
    pub features: PathBuf,
}

impl RunPaths {
    pub fn new(data_dir: &Path, version: &str, format: &str) -> Self {
        let file = |stem: &str| data_dir.join(format!("train_{version}{stem}.{format}"));
        Self {
            stacked: file(""),
            xray: file("_xray"),
            allwise: file("_xray_allwise"),
            multiwavelength: file("_xray_w_multiwavelength"),
            features: file("_features"),
        }
    }
}

/// One configured run: a training-set version plus the matcher to use.
pub struct Pipeline<'a, M: CrossMatcher> {
    config: &'a Config,
    version: String,
    training_set: &'a TrainingSet,
    paths: RunPaths,
    matcher: M,
}

impl<'a, M: CrossMatcher> Pipeline<'a, M> {
    pub fn new(config: &'a Config, version: &str, matcher: M) -> Result<Self> {
        let training_set = config.training_set(version)?;
        let paths = RunPaths::new(&config.data_dir, version, &config.format);
        Ok(Self {
            config,
            version: version.to_string(),
            training_set,
            paths,
            matcher,
        })
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// Run every stage from `from` onwards and return the feature table.
    /// Stages before `from` must have left their files from an earlier run.
    pub fn run(&self, from: Stage) -> Result<Table> {
        log::info!("building training set {} from stage {from:?}", self.version);
        if from <= Stage::Stack {
            self.stack()?;
        }
        if from <= Stage::Xray {
            self.add_xray_counterparts()?;
        }
        if from <= Stage::Multiwavelength {
            self.add_multiwavelength_counterparts()?;
        }
        self.features()
    }

    /// Read every labelled catalogue and write the stacked training table.
    pub fn stack(&self) -> Result<Table> {
        if let Some(parent) = self.paths.stacked.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let tables = self
            .training_set
            .catalogues
            .iter()
            .map(read_catalogue)
            .collect::<Result<Vec<_>>>()?;
        stack_catalogues(&tables, &self.paths.stacked)
    }

    pub fn add_xray_counterparts(&self) -> Result<()> {
        let job = xray_job(self.config, &self.paths.stacked, &self.paths.xray);
        cross_match(&self.matcher, &job).context("X-ray cross-match")?;
        Ok(())
    }

    pub fn add_multiwavelength_counterparts(&self) -> Result<()> {
        let jobs = multiwavelength_jobs(
            self.config,
            &self.paths.xray,
            &self.paths.allwise,
            &self.paths.multiwavelength,
        );
        for job in &jobs {
            cross_match(&self.matcher, job).context("multi-wavelength cross-match")?;
        }
        Ok(())
    }

    /// Compute features from the multi-wavelength table and write them.
    pub fn features(&self) -> Result<Table> {
        let matched = load_table(&self.paths.multiwavelength)?;
        let table = compute_features(matched, &self.config.xray.flux_column)
            .context("computing features")?;
        write_table(&self.paths.features, &table)?;
        log::info!(
            "wrote {} feature rows → {}",
            table.len(),
            self.paths.features.display()
        );
        Ok(table)
    }
}
