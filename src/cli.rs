//! CLI argument definitions for xclass

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use xclass::Stage;
use xclass::config::DEFAULT_FLUX_COLUMN;

#[derive(Parser)]
#[command(name = "xclass")]
#[command(about = "Build labelled training catalogues for X-ray source classification")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stack, cross-match and compute features for a training-set version
    Run(RunArgs),

    /// Only read and stack the labelled catalogues
    Stack(StackArgs),

    /// Compute features of an already cross-matched table
    Features(FeaturesArgs),

    /// Print row count, columns and label counts of a table as JSON
    Summary(SummaryArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Pipeline configuration (TOML)
    #[arg(long)]
    pub config: PathBuf,

    /// Training-set version (defaults to the one named in the config)
    #[arg(long = "training-set")]
    pub training_set: Option<String>,

    /// First stage to run; earlier stages reuse files of a previous run
    #[arg(long, value_enum, default_value = "stack")]
    pub from: Stage,
}

#[derive(Parser)]
pub struct StackArgs {
    /// Pipeline configuration (TOML)
    #[arg(long)]
    pub config: PathBuf,

    /// Training-set version (defaults to the one named in the config)
    #[arg(long = "training-set")]
    pub training_set: Option<String>,
}

#[derive(Parser)]
pub struct FeaturesArgs {
    /// Cross-matched table with X-ray, AllWISE and Gaia columns
    #[arg(long)]
    pub input: PathBuf,

    /// Output feature table (.parquet or .csv)
    #[arg(long)]
    pub output: PathBuf,

    /// X-ray flux column copied into `Fx`
    #[arg(long, default_value = DEFAULT_FLUX_COLUMN)]
    pub flux_column: String,
}

#[derive(Parser)]
pub struct SummaryArgs {
    /// Table to describe
    #[arg(long)]
    pub input: PathBuf,

    /// Also print the first N rows
    #[arg(long)]
    pub head: Option<usize>,
}
