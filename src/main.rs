mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use cli::{Cli, Commands, FeaturesArgs, RunArgs, StackArgs, SummaryArgs};
use xclass::data::loader::{load_table, to_record_batch, write_table};
use xclass::data::model::TableSummary;
use xclass::pipeline::features::compute_features;
use xclass::pipeline::reader::LABEL;
use xclass::{Config, Pipeline, Stilts};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match &cli.command {
        Commands::Run(args) => run(args),
        Commands::Stack(args) => stack(args),
        Commands::Features(args) => features(args),
        Commands::Summary(args) => summary(args),
    }
}

fn load_config(path: &Path, version: Option<&str>) -> Result<(Config, String)> {
    let config =
        Config::load(path).with_context(|| format!("loading config {}", path.display()))?;
    let version = version.unwrap_or(&config.version).to_string();
    Ok((config, version))
}

fn run(args: &RunArgs) -> Result<()> {
    let (config, version) = load_config(&args.config, args.training_set.as_deref())?;
    let matcher = Stilts::new(config.matcher.command.clone());
    let pipeline = Pipeline::new(&config, &version, matcher)?;
    let table = pipeline.run(args.from)?;
    println!(
        "{} rows → {}",
        table.len(),
        pipeline.paths().features.display()
    );
    Ok(())
}

fn stack(args: &StackArgs) -> Result<()> {
    let (config, version) = load_config(&args.config, args.training_set.as_deref())?;
    let matcher = Stilts::new(config.matcher.command.clone());
    let pipeline = Pipeline::new(&config, &version, matcher)?;
    let table = pipeline.stack()?;
    println!(
        "{} rows → {}",
        table.len(),
        pipeline.paths().stacked.display()
    );
    Ok(())
}

fn features(args: &FeaturesArgs) -> Result<()> {
    let matched = load_table(&args.input)?;
    let table = compute_features(matched, &args.flux_column).context("computing features")?;
    write_table(&args.output, &table)?;
    println!("{} rows → {}", table.len(), args.output.display());
    Ok(())
}

fn summary(args: &SummaryArgs) -> Result<()> {
    let table = load_table(&args.input)?;
    let summary = TableSummary::new(&table, LABEL);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(n) = args.head {
        if table.num_columns() > 0 {
            let batch = to_record_batch(&table)?;
            let head = batch.slice(0, n.min(batch.num_rows()));
            println!("{}", arrow::util::pretty::pretty_format_batches(&[head])?);
        }
    }
    Ok(())
}
