use std::path::Path;

use anyhow::{Context, Result};

use crate::data::loader::write_table;
use crate::data::model::Table;

/// Concatenate labelled catalogues in order and write the result to
/// `output`, replacing any existing file.
pub fn stack_catalogues(tables: &[Table], output: &Path) -> Result<Table> {
    let stacked = Table::vstack(tables).context("stacking labelled catalogues")?;
    write_table(output, &stacked)?;
    log::info!(
        "stacked {} catalogues, {} rows → {}",
        tables.len(),
        stacked.len(),
        output.display()
    );
    Ok(stacked)
}
