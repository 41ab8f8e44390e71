use anyhow::{Context, Result};

use crate::config::CatalogueSpec;
use crate::data::loader::load_table;
use crate::data::model::{Column, Table, TableError};

/// Canonical right ascension column of every training table.
pub const RA_BEST: &str = "RA_BEST";
/// Canonical declination column of every training table.
pub const DEC_BEST: &str = "DEC_BEST";
/// Class label column.
pub const LABEL: &str = "LABEL";

/// Load one input catalogue and reduce it to `RA_BEST`, `DEC_BEST`, `LABEL`.
pub fn read_catalogue(spec: &CatalogueSpec) -> Result<Table> {
    let table = load_table(&spec.path)?;
    let labelled = labelled_sources(&table, &spec.ra_column, &spec.dec_column, &spec.label)
        .with_context(|| {
            format!(
                "catalogue '{}' ({})",
                spec.label,
                spec.path.display()
            )
        })?;
    log::info!(
        "read {} {} sources from {}",
        labelled.len(),
        spec.label,
        spec.path.display()
    );
    Ok(labelled)
}

/// Copy the configured position columns under their canonical names and tag
/// every row with `label`. All other columns are dropped.
pub fn labelled_sources(
    table: &Table,
    ra_column: &str,
    dec_column: &str,
    label: &str,
) -> Result<Table, TableError> {
    let ra = table.float_column(ra_column)?;
    let dec = table.float_column(dec_column)?;
    let rows = ra.len();
    Table::from_columns([
        (RA_BEST, Column::Float(ra)),
        (DEC_BEST, Column::Float(dec)),
        (LABEL, Column::repeat_text(label, rows)),
    ])
}
