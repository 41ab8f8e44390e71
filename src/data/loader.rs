use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int64Array, StringArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnKind, Table};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a catalogue from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – any flat schema (recommended, what the cross-matcher writes)
/// * `.csv`     – header row, one catalogue row per line
/// * `.json`    – `[{ "RA": 10.1, "DEC": -3.2, ... }, ...]`
pub fn load_table(path: &Path) -> Result<Table> {
    let loaded = match extension(path).as_str() {
        "parquet" | "pq" => load_parquet(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    };
    loaded.with_context(|| format!("loading {}", path.display()))
}

/// Write a table, overwriting any existing file.  Dispatch by extension.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let written = match extension(path).as_str() {
        "parquet" | "pq" => write_parquet(path, table),
        "csv" => write_csv(path, table),
        other => bail!("Unsupported output extension: .{other}"),
    };
    written.with_context(|| format!("writing {}", path.display()))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Cell – one value of a row-oriented input (CSV, JSON)
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, used while the kind of a column is unknown.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    fn guess(s: &str) -> Cell {
        let s = s.trim();
        if s.is_empty() {
            return Cell::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Cell::Float(f);
        }
        Cell::Text(s.to_string())
    }

    fn from_json(val: &JsonValue) -> Cell {
        match val {
            JsonValue::Null => Cell::Null,
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Cell::Float(f)
                } else {
                    Cell::Text(n.to_string())
                }
            }
            JsonValue::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    fn to_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) => Some(f.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

/// Narrowest column kind that holds every cell: all-int → Int,
/// all-numeric → Float, anything else → Text.
fn column_from_cells(cells: Vec<Cell>) -> Column {
    let any_text = cells.iter().any(|c| matches!(c, Cell::Text(_)));
    let any_float = cells.iter().any(|c| matches!(c, Cell::Float(_)));

    if any_text {
        Column::Text(cells.iter().map(Cell::to_text).collect())
    } else if any_float {
        Column::Float(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Int(i) => *i as f64,
                    Cell::Float(f) => *f,
                    _ => f64::NAN,
                })
                .collect(),
        )
    } else {
        Column::Int(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Int(i) => Some(*i),
                    _ => None,
                })
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but {} columns",
                record.len(),
                headers.len()
            );
        }
        for (col, value) in record.iter().enumerate() {
            cells[col].push(Cell::guess(value));
        }
    }

    let table = Table::from_columns(
        headers
            .into_iter()
            .zip(cells)
            .map(|(name, col)| (name, column_from_cells(col))),
    )?;
    Ok(table)
}

fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(table.column_names())?;

    let columns: Vec<&Column> = table.iter().map(|(_, c)| c).collect();
    for row in 0..table.len() {
        let record: Vec<String> = columns
            .iter()
            .map(|col| match col {
                Column::Float(v) => v[row].to_string(),
                Column::Int(v) => v[row].map(|i| i.to_string()).unwrap_or_default(),
                Column::Text(v) => v[row].clone().unwrap_or_default(),
            })
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Keys missing
/// from a record are null on that row.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let mut table = Table::new();
    for name in names {
        let cells = records
            .iter()
            .map(|rec| rec.get(&name).map(Cell::from_json).unwrap_or(Cell::Null))
            .collect();
        table.set_column(name, column_from_cells(cells))?;
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Load every record batch of a Parquet file into one table.
///
/// Numeric and boolean columns become floats (integers stay integers),
/// strings become text, and anything else that Arrow can render as a
/// string is kept as text. Remaining columns are skipped.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    let kinds: Vec<Option<ColumnKind>> = schema
        .fields()
        .iter()
        .map(|f| {
            let kind = kind_for(f.data_type());
            if kind.is_none() {
                log::warn!(
                    "{}: skipping column '{}' of unsupported type {:?}",
                    path.display(),
                    f.name(),
                    f.data_type()
                );
            }
            kind
        })
        .collect();

    let mut parts = Vec::new();
    let reader = builder.build().context("building parquet reader")?;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let mut part = Table::new();
        for (idx, field) in schema.fields().iter().enumerate() {
            if let Some(kind) = kinds[idx] {
                let column = column_from_array(batch.column(idx), kind)
                    .with_context(|| format!("converting column '{}'", field.name()))?;
                part.set_column(field.name().clone(), column)?;
            }
        }
        parts.push(part);
    }

    if parts.is_empty() {
        // No batches: keep the schema with zero rows.
        let mut empty = Table::new();
        for (field, kind) in schema.fields().iter().zip(&kinds) {
            let column = match kind {
                Some(ColumnKind::Float) => Column::Float(Vec::new()),
                Some(ColumnKind::Int) => Column::Int(Vec::new()),
                Some(ColumnKind::Text) => Column::Text(Vec::new()),
                None => continue,
            };
            empty.set_column(field.name().clone(), column)?;
        }
        return Ok(empty);
    }

    Ok(Table::vstack(&parts)?)
}

fn kind_for(data_type: &DataType) -> Option<ColumnKind> {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => Some(ColumnKind::Int),
        DataType::UInt64
        | DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(..)
        | DataType::Decimal256(..)
        | DataType::Boolean => Some(ColumnKind::Float),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Some(ColumnKind::Text),
        other if can_cast_types(other, &DataType::Utf8) => Some(ColumnKind::Text),
        _ => None,
    }
}

fn column_from_array(array: &ArrayRef, kind: ColumnKind) -> Result<Column> {
    let column = match kind {
        ColumnKind::Float => {
            let converted = cast(array, &DataType::Float64)?;
            let values = converted.as_primitive::<Float64Type>();
            Column::Float(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        }
        ColumnKind::Int => {
            let converted = cast(array, &DataType::Int64)?;
            Column::Int(converted.as_primitive::<Int64Type>().iter().collect())
        }
        ColumnKind::Text => {
            let converted = cast(array, &DataType::Utf8)?;
            Column::Text(
                converted
                    .as_string::<i32>()
                    .iter()
                    .map(|v| v.map(str::to_string))
                    .collect(),
            )
        }
    };
    Ok(column)
}

/// Convert a table into a single Arrow record batch.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    if table.num_columns() == 0 {
        bail!("cannot build a record batch from a table without columns");
    }

    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());
    for (name, column) in table.iter() {
        let (data_type, array): (DataType, ArrayRef) = match column {
            Column::Float(v) => (DataType::Float64, Arc::new(Float64Array::from(v.clone()))),
            Column::Int(v) => (DataType::Int64, Arc::new(Int64Array::from(v.clone()))),
            Column::Text(v) => (DataType::Utf8, Arc::new(StringArray::from(v.clone()))),
        };
        fields.push(Field::new(name, data_type, array.null_count() > 0));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).context("building record batch")
}

fn write_parquet(path: &Path, table: &Table) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns([
            ("RA_BEST", Column::Float(vec![10.5, 200.25, f64::NAN])),
            ("N", Column::Int(vec![Some(1), None, Some(3)])),
            (
                "LABEL",
                Column::Text(vec![Some("QSO".into()), Some("STAR".into()), None]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn parquet_keeps_schema_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        write_table(&path, &sample()).unwrap();

        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.column_names(), ["RA_BEST", "N", "LABEL"]);
        let ra = loaded.float_column("RA_BEST").unwrap();
        assert_eq!(&ra[..2], &[10.5, 200.25]);
        assert!(ra[2].is_nan());
        assert_eq!(loaded.column("N").unwrap(), &Column::Int(vec![Some(1), None, Some(3)]));
        assert_eq!(loaded.text_column("LABEL").unwrap()[2], None);
    }

    #[test]
    fn parquet_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        write_table(&path, &sample()).unwrap();
        let small = sample().select(&["LABEL"]).unwrap();
        write_table(&path, &small).unwrap();
        assert_eq!(load_table(&path).unwrap().column_names(), ["LABEL"]);
    }

    #[test]
    fn csv_infers_column_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "name,ra,dec,z\nA,10,1.5,0.1\nB,11,,0.2\n").unwrap();

        let t = load_table(&path).unwrap();
        assert_eq!(t.column("name").unwrap().kind(), ColumnKind::Text);
        assert_eq!(t.column("ra").unwrap().kind(), ColumnKind::Int);
        let dec = t.float_column("dec").unwrap();
        assert_eq!(dec[0], 1.5);
        assert!(dec[1].is_nan());
    }

    #[test]
    fn csv_writes_what_it_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        write_table(&path, &sample()).unwrap();
        let t = load_table(&path).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.float_column("RA_BEST").unwrap()[1], 200.25);
        assert_eq!(t.text_column("LABEL").unwrap()[0].as_deref(), Some("QSO"));
    }

    #[test]
    fn json_records_fill_missing_keys_with_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        std::fs::write(&path, r#"[{"ra": 1.5, "id": "a"}, {"ra": 2, "dec": -4.0}]"#).unwrap();

        let t = load_table(&path).unwrap();
        assert_eq!(t.float_column("ra").unwrap(), vec![1.5, 2.0]);
        assert!(t.float_column("dec").unwrap()[0].is_nan());
        assert_eq!(t.text_column("id").unwrap()[1], None);
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let err = load_table(Path::new("catalogue.fits")).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }
}
