use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Schema-level failures of in-memory table operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' has {found} rows, table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot stack table {index}: expected columns [{expected}], found [{found}]")]
    SchemaMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("column '{column}' is {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: ColumnKind,
        found: ColumnKind,
    },
}

// ---------------------------------------------------------------------------
// Column – one named vector of cells
// ---------------------------------------------------------------------------

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Float,
    Int,
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Int => write!(f, "int"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// Column data. Missing floats are stored as NaN so arithmetic stays
/// elementwise without a separate validity mask.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Int(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Float(_) => ColumnKind::Float,
            Column::Int(_) => ColumnKind::Int,
            Column::Text(_) => ColumnKind::Text,
        }
    }

    /// A text column holding the same value on every row.
    pub fn repeat_text(value: &str, rows: usize) -> Self {
        Column::Text(vec![Some(value.to_string()); rows])
    }

    /// Append `other` to the end of this column. Kinds must already agree.
    fn extend(&mut self, other: &Column) {
        match (self, other) {
            (Column::Float(a), Column::Float(b)) => a.extend_from_slice(b),
            (Column::Int(a), Column::Int(b)) => a.extend_from_slice(b),
            (Column::Text(a), Column::Text(b)) => a.extend_from_slice(b),
            _ => unreachable!("column kinds are checked before extending"),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – ordered named columns of equal length
// ---------------------------------------------------------------------------

/// An in-memory catalogue: named columns in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, column)` pairs, checking lengths.
    pub fn from_columns<S: Into<String>>(
        columns: impl IntoIterator<Item = (S, Column)>,
    ) -> Result<Self, TableError> {
        let mut table = Table::new();
        for (name, column) in columns {
            table.set_column(name, column)?;
        }
        Ok(table)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Iterate over `(name, column)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.position(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Numeric view of a column. Integers are widened and nulls become NaN.
    pub fn float_column(&self, name: &str) -> Result<Vec<f64>, TableError> {
        match self.column(name)? {
            Column::Float(v) => Ok(v.clone()),
            Column::Int(v) => Ok(v
                .iter()
                .map(|x| x.map(|i| i as f64).unwrap_or(f64::NAN))
                .collect()),
            Column::Text(_) => Err(TableError::TypeMismatch {
                column: name.to_string(),
                expected: ColumnKind::Float,
                found: ColumnKind::Text,
            }),
        }
    }

    pub fn text_column(&self, name: &str) -> Result<&[Option<String>], TableError> {
        match self.column(name)? {
            Column::Text(v) => Ok(v),
            other => Err(TableError::TypeMismatch {
                column: name.to_string(),
                expected: ColumnKind::Text,
                found: other.kind(),
            }),
        }
    }

    /// Assign a column: replaces an existing column of the same name in
    /// place, otherwise appends it.
    pub fn set_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), TableError> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.len(),
                found: column.len(),
            });
        }
        match self.position(&name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Projection onto `names`, in that order.
    pub fn select(&self, names: &[&str]) -> Result<Table, TableError> {
        let mut out = Table::new();
        for &name in names {
            out.set_column(name, self.column(name)?.clone())?;
        }
        Ok(out)
    }

    /// Concatenate tables row-wise. Every part must share the first part's
    /// column names and kinds, in the same order.
    pub fn vstack(parts: &[Table]) -> Result<Table, TableError> {
        let Some((first, rest)) = parts.split_first() else {
            return Ok(Table::new());
        };
        let mut out = first.clone();
        for (offset, part) in rest.iter().enumerate() {
            if part.schema() != first.schema() {
                return Err(TableError::SchemaMismatch {
                    index: offset + 1,
                    expected: first.schema_string(),
                    found: part.schema_string(),
                });
            }
            for (dst, src) in out.columns.iter_mut().zip(&part.columns) {
                dst.extend(src);
            }
        }
        Ok(out)
    }

    fn schema(&self) -> Vec<(&str, ColumnKind)> {
        self.iter().map(|(n, c)| (n, c.kind())).collect()
    }

    fn schema_string(&self) -> String {
        self.schema()
            .iter()
            .map(|(n, k)| format!("{n}: {k}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Row counts per distinct value of a text column. Nulls are counted
    /// under `<null>`.
    pub fn value_counts(&self, name: &str) -> Result<BTreeMap<String, usize>, TableError> {
        let mut counts = BTreeMap::new();
        for value in self.text_column(name)? {
            let key = value.clone().unwrap_or_else(|| "<null>".to_string());
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

// ---------------------------------------------------------------------------
// TableSummary – what `xclass summary` prints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    /// Rows per class label, when the table carries a text label column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, usize>>,
}

impl TableSummary {
    pub fn new(table: &Table, label_column: &str) -> Self {
        TableSummary {
            rows: table.len(),
            columns: table.column_names().to_vec(),
            labels: table.value_counts(label_column).ok(),
        }
    }
}
