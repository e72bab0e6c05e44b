//! RawTable: a neutral, column-oriented view of an input file.
//!
//! Readers (CSV, Parquet) produce a `RawTable`; the loader consumes it. The
//! loader never mutates the table it is given.

use chrono::NaiveDateTime;

use crate::error::SchemaError;

/// One input cell, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Missing in any of the ways a spreadsheet export spells it.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(v) => v.is_nan(),
            Self::Text(s) => {
                let s = s.trim();
                s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null")
            }
            Self::Timestamp(_) => false,
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(ts: NaiveDateTime) -> Self {
        Self::Timestamp(ts)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// Named columns of equal height.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    columns: Vec<RawColumn>,
    height: usize,
}

impl RawTable {
    /// Every column must have as many cells as the first one.
    pub fn new(columns: Vec<RawColumn>) -> Result<Self, SchemaError> {
        let height = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.cells.len() != height) {
            return Err(SchemaError::RaggedColumn {
                column: bad.name.clone(),
                expected: height,
                actual: bad.cells.len(),
            });
        }
        Ok(Self { columns, height })
    }

    /// Build from a header row and row-major records.
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<Cell>>) -> Result<Self, SchemaError> {
        let mut columns: Vec<RawColumn> = headers
            .iter()
            .map(|h| RawColumn::new(*h, Vec::with_capacity(rows.len())))
            .collect();
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(SchemaError::RaggedColumn {
                    column: format!("row {row_index}"),
                    expected: headers.len(),
                    actual: row.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.cells.push(cell);
            }
        }
        Self::new(columns)
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_columns() {
        let err = RawTable::new(vec![
            RawColumn::new("open", vec![1.0.into(), 2.0.into()]),
            RawColumn::new("close", vec![1.0.into()]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::RaggedColumn {
                column: "close".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn from_rows_transposes() {
        let table = RawTable::from_rows(
            &["a", "b"],
            vec![vec![1.0.into(), "x".into()], vec![2.0.into(), Cell::Null]],
        )
        .unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.width(), 2);
        assert_eq!(table.column("b").unwrap().cells[1], Cell::Null);
    }

    #[test]
    fn missing_cells() {
        assert!(Cell::Null.is_missing());
        assert!(Cell::Number(f64::NAN).is_missing());
        assert!(Cell::text(" NaN ").is_missing());
        assert!(Cell::text("").is_missing());
        assert!(!Cell::Number(0.0).is_missing());
        assert!(!Cell::text("1.5").is_missing());
    }
}
