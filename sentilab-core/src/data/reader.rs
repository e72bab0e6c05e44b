//! File readers (CSV, Parquet) via Polars, producing a `RawTable`.

use std::fs;
use std::path::Path;

use polars::prelude::*;

use super::table::{Cell, RawColumn, RawTable};
use crate::error::SchemaError;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported input format `{extension}` ({hint})")]
    UnsupportedFormat {
        extension: String,
        hint: &'static str,
    },

    #[error("failed to read {path}: {message}")]
    Polars { path: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Read a CSV or Parquet file, chosen by extension.
pub fn read_table(path: &Path) -> Result<RawTable, ReadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => read_csv(path),
        "parquet" | "pq" => read_parquet(path),
        "xlsx" | "xls" => Err(ReadError::UnsupportedFormat {
            extension,
            hint: "export the sheet to CSV",
        }),
        _ => Err(ReadError::UnsupportedFormat {
            extension,
            hint: "expected .csv or .parquet",
        }),
    }
}

pub fn read_csv(path: &Path) -> Result<RawTable, ReadError> {
    let polars_err = |e: PolarsError| ReadError::Polars {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .map_err(polars_err)?
        .collect()
        .map_err(polars_err)?;
    dataframe_to_table(&df, path)
}

pub fn read_parquet(path: &Path) -> Result<RawTable, ReadError> {
    let file = fs::File::open(path).map_err(|source| ReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| ReadError::Polars {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    dataframe_to_table(&df, path)
}

/// Text stays text, dates become their string form, everything else is
/// cast to `f64`.
fn dataframe_to_table(df: &DataFrame, path: &Path) -> Result<RawTable, ReadError> {
    let polars_err = |e: PolarsError| ReadError::Polars {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut columns = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let name = column.name().to_string();
        let cells: Vec<Cell> = match column.dtype() {
            DataType::String => string_cells(column).map_err(polars_err)?,
            DataType::Date | DataType::Datetime(_, _) => {
                let as_text = column.cast(&DataType::String).map_err(polars_err)?;
                string_cells(&as_text).map_err(polars_err)?
            }
            _ => {
                let as_float = column.cast(&DataType::Float64).map_err(polars_err)?;
                as_float
                    .f64()
                    .map_err(polars_err)?
                    .into_iter()
                    .map(|v| v.map_or(Cell::Null, Cell::Number))
                    .collect()
            }
        };
        columns.push(RawColumn::new(name, cells));
    }

    tracing::debug!(path = %path.display(), rows = df.height(), columns = df.width(), "read table");
    Ok(RawTable::new(columns)?)
}

fn string_cells(column: &Column) -> PolarsResult<Vec<Cell>> {
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map_or(Cell::Null, Cell::text))
        .collect())
}
