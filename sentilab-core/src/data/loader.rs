//! Bar series loader: `RawTable` → validated, time-ordered `BarSeries`.
//!
//! Rows with a missing value in any required field are dropped and counted.
//! Anything present but unreadable is a `SchemaError` naming the column and
//! source row. Order is checked after dropping, so a duplicate or backwards
//! timestamp is reported against the row it came from.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::schema::{resolve, ColumnMapping, Field, ResolvedColumns};
use super::table::{Cell, RawColumn, RawTable};
use crate::domain::{Bar, BarSeries};
use crate::error::SchemaError;

/// Epoch numbers below this are seconds, at or above it milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Loader output: the bars plus what was resolved and dropped on the way.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub bars: BarSeries,
    pub dropped_rows: usize,
    pub columns: ResolvedColumns,
}

/// Turn `table` into bars using `mapping` overrides and the alias table.
pub fn load_bars(table: &RawTable, mapping: &ColumnMapping) -> Result<LoadedBars, SchemaError> {
    let columns = resolve(table, mapping)?;
    let lookup = |field: Field| column_for(table, &columns, field);
    let required = |field: Field| {
        lookup(field).ok_or_else(|| SchemaError::MissingColumn {
            field: field.as_str(),
            tried: field.aliases().iter().map(|a| a.to_string()).collect(),
        })
    };

    let timestamp = required(Field::Timestamp)?;
    let open = required(Field::Open)?;
    let high = required(Field::High)?;
    let low = required(Field::Low)?;
    let close = required(Field::Close)?;
    let volume = required(Field::Volume)?;
    let signal = required(Field::SignalLevel)?;
    let polarity = lookup(Field::Polarity);
    let intensity = lookup(Field::Intensity);
    let dominance = lookup(Field::Dominance);
    let required_columns = [timestamp, open, high, low, close, volume, signal];

    let mut bars = Vec::with_capacity(table.height());
    let mut source_rows = Vec::with_capacity(table.height());
    let mut dropped_rows = 0;

    for row in 0..table.height() {
        if required_columns.iter().any(|c| c.cells[row].is_missing()) {
            dropped_rows += 1;
            continue;
        }
        bars.push(Bar {
            timestamp: timestamp_cell(timestamp, row)?,
            open: number_cell(open, row)?,
            high: number_cell(high, row)?,
            low: number_cell(low, row)?,
            close: number_cell(close, row)?,
            volume: number_cell(volume, row)?,
            signal_level: number_cell(signal, row)?,
            polarity: optional_cell(polarity, row)?,
            intensity: optional_cell(intensity, row)?,
            dominance: optional_cell(dominance, row)?,
        });
        source_rows.push(row);
    }

    if dropped_rows > 0 {
        tracing::warn!(
            dropped_rows,
            total_rows = table.height(),
            "dropped rows with missing required values"
        );
    }

    let bars = BarSeries::new(bars).map_err(|e| to_source_row(e, &source_rows))?;
    log_summary(&bars);
    Ok(LoadedBars {
        bars,
        dropped_rows,
        columns,
    })
}

/// Parse the timestamp spellings found in exported feature tables.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn column_for<'t>(
    table: &'t RawTable,
    columns: &ResolvedColumns,
    field: Field,
) -> Option<&'t RawColumn> {
    columns.get(field).and_then(|name| table.column(name))
}

fn epoch_to_timestamp(value: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() < EPOCH_MILLIS_THRESHOLD {
        value * 1000.0
    } else {
        value
    };
    DateTime::from_timestamp_millis(millis.round() as i64).map(|dt| dt.naive_utc())
}

fn invalid_value(column: &RawColumn, row: usize, expected: &'static str) -> SchemaError {
    let value = match &column.cells[row] {
        Cell::Null => "null".to_string(),
        Cell::Number(v) => v.to_string(),
        Cell::Text(s) => s.clone(),
        Cell::Timestamp(ts) => ts.to_string(),
    };
    SchemaError::InvalidValue {
        column: column.name.clone(),
        row,
        value,
        expected,
    }
}

fn timestamp_cell(column: &RawColumn, row: usize) -> Result<NaiveDateTime, SchemaError> {
    let parsed = match &column.cells[row] {
        Cell::Timestamp(ts) => Some(*ts),
        Cell::Text(s) => parse_timestamp(s),
        Cell::Number(v) => epoch_to_timestamp(*v),
        Cell::Null => None,
    };
    parsed.ok_or_else(|| invalid_value(column, row, "a timestamp"))
}

fn number_cell(column: &RawColumn, row: usize) -> Result<f64, SchemaError> {
    let parsed = match &column.cells[row] {
        Cell::Number(v) => Some(*v),
        Cell::Text(s) => s.trim().parse::<f64>().ok(),
        Cell::Null | Cell::Timestamp(_) => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid_value(column, row, "a finite number"))
}

fn optional_cell(column: Option<&RawColumn>, row: usize) -> Result<Option<f64>, SchemaError> {
    match column {
        Some(c) if !c.cells[row].is_missing() => number_cell(c, row).map(Some),
        _ => Ok(None),
    }
}

fn to_source_row(err: SchemaError, source_rows: &[usize]) -> SchemaError {
    let source = |row: usize| source_rows.get(row).copied().unwrap_or(row);
    match err {
        SchemaError::DuplicateTimestamp { row, timestamp } => SchemaError::DuplicateTimestamp {
            row: source(row),
            timestamp,
        },
        SchemaError::NonMonotonicTimestamp {
            row,
            previous,
            current,
        } => SchemaError::NonMonotonicTimestamp {
            row: source(row),
            previous,
            current,
        },
        other => other,
    }
}

fn log_summary(bars: &BarSeries) {
    let (Some(first), Some(last)) = (bars.first_timestamp(), bars.last_timestamp()) else {
        tracing::warn!("no usable rows in input");
        return;
    };
    let (signal_min, signal_max) = bars.signal_range().unwrap_or((f64::NAN, f64::NAN));
    tracing::info!(
        rows = bars.len(),
        %first,
        %last,
        signal_min,
        signal_max,
        "loaded bar series"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: [&str; 7] = ["datetime", "open", "high", "low", "close", "volume", "signal_level"];

    fn row(ts: &str, close: f64, signal: Cell) -> Vec<Cell> {
        vec![
            ts.into(),
            close.into(),
            (close + 1.0).into(),
            (close - 1.0).into(),
            close.into(),
            1_000.0.into(),
            signal,
        ]
    }

    #[test]
    fn loads_and_counts_dropped_rows() {
        let table = RawTable::from_rows(
            &HEADERS,
            vec![
                row("2024-01-02 09:00:00", 100.0, 5.0.into()),
                row("2024-01-02 09:01:00", 101.0, Cell::Null),
                row("2024-01-02 09:02:00", 102.0, "nan".into()),
                row("2024-01-02 09:03:00", 103.0, 7.0.into()),
            ],
        )
        .unwrap();
        let loaded = load_bars(&table, &ColumnMapping::new()).unwrap();
        assert_eq!(loaded.bars.len(), 2);
        assert_eq!(loaded.dropped_rows, 2);
        assert_eq!(loaded.bars.get(1).unwrap().signal_level, 7.0);
        assert_eq!(loaded.bars.get(0).unwrap().polarity, None);
    }

    #[test]
    fn duplicate_reported_at_source_row() {
        let table = RawTable::from_rows(
            &HEADERS,
            vec![
                row("2024-01-02 09:00:00", 100.0, 5.0.into()),
                row("2024-01-02 09:01:00", 101.0, Cell::Null),
                row("2024-01-02 09:02:00", 102.0, 5.0.into()),
                row("2024-01-02 09:02:00", 103.0, 5.0.into()),
            ],
        )
        .unwrap();
        let err = load_bars(&table, &ColumnMapping::new()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTimestamp { row: 3, .. }));
    }

    #[test]
    fn unreadable_number_names_the_column() {
        let table = RawTable::from_rows(
            &HEADERS,
            vec![row("2024-01-02 09:00:00", 100.0, "high".into())],
        )
        .unwrap();
        match load_bars(&table, &ColumnMapping::new()).unwrap_err() {
            SchemaError::InvalidValue { column, row, .. } => {
                assert_eq!(column, "signal_level");
                assert_eq!(row, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn does_not_mutate_input() {
        let table = RawTable::from_rows(
            &HEADERS,
            vec![row("2024-01-02 09:00:00", 100.0, Cell::Null)],
        )
        .unwrap();
        let before = table.clone();
        let _ = load_bars(&table, &ColumnMapping::new());
        assert_eq!(table, before);
    }

    #[test]
    fn timestamp_spellings() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        for raw in [
            "2024-01-02 09:30:00",
            "2024-01-02T09:30:00",
            "2024/01/02 09:30",
            "2024-01-02 09:30:00.000",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(
            parse_timestamp("2024-01-02"),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn epoch_seconds_and_millis() {
        let secs = epoch_to_timestamp(1_704_186_000.0).unwrap();
        let millis = epoch_to_timestamp(1_704_186_000_000.0).unwrap();
        assert_eq!(secs, millis);
    }
}
