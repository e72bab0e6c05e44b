//! Data ingestion: file readers, the column alias table and the bar loader.

pub mod loader;
pub mod meta;
pub mod reader;
pub mod schema;
pub mod synthetic;
pub mod table;

pub use loader::{load_bars, parse_timestamp, LoadedBars};
pub use meta::DatasetMeta;
pub use reader::{read_csv, read_parquet, read_table, ReadError};
pub use schema::{resolve, ColumnMapping, Field, ResolvedColumns};
pub use synthetic::{synthetic_bars, SyntheticSpec};
pub use table::{Cell, RawColumn, RawTable};
