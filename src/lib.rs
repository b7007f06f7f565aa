//! NEAD Library
//!
//! Reading and writing of NEAD files: self-describing, delimiter-separated
//! tables whose commented header carries file-level metadata and per-column
//! attributes such as units, scale factors and a no-data sentinel.
//!
//! This library provides tools for:
//! - Lexing the commented header and building a typed attribute model
//! - Assembling the data rows into typed columns with bound attributes
//! - Optional affine unit conversion and row-index promotion
//! - Writing a header model and table back to disk, all-or-nothing
//!
//! ```no_run
//! use nead::{ReadOptions, read_with_options};
//!
//! let options = ReadOptions::default().with_unit_conversion(true).with_index_column(0);
//! let dataset = read_with_options("station.nead", &options)?;
//! println!("{} rows", dataset.table.height());
//! # Ok::<(), nead::NeadError>(())
//! ```

pub mod assembler;
pub mod cli;
pub mod coercion;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod error;
pub mod header;
pub mod models;
pub mod reader;
pub mod table;
pub mod writer;

// Re-export commonly used types
pub use config::{HeaderGrammar, NodataPolicy, ReadOptions, VectorLengthPolicy, WriteOptions};
pub use error::{NeadError, Result};
pub use header::{Delimiter, FieldSpec, HeaderModel};
pub use models::{ArrayValue, AttributeMap, AttributeValue, ColumnAttributes, Dataset, Scalar};
pub use reader::NeadReader;
pub use table::{Table, TableColumn};
pub use writer::NeadWriter;

use std::path::Path;

/// Read a NEAD file with default options apart from conversion and indexing
pub fn read(
    path: impl AsRef<Path>,
    convert_units: bool,
    index_column: Option<usize>,
) -> Result<Dataset> {
    let mut options = ReadOptions::default().with_unit_conversion(convert_units);
    options.index_column = index_column;
    read_with_options(path, &options)
}

pub fn read_with_options(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    NeadReader::new(options.clone()).read(path)
}

/// Write `table` under `header` with default write options
pub fn write(table: &Table, header: &HeaderModel, path: impl AsRef<Path>) -> Result<()> {
    write_with_options(table, header, path, &WriteOptions::default())
}

pub fn write_with_options(
    table: &Table,
    header: &HeaderModel,
    path: impl AsRef<Path>,
    options: &WriteOptions,
) -> Result<()> {
    NeadWriter::new(options.clone()).write(table, header, path)
}
