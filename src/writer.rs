//! NEAD writing module
//!
//! Renders a header model and a table back into the commented header and
//! delimited data rows. The whole document is rendered in memory first and
//! then persisted through a temporary file in the target directory, so a
//! failed write never leaves a partial file behind.

use crate::config::{HeaderGrammar, WriteOptions};
use crate::constants::{FIELDS_KEY, TIMESTAMP_FORMAT, sections};
use crate::error::{NeadError, Result};
use crate::header::{Delimiter, HeaderModel};
use crate::models::{AttributeValue, Dataset};
use crate::table::{Table, TableColumn};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use tracing::{debug, info};

/// Writer for NEAD documents
#[derive(Debug, Clone, Default)]
pub struct NeadWriter {
    options: WriteOptions,
}

impl NeadWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Write `table` under `header` to `path`, replacing any existing file
    pub fn write(&self, table: &Table, header: &HeaderModel, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = self.render(table, header)?;

        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut staging = tempfile::NamedTempFile::new_in(parent)?;
        staging.write_all(document.as_bytes())?;
        staging.flush()?;
        staging.persist(path).map_err(|e| e.error)?;

        info!(
            "Wrote {} rows x {} fields to {}",
            table.height(),
            header.fields().len(),
            path.display()
        );
        Ok(())
    }

    /// Render the full document as a string
    pub fn render(&self, table: &Table, header: &HeaderModel) -> Result<String> {
        // Resolve every declared field before producing any output
        let columns = header
            .fields()
            .iter()
            .map(|name| {
                table.find(name).ok_or_else(|| NeadError::MissingField {
                    field: name.to_string(),
                })
            })
            .collect::<Result<Vec<&TableColumn>>>()?;

        let mut out = self.render_header(header)?;

        // An empty token is dropped by a whitespace split, and a lone empty
        // cell is a blank line that the reader skips
        let delimiter = header.delimiter();
        let needs_sentinel = matches!(delimiter, Delimiter::Whitespace) || columns.len() == 1;

        let cells = columns
            .iter()
            .map(|column| {
                render_cells(column, header, self.options.float_precision, needs_sentinel)
            })
            .collect::<Result<Vec<Vec<String>>>>()?;

        let mut row: Vec<&str> = Vec::with_capacity(cells.len());
        for i in 0..table.height() {
            row.clear();
            row.extend(cells.iter().map(|column| column[i].as_str()));
            out.push_str(&delimiter.join(&row));
            out.push('\n');
        }

        debug!(
            "Rendered {} header attributes and {} data rows",
            header.global().len() + header.field_attributes().len() + 1,
            table.height()
        );
        Ok(out)
    }

    fn render_header(&self, header: &HeaderModel) -> Result<String> {
        let delimiter = header.delimiter();
        let mut out = String::new();

        let _ = writeln!(out, "{} {}", crate::constants::COMMENT_MARKER, header.format());
        if self.options.generator_comment {
            let _ = writeln!(out, "## written by nead {}", env!("CARGO_PKG_VERSION"));
        }

        let opening = match self.options.grammar {
            HeaderGrammar::Sectioned => sections::METADATA,
            HeaderGrammar::Flat => sections::HEADER,
        };
        push_section(&mut out, opening);

        for (key, value) in header.global().iter() {
            let value = match value {
                AttributeValue::Scalar(scalar) => scalar.to_string(),
                AttributeValue::Array(array) => delimiter.join(&array.tokens()),
            };
            push_attribute(&mut out, key, &value)?;
        }

        if self.options.grammar == HeaderGrammar::Sectioned {
            push_section(&mut out, sections::FIELDS);
        }

        push_attribute(&mut out, FIELDS_KEY, &delimiter.join(header.fields().names()))?;
        for (key, value) in header.field_attributes().iter() {
            let tokens = match value {
                AttributeValue::Array(array) => array.tokens(),
                AttributeValue::Scalar(scalar) => vec![scalar.to_string()],
            };
            if let Some(token) = tokens.iter().find(|t| delimiter.occurs_in(t)) {
                return Err(NeadError::Configuration {
                    message: format!(
                        "value '{}' of field attribute '{}' contains the delimiter",
                        token, key
                    ),
                });
            }
            if *delimiter == Delimiter::Whitespace && tokens.iter().any(|t| t.trim().is_empty()) {
                return Err(NeadError::Configuration {
                    message: format!(
                        "field attribute '{}' has an empty element, which a whitespace delimiter cannot hold",
                        key
                    ),
                });
            }
            push_attribute(&mut out, key, &delimiter.join(&tokens))?;
        }

        push_section(&mut out, sections::DATA);
        Ok(out)
    }
}

fn push_section(out: &mut String, name: &str) {
    let _ = writeln!(out, "{} [{}]", crate::constants::COMMENT_MARKER, name);
}

fn push_attribute(out: &mut String, key: &str, value: &str) -> Result<()> {
    if key.contains(['\n', '\r']) || value.contains(['\n', '\r']) {
        return Err(NeadError::Configuration {
            message: format!("attribute '{}' contains a line break", key.trim()),
        });
    }
    let _ = writeln!(
        out,
        "{} {} {} {}",
        crate::constants::COMMENT_MARKER,
        key,
        crate::constants::KEY_VALUE_SEPARATOR,
        value
    );
    Ok(())
}

/// Format one column's cells as text
///
/// Missing values render as an empty cell. When `needs_sentinel` is set an
/// empty cell would vanish on re-read, so blank strings count as missing and
/// the header's `nodata` sentinel is written instead. The write fails when
/// none is declared.
fn render_cells(
    column: &TableColumn,
    header: &HeaderModel,
    precision: usize,
    needs_sentinel: bool,
) -> Result<Vec<String>> {
    let delimiter = header.delimiter();
    let data = column.data();

    let cells: Vec<Option<String>> = match data.dtype() {
        DataType::Float32 | DataType::Float64 => data
            .cast(&DataType::Float64)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .map(|v| v.filter(|v| !v.is_nan()).map(|v| format!("{:.*}", precision, v)))
            .collect(),
        dtype if dtype.is_integer() => data
            .cast(&DataType::Int64)?
            .as_materialized_series()
            .i64()?
            .into_iter()
            .map(|v| v.map(|v| v.to_string()))
            .collect(),
        DataType::Datetime(_, _) => data
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?
            .as_materialized_series()
            .i64()?
            .into_iter()
            .map(|v| {
                v.and_then(DateTime::<Utc>::from_timestamp_millis)
                    .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            })
            .collect(),
        _ => {
            let strings = data.cast(&DataType::String)?;
            let strings = strings.as_materialized_series().str()?;
            let mut values = Vec::with_capacity(strings.len());
            for value in strings.into_iter() {
                let value = value.filter(|text| !(needs_sentinel && text.trim().is_empty()));
                if let Some(text) = value {
                    if delimiter.occurs_in(text) || text.contains(['\n', '\r']) {
                        return Err(NeadError::Configuration {
                            message: format!(
                                "value '{}' in column '{}' cannot be written with this delimiter",
                                text,
                                column.name()
                            ),
                        });
                    }
                }
                values.push(value.map(str::to_string));
            }
            values
        }
    };

    let missing = if needs_sentinel && cells.iter().any(Option::is_none) {
        header
            .nodata()
            .map(|sentinel| sentinel.to_string())
            .ok_or_else(|| NeadError::Configuration {
                message: format!(
                    "column '{}' has missing values, which need a nodata sentinel here",
                    column.name()
                ),
            })?
    } else {
        String::new()
    };

    Ok(cells
        .into_iter()
        .map(|cell| cell.unwrap_or_else(|| missing.clone()))
        .collect())
}

impl Dataset {
    /// Write this dataset back to disk
    pub fn write(&self, path: impl AsRef<Path>, options: &WriteOptions) -> Result<()> {
        NeadWriter::new(options.clone()).write(&self.table, &self.header, path)
    }
}
