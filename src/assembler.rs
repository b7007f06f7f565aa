//! Data section parsing and attribute binding.
//!
//! Rows are split on the header's delimiter and matched to fields by
//! position. Column types are inferred from the cells alone: a column whose
//! non-empty cells are all numeric-like becomes `Int64` when every value is
//! integral and `Float64` otherwise; anything else stays `String`. Empty
//! cells are missing values.

use crate::coercion::{narrow_to_int, parse_numeric};
use crate::constants::COMMENT_MARKER;
use crate::error::{NeadError, Result};
use crate::header::HeaderModel;
use crate::table::{Table, TableColumn};
use polars::prelude::*;
use tracing::{debug, warn};

/// Build a table from the lines after `[DATA]`
///
/// `first_line_number` is the 1-based file line of `lines[0]`, used for
/// error reporting.
pub fn assemble_table(
    lines: &[&str],
    first_line_number: usize,
    header: &HeaderModel,
) -> Result<Table> {
    let fields = header.fields();
    let delimiter = header.delimiter();
    let mut cells: Vec<Vec<&str>> = vec![Vec::new(); fields.len()];
    let mut short_rows = 0usize;

    for (offset, raw) in lines.iter().enumerate() {
        let line = first_line_number + offset;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            continue;
        }

        let tokens = delimiter.split_trimmed(raw);
        if tokens.len() > fields.len() {
            return Err(NeadError::MalformedRow {
                line,
                reason: format!(
                    "{} values for {} declared fields",
                    tokens.len(),
                    fields.len()
                ),
            });
        }
        if tokens.len() < fields.len() {
            short_rows += 1;
        }

        for (position, column) in cells.iter_mut().enumerate() {
            column.push(tokens.get(position).copied().unwrap_or(""));
        }
    }

    if short_rows > 0 {
        warn!(
            "{} data rows had fewer values than fields and were padded with missing cells",
            short_rows
        );
    }

    let columns = fields
        .iter()
        .zip(cells.iter())
        .enumerate()
        .map(|(position, (name, values))| {
            TableColumn::new(infer_column(name, values))
                .with_attributes(header.column_attributes(position))
        })
        .collect();
    let table = Table::new(columns)?;

    debug!(
        "Assembled table: {} columns x {} rows",
        table.width(),
        table.height()
    );
    Ok(table)
}

/// Type a column from its raw cells
fn infer_column(name: &str, cells: &[&str]) -> Column {
    let parsed: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| {
            if cell.is_empty() {
                Some(None)
            } else {
                parse_numeric(cell).map(Some)
            }
        })
        .collect();

    match parsed {
        Some(values) => {
            let ints: Option<Vec<Option<i64>>> = values
                .iter()
                .map(|v| match v {
                    Some(v) => narrow_to_int(*v).map(Some),
                    None => Some(None),
                })
                .collect();
            let has_values = values.iter().any(Option::is_some);
            match ints {
                Some(ints) if has_values => Column::new(name.into(), ints),
                _ => Column::new(name.into(), values),
            }
        }
        None => {
            let strings: Vec<Option<&str>> = cells
                .iter()
                .map(|cell| if cell.is_empty() { None } else { Some(*cell) })
                .collect();
            Column::new(name.into(), strings)
        }
    }
}
