//! Unit conversion and index promotion.
//!
//! Conversion applies `value * scale + offset` to every numeric column using
//! the factors bound to that column. The no-data sentinel (per-column
//! `nodata` first, then the global one) is masked before the arithmetic and
//! handled afterwards according to [`NodataPolicy`]. All factors are
//! resolved before any column is touched, so a missing factor leaves the
//! table unchanged.

use crate::coercion::coerce_array;
use crate::config::{NodataPolicy, ReadOptions};
use crate::constants::NODATA_KEY;
use crate::error::{NeadError, Result};
use crate::header::HeaderModel;
use crate::models::{AttributeValue, Scalar};
use crate::table::{Table, TableColumn};
use chrono::{DateTime, NaiveDateTime, Utc};
use polars::prelude::*;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct UnitFactors {
    scale: f64,
    offset: f64,
    sentinel: Option<f64>,
}

/// Convert every numeric column to base units
pub fn apply_unit_conversion(
    table: &mut Table,
    header: &HeaderModel,
    options: &ReadOptions,
) -> Result<()> {
    let global_sentinel = header.nodata();

    let factors: Vec<Option<UnitFactors>> = table
        .columns()
        .iter()
        .map(|column| {
            if !column.is_numeric() {
                return Ok(None);
            }
            let scale = numeric_attribute(column, &options.scale_keys)?;
            let offset = numeric_attribute(column, &options.offset_keys)?;
            let sentinel = column
                .attribute(NODATA_KEY)
                .and_then(Scalar::parse_f64)
                .or(global_sentinel);
            Ok(Some(UnitFactors {
                scale,
                offset,
                sentinel,
            }))
        })
        .collect::<Result<_>>()?;

    let mut converted = 0usize;
    for (column, factors) in table.columns_mut().iter_mut().zip(factors) {
        let Some(factors) = factors else {
            continue;
        };
        let cast = column.data().cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = cast.as_materialized_series().f64()?.into_iter().collect();
        let values = convert_values(values, factors, options.nodata_policy);

        debug!(
            "Converted '{}' with scale {} and offset {}",
            column.name(),
            factors.scale,
            factors.offset
        );
        let name = column.data().name().clone();
        column.replace_data(Column::new(name, values));
        converted += 1;
    }

    info!("Unit conversion applied to {} numeric columns", converted);
    Ok(())
}

/// Copy of `header` whose unit factors are the identity for every numeric
/// column of `table`
///
/// Used when a converted table is written back, so that a later converting
/// read does not apply the factors twice.
pub fn converted_header(
    header: &HeaderModel,
    table: &Table,
    options: &ReadOptions,
) -> Result<HeaderModel> {
    let mut converted = header.clone();
    for (keys, identity) in [(&options.scale_keys, "1"), (&options.offset_keys, "0")] {
        for key in keys {
            let Some(array) = header
                .field_attributes()
                .get(key)
                .and_then(AttributeValue::as_array)
            else {
                continue;
            };
            let tokens: Vec<String> = array
                .tokens()
                .into_iter()
                .zip(header.fields().iter())
                .map(|(token, name)| match table.column(name) {
                    Some(column) if column.is_numeric() => identity.to_string(),
                    _ => token,
                })
                .collect();
            converted.set_field_attribute(key, coerce_array(tokens.as_slice()))?;
        }
    }
    Ok(converted)
}

/// Resolve one factor from the first matching key
fn numeric_attribute(column: &TableColumn, keys: &[String]) -> Result<f64> {
    let (key, value) = column.first_attribute(keys).ok_or_else(|| {
        NeadError::missing_unit_metadata(column.name(), format!("no {} attribute", keys.join(" or ")))
    })?;
    value
        .parse_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            NeadError::missing_unit_metadata(
                column.name(),
                format!("'{}' value '{}' is not a finite number", key, value),
            )
        })
}

fn convert_values(
    values: Vec<Option<f64>>,
    factors: UnitFactors,
    policy: NodataPolicy,
) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|value| {
            let value = value?;
            match factors.sentinel {
                Some(sentinel) if value == sentinel => match policy {
                    NodataPolicy::Restore => Some(sentinel),
                    NodataPolicy::Mask => None,
                },
                _ => Some(value * factors.scale + factors.offset),
            }
        })
        .collect()
}

/// Move the column at `position` into the row index
///
/// A string column whose values all look like ISO-8601 dates or date-times
/// is parsed into a millisecond `Datetime` column on the way.
pub fn promote_index(table: &mut Table, position: usize) -> Result<()> {
    let mut column = table.take_column(position)?;

    if let Some(timestamps) = coerce_datetime(column.data())? {
        debug!("Index column '{}' parsed as timestamps", column.name());
        column.replace_data(timestamps);
    }

    info!("Promoted '{}' to the row index", column.name());
    table.set_index(column);
    Ok(())
}

fn datetime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(\d{4}-\d{2}-\d{2})(?:[T ](\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?))?(Z|[+-]\d{2}:?\d{2})?$",
        )
        .expect("datetime pattern is valid")
    })
}

/// Parse a string column into timestamps when every value is date-like
///
/// Returns `None` for non-string columns, all-missing columns, and columns
/// with any value that does not look like a date.
pub fn coerce_datetime(column: &Column) -> Result<Option<Column>> {
    if column.dtype() != &DataType::String {
        return Ok(None);
    }
    let strings = column.as_materialized_series().str()?;
    if strings.null_count() == strings.len() {
        return Ok(None);
    }
    if !strings
        .into_iter()
        .flatten()
        .all(|value| datetime_pattern().is_match(value.trim()))
    {
        return Ok(None);
    }

    let millis = strings
        .into_iter()
        .map(|value| {
            value
                .map(|raw| {
                    parse_timestamp_millis(raw.trim()).map_err(|source| {
                        NeadError::DateTimeParsing {
                            column: column.name().to_string(),
                            value: raw.to_string(),
                            source,
                        }
                    })
                })
                .transpose()
        })
        .collect::<Result<Vec<Option<i64>>>>()?;

    let timestamps = Column::new(column.name().clone(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(Some(timestamps))
}

/// Milliseconds since the epoch for a value matching the datetime pattern
fn parse_timestamp_millis(raw: &str) -> std::result::Result<i64, chrono::ParseError> {
    let captures = datetime_pattern().captures(raw);
    let (date, time, offset) = match &captures {
        Some(c) => (
            c.get(1).map_or(raw, |m| m.as_str()),
            c.get(2).map(|m| m.as_str()),
            c.get(3).map(|m| m.as_str()),
        ),
        None => (raw, None, None),
    };

    let time = match time {
        None => "00:00:00".to_string(),
        Some(t) if t.len() == 5 => format!("{}:00", t),
        Some(t) => t.to_string(),
    };
    let local = format!("{}T{}", date, time);

    match offset {
        None => {
            let naive = NaiveDateTime::parse_from_str(&local, "%Y-%m-%dT%H:%M:%S%.f")?;
            Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).timestamp_millis())
        }
        Some(offset) => {
            let offset = match offset {
                "Z" => "+00:00".to_string(),
                o if o.contains(':') => o.to_string(),
                o => format!("{}:{}", &o[..3], &o[3..]),
            };
            let parsed =
                DateTime::parse_from_str(&format!("{}{}", local, offset), "%Y-%m-%dT%H:%M:%S%.f%:z")?;
            Ok(parsed.timestamp_millis())
        }
    }
}
