//! Read pipeline: lex, build the header model, assemble the table, then
//! optionally promote an index column and convert units.

use crate::assembler::assemble_table;
use crate::config::ReadOptions;
use crate::conversion::{apply_unit_conversion, promote_index};
use crate::error::Result;
use crate::header::HeaderModel;
use crate::models::Dataset;
use std::path::Path;
use tracing::{debug, info};

/// Reader for NEAD documents
#[derive(Debug, Clone, Default)]
pub struct NeadReader {
    options: ReadOptions,
}

impl NeadReader {
    pub fn new(options: ReadOptions) -> Self {
        Self { options }
    }

    /// Read and parse a file
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        debug!("Reading NEAD file {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let dataset = self.read_str(&text)?;

        info!(
            "Read {}: {} columns x {} rows",
            path.display(),
            dataset.table.width(),
            dataset.table.height()
        );
        Ok(dataset)
    }

    /// Parse a document held in memory
    pub fn read_str(&self, text: &str) -> Result<Dataset> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let lines: Vec<&str> = text.lines().collect();

        let (header, data_start) = HeaderModel::parse(&lines, &self.options)?;
        let mut table = assemble_table(&lines[data_start..], data_start + 1, &header)?;

        // Index first so the index column is never unit-converted
        if let Some(position) = self.options.index_column {
            promote_index(&mut table, position)?;
        }
        if self.options.convert_units {
            apply_unit_conversion(&mut table, &header, &self.options)?;
        }

        Ok(Dataset::new(header, table))
    }
}
