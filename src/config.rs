//! Configuration for read and write operations.
//!
//! Options are passed explicitly to every read and write call; nothing is
//! kept in process-wide state. Policies that differ between historical
//! variants of the format are selectable here rather than guessed.

use crate::constants::{
    DEFAULT_DELIMITER_KEYS, DEFAULT_FLOAT_PRECISION, DEFAULT_OFFSET_KEYS, DEFAULT_SCALE_KEYS,
};
use crate::error::{NeadError, Result};
use serde::{Deserialize, Serialize};

/// Header grammar variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderGrammar {
    /// `[METADATA]` and `[FIELDS]` sections; section membership decides
    /// whether a value is a global scalar or a per-field vector
    #[default]
    Sectioned,
    /// Single `[HEADER]` section; a value is a per-field vector only when it
    /// splits into exactly as many tokens as there are fields
    Flat,
}

/// What happens to no-data sentinel cells during unit conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodataPolicy {
    /// Mask the sentinel, convert, then write the sentinel back unscaled
    #[default]
    Restore,
    /// Mask the sentinel, convert, and leave masked cells missing
    Mask,
}

/// How a `[FIELDS]` entry with the wrong token count is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorLengthPolicy {
    /// Abort the read with `VectorLengthMismatch`
    #[default]
    Strict,
    /// Keep the raw value as a global scalar and log a warning
    Lenient,
}

/// Options for reading a NEAD file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Header grammar to parse with
    pub grammar: HeaderGrammar,

    /// Apply `value * scale + offset` to every numeric column
    pub convert_units: bool,

    /// Field position to promote to the row index
    pub index_column: Option<usize>,

    /// Treatment of mis-sized `[FIELDS]` vectors (sectioned grammar only)
    pub vector_length_policy: VectorLengthPolicy,

    /// Treatment of the no-data sentinel during conversion
    pub nodata_policy: NodataPolicy,

    /// Keys that may declare the delimiter, first match wins
    pub delimiter_keys: Vec<String>,

    /// Keys that may carry the multiplicative unit factor
    pub scale_keys: Vec<String>,

    /// Keys that may carry the additive unit offset
    pub offset_keys: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            grammar: HeaderGrammar::default(),
            convert_units: false,
            index_column: None,
            vector_length_policy: VectorLengthPolicy::default(),
            nodata_policy: NodataPolicy::default(),
            delimiter_keys: to_owned_keys(DEFAULT_DELIMITER_KEYS),
            scale_keys: to_owned_keys(DEFAULT_SCALE_KEYS),
            offset_keys: to_owned_keys(DEFAULT_OFFSET_KEYS),
        }
    }
}

impl ReadOptions {
    /// Select the header grammar
    pub fn with_grammar(mut self, grammar: HeaderGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Request unit conversion
    pub fn with_unit_conversion(mut self, convert: bool) -> Self {
        self.convert_units = convert;
        self
    }

    /// Promote the field at `position` to the row index
    pub fn with_index_column(mut self, position: usize) -> Self {
        self.index_column = Some(position);
        self
    }

    pub fn with_vector_length_policy(mut self, policy: VectorLengthPolicy) -> Self {
        self.vector_length_policy = policy;
        self
    }

    pub fn with_nodata_policy(mut self, policy: NodataPolicy) -> Self {
        self.nodata_policy = policy;
        self
    }

    /// Replace the accepted delimiter keys
    pub fn with_delimiter_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delimiter_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Check that every key list can match something
    pub fn validate(&self) -> Result<()> {
        for (label, keys) in [
            ("delimiter_keys", &self.delimiter_keys),
            ("scale_keys", &self.scale_keys),
            ("offset_keys", &self.offset_keys),
        ] {
            if keys.is_empty() || keys.iter().any(|k| k.trim().is_empty()) {
                return Err(NeadError::Configuration {
                    message: format!("{} must contain at least one non-empty key", label),
                });
            }
        }
        Ok(())
    }
}

/// Options for writing a NEAD file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Header grammar to render
    pub grammar: HeaderGrammar,

    /// Decimal places for floating-point cells
    pub float_precision: usize,

    /// Emit a `##` generator line after the banner
    pub generator_comment: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            grammar: HeaderGrammar::default(),
            float_precision: DEFAULT_FLOAT_PRECISION,
            generator_comment: true,
        }
    }
}

impl WriteOptions {
    pub fn with_grammar(mut self, grammar: HeaderGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Set decimal places for floating-point cells
    pub fn with_float_precision(mut self, precision: usize) -> Self {
        self.float_precision = precision;
        self
    }

    pub fn without_generator_comment(mut self) -> Self {
        self.generator_comment = false;
        self
    }
}

fn to_owned_keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}
