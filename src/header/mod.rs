//! NEAD header parsing and the typed attribute model.
//!
//! The header is read in two passes: [`lexer`] classifies the commented
//! lines up to `[DATA]`, and [`builder`] turns the key/value stream into a
//! [`HeaderModel`] according to the selected grammar.

pub mod builder;
pub mod lexer;

pub use builder::build_header;
pub use lexer::{HeaderScan, LexedItem, LexedLine, lex_header};

use crate::config::{HeaderGrammar, ReadOptions};
use crate::constants::{DEFAULT_DELIMITER_KEYS, FORMAT_BANNER_TOKENS, NODATA_KEY};
use crate::error::{NeadError, Result};
use crate::models::{ArrayValue, AttributeMap, AttributeValue, ColumnAttributes, Scalar};
use serde::{Deserialize, Serialize};

/// Separator shared by header vectors and data rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    /// Split on an exact character or string
    Literal(String),
    /// Split on runs of whitespace
    Whitespace,
}

impl Delimiter {
    /// Interpret a declared delimiter, resolving the named aliases
    pub fn from_declaration(raw: &str) -> Option<Self> {
        let delimiter = match raw.trim() {
            "" => return None,
            "tab" | "\\t" => Delimiter::Literal("\t".to_string()),
            "space" | "\\s" => Delimiter::Literal(" ".to_string()),
            "whitespace" | "\\s+" => Delimiter::Whitespace,
            "comma" => Delimiter::Literal(",".to_string()),
            "semicolon" => Delimiter::Literal(";".to_string()),
            other => Delimiter::Literal(other.to_string()),
        };
        Some(delimiter)
    }

    /// Split without trimming the tokens
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Literal(sep) => text.split(sep.as_str()).collect(),
            Delimiter::Whitespace => text.split_whitespace().collect(),
        }
    }

    /// Split and trim every token
    pub fn split_trimmed<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split(text).into_iter().map(str::trim).collect()
    }

    pub fn occurs_in(&self, text: &str) -> bool {
        match self {
            Delimiter::Literal(sep) => text.contains(sep.as_str()),
            Delimiter::Whitespace => text.chars().any(char::is_whitespace),
        }
    }

    pub fn join<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        let sep = match self {
            Delimiter::Literal(sep) => sep.as_str(),
            Delimiter::Whitespace => " ",
        };
        tokens
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

/// Ordered, unique field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    names: Vec<String>,
}

impl FieldSpec {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(NeadError::missing_attribute(crate::constants::FIELDS_KEY));
        }
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(NeadError::Configuration {
                    message: format!("field name at position {} is empty", i),
                });
            }
            if names[..i].contains(name) {
                return Err(NeadError::Configuration {
                    message: format!("field name '{}' is declared twice", name),
                });
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Typed header: global scalars plus per-field vectors
///
/// Every entry of `field_attributes` is an array with one element per
/// declared field, in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderModel {
    format: String,
    grammar: HeaderGrammar,
    delimiter_key: String,
    delimiter: Delimiter,
    fields: FieldSpec,
    global: AttributeMap,
    field_attributes: AttributeMap,
}

impl HeaderModel {
    /// Start a model for writing, declaring the delimiter under
    /// `field_delimiter`
    pub fn new(fields: FieldSpec, delimiter_declaration: &str) -> Result<Self> {
        Self::with_delimiter_key(fields, DEFAULT_DELIMITER_KEYS[0], delimiter_declaration)
    }

    pub fn with_delimiter_key(
        fields: FieldSpec,
        delimiter_key: &str,
        delimiter_declaration: &str,
    ) -> Result<Self> {
        let delimiter = Delimiter::from_declaration(delimiter_declaration).ok_or_else(|| {
            NeadError::Configuration {
                message: "delimiter declaration is empty".to_string(),
            }
        })?;
        let mut global = AttributeMap::new();
        global.insert(delimiter_key, Scalar::Str(delimiter_declaration.trim().to_string()));

        Ok(Self {
            format: FORMAT_BANNER_TOKENS.join(" "),
            grammar: HeaderGrammar::default(),
            delimiter_key: delimiter_key.to_string(),
            delimiter,
            fields,
            global,
            field_attributes: AttributeMap::new(),
        })
    }

    /// Parse header lines; returns the model and the index of the first data
    /// line
    pub fn parse(lines: &[&str], options: &ReadOptions) -> Result<(Self, usize)> {
        let scan = lex_header(lines)?;
        let model = build_header(&scan, options)?;
        Ok((model, scan.data_start))
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn grammar(&self) -> HeaderGrammar {
        self.grammar
    }

    pub fn delimiter(&self) -> &Delimiter {
        &self.delimiter
    }

    pub fn delimiter_key(&self) -> &str {
        &self.delimiter_key
    }

    pub fn fields(&self) -> &FieldSpec {
        &self.fields
    }

    pub fn global(&self) -> &AttributeMap {
        &self.global
    }

    pub fn field_attributes(&self) -> &AttributeMap {
        &self.field_attributes
    }

    /// Set a global scalar; the delimiter entry is managed by the model
    pub fn set_global(&mut self, key: &str, value: Scalar) -> Result<()> {
        self.check_reserved(key, "global")?;
        self.global.insert(key, value);
        Ok(())
    }

    /// Set a per-field vector; its length must equal the field count
    pub fn set_field_attribute(&mut self, key: &str, value: ArrayValue) -> Result<()> {
        self.check_reserved(key, "field")?;
        if value.len() != self.fields.len() {
            return Err(NeadError::VectorLengthMismatch {
                name: key.to_string(),
                expected: self.fields.len(),
                found: value.len(),
            });
        }
        self.field_attributes.insert(key, value);
        Ok(())
    }

    fn check_reserved(&self, key: &str, scope: &str) -> Result<()> {
        if key == self.delimiter_key || key == crate::constants::FIELDS_KEY {
            return Err(NeadError::Configuration {
                message: format!("'{}' cannot be set as a {} attribute", key, scope),
            });
        }
        Ok(())
    }

    /// Global no-data sentinel, if declared numerically
    pub fn nodata(&self) -> Option<f64> {
        self.global
            .get(NODATA_KEY)
            .and_then(AttributeValue::as_scalar)
            .and_then(Scalar::parse_f64)
    }

    /// Per-field attributes for the field at `position`
    pub fn column_attributes(&self, position: usize) -> ColumnAttributes {
        self.field_attributes
            .iter()
            .filter_map(|(key, value)| {
                let element = value.as_array()?.get(position)?;
                Some((key.to_string(), element))
            })
            .collect()
    }

    /// Per-field attributes for the named field
    pub fn field_attributes_for(&self, name: &str) -> Option<ColumnAttributes> {
        self.fields
            .position(name)
            .map(|position| self.column_attributes(position))
    }

    pub(crate) fn from_parts(
        format: String,
        grammar: HeaderGrammar,
        delimiter_key: String,
        delimiter: Delimiter,
        fields: FieldSpec,
        global: AttributeMap,
        field_attributes: AttributeMap,
    ) -> Self {
        Self {
            format,
            grammar,
            delimiter_key,
            delimiter,
            fields,
            global,
            field_attributes,
        }
    }
}
