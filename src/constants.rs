//! Format constants for the NEAD codec
//!
//! Banner tokens, section names, comment markers and the attribute keys the
//! pipeline looks up by default.

// =============================================================================
// Format banner and markers
// =============================================================================

/// Comment marker that prefixes every header line
pub const COMMENT_MARKER: char = '#';

/// Separator between an attribute key and its value
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Expected banner on line 1, compared token by token
pub const FORMAT_BANNER_TOKENS: &[&str] = &["NEAD", "1.0", "UTF-8"];

/// Section names as they appear between brackets
pub mod sections {
    pub const HEADER: &str = "HEADER";
    pub const METADATA: &str = "METADATA";
    pub const FIELDS: &str = "FIELDS";
    pub const DATA: &str = "DATA";
}

// =============================================================================
// Attribute keys
// =============================================================================

/// Attribute holding the ordered field names
pub const FIELDS_KEY: &str = "fields";

/// Global sentinel marking missing values
pub const NODATA_KEY: &str = "nodata";

/// Keys accepted for the delimiter declaration, in lookup order
pub const DEFAULT_DELIMITER_KEYS: &[&str] = &["field_delimiter", "column_delimiter"];

/// Keys accepted for the multiplicative unit factor, in lookup order
pub const DEFAULT_SCALE_KEYS: &[&str] = &["scale_factor", "units_multiplier"];

/// Keys accepted for the additive unit offset, in lookup order
pub const DEFAULT_OFFSET_KEYS: &[&str] = &["add_value", "units_offset"];

// =============================================================================
// Writer defaults
// =============================================================================

/// Decimal places used for floating-point cells
pub const DEFAULT_FLOAT_PRECISION: usize = 6;

/// Timestamp layout used when writing datetime columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
