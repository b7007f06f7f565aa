//! Assembly of lexed key/value pairs into a [`HeaderModel`].
//!
//! Sectioned grammar: `[METADATA]` entries are global scalars and
//! `[FIELDS]` entries are per-field vectors, whatever their content.
//!
//! Flat grammar: a value is a per-field vector only when it contains the
//! delimiter and splits into exactly one token per field. A scalar that
//! happens to contain the delimiter but splits into any other count stays a
//! scalar. Token count is the only discriminator, so a free-text value with
//! exactly N-1 delimiters is read as a vector.

use super::lexer::{HeaderScan, LexedLine};
use super::{Delimiter, FieldSpec, HeaderModel};
use crate::coercion::{coerce_array, coerce_scalar};
use crate::config::{HeaderGrammar, ReadOptions, VectorLengthPolicy};
use crate::constants::{FIELDS_KEY, sections};
use crate::error::{NeadError, Result};
use crate::models::{AttributeMap, Scalar};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Metadata,
    Fields,
}

#[derive(Debug)]
struct RawEntry<'a> {
    line: usize,
    section: Section,
    key: &'a str,
    value: &'a str,
}

/// Build the header model from a lexed scan
pub fn build_header(scan: &HeaderScan, options: &ReadOptions) -> Result<HeaderModel> {
    options.validate()?;

    let format = scan
        .items
        .iter()
        .find_map(|item| match &item.kind {
            LexedLine::FormatDeclaration(banner) => Some(banner.clone()),
            _ => None,
        })
        .ok_or_else(|| NeadError::malformed_header(1, "missing format banner"))?;

    let entries = collect_entries(scan, options.grammar)?;

    // Every key, reserved or not, takes its last declaration
    let (delimiter_key, delimiter_raw) = options
        .delimiter_keys
        .iter()
        .find_map(|key| last_entry(&entries, key).map(|e| (key.clone(), e.value)))
        .ok_or_else(|| NeadError::missing_attribute(options.delimiter_keys.join(" or ")))?;

    let delimiter = Delimiter::from_declaration(delimiter_raw)
        .ok_or_else(|| NeadError::missing_attribute(delimiter_key.as_str()))?;

    let fields_entry =
        last_entry(&entries, FIELDS_KEY).ok_or_else(|| NeadError::missing_attribute(FIELDS_KEY))?;

    for key in [delimiter_key.as_str(), FIELDS_KEY] {
        let declarations = entries.iter().filter(|e| e.key == key).count();
        if declarations > 1 {
            warn!(
                "'{}' declared {} times, keeping the value from line {}",
                key,
                declarations,
                last_entry(&entries, key).map_or(0, |e| e.line)
            );
        }
    }
    let fields = FieldSpec::new(delimiter.split_trimmed(fields_entry.value))
        .map_err(|e| NeadError::malformed_header(fields_entry.line, e.to_string()))?;
    let field_count = fields.len();

    let mut global = AttributeMap::new();
    global.insert(delimiter_key.as_str(), Scalar::Str(delimiter_raw.to_string()));
    let mut field_attributes = AttributeMap::new();

    for entry in &entries {
        if entry.key == FIELDS_KEY || entry.key == delimiter_key {
            continue;
        }

        let tokens = delimiter.split_trimmed(entry.value);
        let is_vector = match (options.grammar, entry.section) {
            (HeaderGrammar::Sectioned, Section::Metadata) => false,
            (HeaderGrammar::Sectioned, Section::Fields) => {
                if tokens.len() == field_count {
                    true
                } else if options.vector_length_policy == VectorLengthPolicy::Strict {
                    return Err(NeadError::VectorLengthMismatch {
                        name: entry.key.to_string(),
                        expected: field_count,
                        found: tokens.len(),
                    });
                } else {
                    warn!(
                        "Line {}: '{}' has {} values for {} fields, keeping it as a scalar",
                        entry.line,
                        entry.key,
                        tokens.len(),
                        field_count
                    );
                    false
                }
            }
            (HeaderGrammar::Flat, _) => {
                delimiter.occurs_in(entry.value) && tokens.len() == field_count
            }
        };

        let previous = if is_vector {
            field_attributes.insert(entry.key, coerce_array(tokens.as_slice()))
        } else {
            global.insert(entry.key, coerce_scalar(entry.value))
        };
        if previous.is_some() {
            warn!(
                "Line {}: '{}' declared more than once, keeping the last value",
                entry.line, entry.key
            );
        }
    }

    debug!(
        "Header model built: {} fields, {} global attributes, {} field attributes",
        field_count,
        global.len(),
        field_attributes.len()
    );

    Ok(HeaderModel::from_parts(
        format,
        options.grammar,
        delimiter_key,
        delimiter,
        fields,
        global,
        field_attributes,
    ))
}

fn last_entry<'a, 'b>(entries: &'b [RawEntry<'a>], key: &str) -> Option<&'b RawEntry<'a>> {
    entries.iter().rev().find(|e| e.key == key)
}

/// Walk the scan, enforce section order and tag each entry with its section
fn collect_entries(scan: &HeaderScan, grammar: HeaderGrammar) -> Result<Vec<RawEntry<'_>>> {
    let mut current: Option<Section> = None;
    let mut seen_fields_section = false;
    let mut entries = Vec::new();

    for item in &scan.items {
        match &item.kind {
            LexedLine::SectionMarker(name) if name == sections::DATA => break,
            LexedLine::SectionMarker(name) => {
                current = Some(next_section(item.line, name, current, grammar)?);
                if current == Some(Section::Fields) {
                    seen_fields_section = true;
                }
            }
            LexedLine::KeyValue { key, value } => {
                let section = current.ok_or_else(|| {
                    NeadError::malformed_header(
                        item.line,
                        format!("'{}' appears before any section marker", key),
                    )
                })?;
                entries.push(RawEntry {
                    line: item.line,
                    section,
                    key: key.as_str(),
                    value: value.as_str(),
                });
            }
            LexedLine::FormatDeclaration(_) | LexedLine::BlankLine | LexedLine::CommentNoise => {}
        }
    }

    let data_line = scan.items.last().map_or(1, |item| item.line);
    match grammar {
        HeaderGrammar::Sectioned if !seen_fields_section => Err(NeadError::malformed_header(
            data_line,
            format!("missing [{}] section", sections::FIELDS),
        )),
        HeaderGrammar::Flat if current.is_none() => Err(NeadError::malformed_header(
            data_line,
            format!("missing [{}] section", sections::HEADER),
        )),
        _ => Ok(entries),
    }
}

fn next_section(
    line: usize,
    name: &str,
    current: Option<Section>,
    grammar: HeaderGrammar,
) -> Result<Section> {
    let next = match (grammar, current, name) {
        (HeaderGrammar::Sectioned, None, sections::METADATA) => Section::Metadata,
        (HeaderGrammar::Sectioned, Some(Section::Metadata), sections::FIELDS) => Section::Fields,
        (HeaderGrammar::Flat, None, sections::HEADER | sections::METADATA) => Section::Metadata,
        _ => {
            let expected = match (grammar, current) {
                (HeaderGrammar::Sectioned, None) => sections::METADATA,
                (HeaderGrammar::Sectioned, Some(Section::Metadata)) => sections::FIELDS,
                (HeaderGrammar::Sectioned, Some(Section::Fields)) => sections::DATA,
                (HeaderGrammar::Flat, None) => sections::HEADER,
                (HeaderGrammar::Flat, Some(_)) => sections::DATA,
            };
            return Err(NeadError::malformed_header(
                line,
                format!("unexpected section [{}], expected [{}]", name, expected),
            ));
        }
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::lex_header;
    use crate::models::{ArrayValue, AttributeValue};

    fn build(text: &str, options: &ReadOptions) -> Result<HeaderModel> {
        let lines: Vec<&str> = text.lines().collect();
        let scan = lex_header(&lines)?;
        build_header(&scan, options)
    }

    const SECTIONED: &str = "\
# NEAD 1.0 UTF-8
# [METADATA]
# station_id = WFJ
# field_delimiter = ,
# nodata = -999
# description = wind, snow, sun
# [FIELDS]
# fields = TA,RH,VW
# units = degC, %, m/s
# scale_factor = 1,0.01,1
# add_value = 273.15,0,0
# [DATA]
";

    #[test]
    fn test_sectioned_header() {
        let model = build(SECTIONED, &ReadOptions::default()).unwrap();

        assert_eq!(model.format(), "NEAD 1.0 UTF-8");
        assert_eq!(model.fields().names(), &["TA", "RH", "VW"]);
        assert_eq!(model.delimiter(), &Delimiter::Literal(",".into()));
        assert_eq!(model.delimiter_key(), "field_delimiter");
        assert_eq!(model.nodata(), Some(-999.0));

        // metadata values are never split, even with a matching token count
        assert_eq!(
            model.global().get("description"),
            Some(&AttributeValue::Scalar(Scalar::Str("wind, snow, sun".into())))
        );
        assert_eq!(
            model.field_attributes().get("units"),
            Some(&AttributeValue::Array(ArrayValue::Str(vec![
                "degC".into(),
                "%".into(),
                "m/s".into()
            ])))
        );
        assert_eq!(
            model.field_attributes().get("scale_factor"),
            Some(&AttributeValue::Array(ArrayValue::Float(vec![1.0, 0.01, 1.0])))
        );
        assert_eq!(
            model.field_attributes().get("add_value"),
            Some(&AttributeValue::Array(ArrayValue::Float(vec![273.15, 0.0, 0.0])))
        );
    }

    #[test]
    fn test_numeric_field_names_stay_strings() {
        let text = "# NEAD 1.0 UTF-8\n# [METADATA]\n# field_delimiter = ,\n# [FIELDS]\n# fields = 1,2.5\n# [DATA]\n";
        let model = build(text, &ReadOptions::default()).unwrap();
        assert_eq!(model.fields().names(), &["1", "2.5"]);
    }

    #[test]
    fn test_missing_delimiter() {
        let text = "# NEAD 1.0 UTF-8\n# [METADATA]\n# station = x\n# [FIELDS]\n# fields = a,b\n# [DATA]\n";
        match build(text, &ReadOptions::default()) {
            Err(NeadError::MissingRequiredAttribute { name }) => {
                assert!(name.contains("field_delimiter"))
            }
            other => panic!("Expected MissingRequiredAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_delimiter_is_missing() {
        let text = "# NEAD 1.0 UTF-8\n# [METADATA]\n# field_delimiter =\n# [FIELDS]\n# fields = a,b\n# [DATA]\n";
        match build(text, &ReadOptions::default()) {
            Err(NeadError::MissingRequiredAttribute { name }) => {
                assert_eq!(name, "field_delimiter")
            }
            other => panic!("Expected MissingRequiredAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_keys_keep_last_declaration() {
        let text = "\
# NEAD 1.0 UTF-8
# [METADATA]
# field_delimiter = ;
# station_id = OLD
# field_delimiter = ,
# station_id = WFJ
# [FIELDS]
# fields = x,y,z
# units = K,K
# fields = a,b
# units = m,s
# [DATA]
";
        let model = build(text, &ReadOptions::default()).unwrap();

        assert_eq!(model.delimiter(), &Delimiter::Literal(",".into()));
        assert_eq!(
            model.global().get("field_delimiter"),
            Some(&AttributeValue::Scalar(Scalar::Str(",".into())))
        );
        assert_eq!(model.fields().names(), &["a", "b"]);
        assert_eq!(
            model.global().get("station_id"),
            Some(&AttributeValue::Scalar(Scalar::Str("WFJ".into())))
        );
        assert_eq!(
            model.field_attributes().get("units"),
            Some(&AttributeValue::Array(ArrayValue::Str(vec!["m".into(), "s".into()])))
        );
    }

    #[test]
    fn test_missing_fields() {
        let text = "# NEAD 1.0 UTF-8\n# [METADATA]\n# field_delimiter = ,\n# [FIELDS]\n# units = a,b\n# [DATA]\n";
        match build(text, &ReadOptions::default()) {
            Err(NeadError::MissingRequiredAttribute { name }) => assert_eq!(name, "fields"),
            other => panic!("Expected MissingRequiredAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_sectioned_vector_length_mismatch() {
        let text = "# NEAD 1.0 UTF-8\n# [METADATA]\n# field_delimiter = ,\n# [FIELDS]\n# fields = a,b,c\n# units = m,s\n# [DATA]\n";
        match build(text, &ReadOptions::default()) {
            Err(NeadError::VectorLengthMismatch {
                name,
                expected,
                found,
            }) => {
                assert_eq!(name, "units");
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("Expected VectorLengthMismatch, got {:?}", other),
        }

        let lenient = ReadOptions::default().with_vector_length_policy(VectorLengthPolicy::Lenient);
        let model = build(text, &lenient).unwrap();
        assert_eq!(
            model.global().get("units"),
            Some(&AttributeValue::Scalar(Scalar::Str("m,s".into())))
        );
        assert!(model.field_attributes().get("units").is_none());
    }

    #[test]
    fn test_flat_grammar_classifies_by_token_count() {
        let text = "\
# NEAD 1.0 UTF-8
# [HEADER]
# column_delimiter = ,
# fields = a,b,c
# units = m,s
# units_multiplier = 1,2,3
# title = hello, world
# nodata = -9999
# [DATA]
";
        let options = ReadOptions::default().with_grammar(HeaderGrammar::Flat);
        let model = build(text, &options).unwrap();

        assert_eq!(model.delimiter_key(), "column_delimiter");
        assert_eq!(model.grammar(), HeaderGrammar::Flat);
        assert_eq!(
            model.global().get("units"),
            Some(&AttributeValue::Scalar(Scalar::Str("m,s".into())))
        );
        assert_eq!(
            model.global().get("title"),
            Some(&AttributeValue::Scalar(Scalar::Str("hello, world".into())))
        );
        assert_eq!(
            model.field_attributes().get("units_multiplier"),
            Some(&AttributeValue::Array(ArrayValue::Int(vec![1, 2, 3])))
        );
        assert_eq!(
            model.global().get("nodata"),
            Some(&AttributeValue::Scalar(Scalar::Int(-9999)))
        );
    }

    #[test]
    fn test_flat_grammar_rejects_fields_section() {
        let options = ReadOptions::default().with_grammar(HeaderGrammar::Flat);
        assert!(matches!(
            build(SECTIONED, &options),
            Err(NeadError::MalformedHeader { line: 7, .. })
        ));
    }

    #[test]
    fn test_sectioned_requires_sections_in_order() {
        let no_fields = "# NEAD 1.0 UTF-8\n# [METADATA]\n# field_delimiter = ,\n# fields = a\n# [DATA]\n";
        assert!(matches!(
            build(no_fields, &ReadOptions::default()),
            Err(NeadError::MalformedHeader { .. })
        ));

        let reversed = "# NEAD 1.0 UTF-8\n# [FIELDS]\n# fields = a\n# [METADATA]\n# field_delimiter = ,\n# [DATA]\n";
        assert!(matches!(
            build(reversed, &ReadOptions::default()),
            Err(NeadError::MalformedHeader { line: 2, .. })
        ));

        let orphan = "# NEAD 1.0 UTF-8\n# field_delimiter = ,\n# [METADATA]\n# [FIELDS]\n# fields = a\n# [DATA]\n";
        assert!(matches!(
            build(orphan, &ReadOptions::default()),
            Err(NeadError::MalformedHeader { line: 2, .. })
        ));
    }

    #[test]
    fn test_whitespace_delimiter_alias() {
        let text = "# NEAD 1.0 UTF-8\n# [METADATA]\n# field_delimiter = whitespace\n# [FIELDS]\n# fields = a  b\tc\n# [DATA]\n";
        let model = build(text, &ReadOptions::default()).unwrap();
        assert_eq!(model.delimiter(), &Delimiter::Whitespace);
        assert_eq!(model.fields().len(), 3);
        assert_eq!(
            model.global().get("field_delimiter"),
            Some(&AttributeValue::Scalar(Scalar::Str("whitespace".into())))
        );
    }
}
