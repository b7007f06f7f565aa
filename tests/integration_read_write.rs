//! Integration tests for the NEAD read and write paths
//!
//! These tests write small documents to a temporary directory and exercise
//! the public API end to end: header parsing, table assembly, conversion,
//! index promotion and writing back.

use approx::assert_relative_eq;
use nead::{
    HeaderGrammar, NeadError, NeadReader, NodataPolicy, ReadOptions, Scalar, VectorLengthPolicy,
    WriteOptions,
};
use polars::prelude::DataType;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const STATION: &str = "\
# NEAD 1.0 UTF-8
# [METADATA]
# station_id = WFJ
# latitude = 46.8296
# field_delimiter = ,
# nodata = -999
# [FIELDS]
# fields = timestamp,TA,RH,VW
# units = time,degC,%,m/s
# scale_factor = 1,1,0.01,1
# add_value = 0,273.15,0,0
# [DATA]
2020-01-01T00:00:00,2,50,1.5
2020-01-01T01:00:00,-999,55,2.25
2020-01-01T02:00:00,-3.5,,0
";

fn write_fixture(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write fixture");
    path
}

fn float_values(dataset: &nead::Dataset, name: &str) -> Vec<Option<f64>> {
    dataset
        .table
        .column(name)
        .unwrap_or_else(|| panic!("column {} missing", name))
        .data()
        .cast(&DataType::Float64)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

/// Read with conversion and index promotion
///
/// Purpose: Validate the full read pipeline on a realistic station file
/// Benefit: Covers unit conversion, sentinel handling and the datetime index together
#[test]
fn test_read_with_conversion_and_index() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "station.nead", STATION);

    let dataset = nead::read(&path, true, Some(0)).unwrap();

    assert_eq!(
        dataset.attribute("station_id").and_then(|v| v.as_scalar()),
        Some(&Scalar::Str("WFJ".into()))
    );
    assert_eq!(
        dataset.attribute("latitude").and_then(|v| v.as_scalar()),
        Some(&Scalar::Float(46.8296))
    );

    let index = dataset.table.index().expect("index column");
    assert_eq!(index.name(), "timestamp");
    assert!(matches!(index.data().dtype(), DataType::Datetime(_, _)));
    assert_eq!(dataset.table.column_names(), vec!["TA", "RH", "VW"]);

    let ta = float_values(&dataset, "TA");
    assert_relative_eq!(ta[0].unwrap(), 275.15, epsilon = 1e-9);
    assert_eq!(ta[1], Some(-999.0));
    assert_relative_eq!(ta[2].unwrap(), 269.65, epsilon = 1e-9);

    let rh = float_values(&dataset, "RH");
    assert_relative_eq!(rh[0].unwrap(), 0.5, epsilon = 1e-12);
    assert_eq!(rh[2], None);

    let ta_column = dataset.table.column("TA").unwrap();
    assert_eq!(ta_column.attribute("units"), Some(&Scalar::Str("degC".into())));
}

#[test]
fn test_read_without_conversion_keeps_raw_values() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "station.nead", STATION);

    let dataset = nead::read(&path, false, None).unwrap();
    assert!(dataset.table.index().is_none());
    assert_eq!(dataset.table.width(), 4);
    assert_eq!(
        dataset.table.column("RH").unwrap().data().dtype(),
        &DataType::Int64
    );
    assert_eq!(float_values(&dataset, "TA")[1], Some(-999.0));
}

/// Read, write, read again
///
/// Purpose: Validate the precision-bounded round trip
/// Benefit: Ensures the writer emits a header the reader accepts unchanged
#[test]
fn test_round_trip_preserves_values() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(&dir, "station.nead", STATION);
    let copy = dir.path().join("copy.nead");

    let original = nead::read(&source, false, None).unwrap();
    original
        .write(&copy, &WriteOptions::default().with_float_precision(4))
        .unwrap();
    let reread = nead::read(&copy, false, None).unwrap();

    assert_eq!(reread.header.fields(), original.header.fields());
    assert_eq!(reread.header.delimiter(), original.header.delimiter());
    assert_eq!(
        reread.attribute("station_id"),
        original.attribute("station_id")
    );

    for name in ["TA", "RH", "VW"] {
        let before = float_values(&original, name);
        let after = float_values(&reread, name);
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            match (a, b) {
                (Some(a), Some(b)) => assert_relative_eq!(*a, *b, epsilon = 1e-4),
                (None, None) => {}
                other => panic!("Mismatch in {}: {:?}", name, other),
            }
        }
    }
}

#[test]
fn test_round_trip_with_converted_index() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(&dir, "station.nead", STATION);
    let copy = dir.path().join("converted.nead");

    let options = ReadOptions::default()
        .with_unit_conversion(true)
        .with_index_column(0);
    let dataset = nead::read_with_options(&source, &options).unwrap();
    let header =
        nead::conversion::converted_header(&dataset.header, &dataset.table, &options).unwrap();
    nead::write(&dataset.table, &header, &copy).unwrap();

    let written = std::fs::read_to_string(&copy).unwrap();
    assert!(written.contains("# add_value = 0,0,0,0\n"));
    assert!(written.contains("\n2020-01-01T00:00:00,275.150000,0.500000,1.500000\n"));

    // converting again is a no-op apart from formatting
    let reread = nead::read_with_options(&copy, &options).unwrap();
    assert_relative_eq!(float_values(&reread, "TA")[0].unwrap(), 275.15, epsilon = 1e-6);
    assert_eq!(float_values(&reread, "TA")[1], Some(-999.0));
}

#[test]
fn test_missing_delimiter_declaration() {
    let text = "\
# NEAD 1.0 UTF-8
# [METADATA]
# station_id = WFJ
# [FIELDS]
# fields = a,b
# [DATA]
1,2
";
    match NeadReader::default().read_str(text) {
        Err(NeadError::MissingRequiredAttribute { name }) => {
            assert!(name.contains("field_delimiter"));
        }
        other => panic!("Expected MissingRequiredAttribute, got {:?}", other),
    }
}

#[test]
fn test_vector_length_mismatch_policies() {
    let text = "\
# NEAD 1.0 UTF-8
# [METADATA]
# field_delimiter = ,
# [FIELDS]
# fields = a,b,c
# units = m,s
# [DATA]
1,2,3
";
    match NeadReader::default().read_str(text) {
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
    let dataset = NeadReader::new(lenient).read_str(text).unwrap();
    assert_eq!(
        dataset.attribute("units").and_then(|v| v.as_scalar()),
        Some(&Scalar::Str("m,s".into()))
    );
}

#[test]
fn test_index_out_of_range() {
    let options = ReadOptions::default().with_index_column(7);
    match NeadReader::new(options).read_str(STATION) {
        Err(NeadError::IndexOutOfRange { position, count }) => {
            assert_eq!(position, 7);
            assert_eq!(count, 4);
        }
        other => panic!("Expected IndexOutOfRange, got {:?}", other),
    }
}

#[test]
fn test_masked_nodata_policy() {
    let options = ReadOptions::default()
        .with_unit_conversion(true)
        .with_nodata_policy(NodataPolicy::Mask);
    let dataset = NeadReader::new(options).read_str(STATION).unwrap();
    assert_eq!(float_values(&dataset, "TA")[1], None);
}

#[test]
fn test_flat_grammar_document() {
    let text = "\
# NEAD 1.0 UTF-8
# [HEADER]
# station_name = Weissfluhjoch
# column_delimiter = ;
# fields = time;HS;TSS
# units_multiplier = 1;0.01;1
# units_offset = 0;0;273.15
# comment = snow height; surface temperature
# [DATA]
2021-03-01;120;-2
2021-03-02;118;-4.5
";
    let options = ReadOptions::default()
        .with_grammar(HeaderGrammar::Flat)
        .with_unit_conversion(true)
        .with_index_column(0);
    let dataset = NeadReader::new(options).read_str(text).unwrap();

    // two tokens for three fields: stays a scalar
    assert_eq!(
        dataset.attribute("comment").and_then(|v| v.as_scalar()),
        Some(&Scalar::Str("snow height; surface temperature".into()))
    );
    assert_eq!(dataset.header.delimiter_key(), "column_delimiter");

    let hs = float_values(&dataset, "HS");
    assert_relative_eq!(hs[0].unwrap(), 1.2, epsilon = 1e-12);
    let tss = float_values(&dataset, "TSS");
    assert_relative_eq!(tss[1].unwrap(), 268.65, epsilon = 1e-9);
}

#[test]
fn test_flat_output_is_readable_as_flat() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(&dir, "station.nead", STATION);
    let flat = dir.path().join("flat.nead");

    let dataset = nead::read(&source, false, None).unwrap();
    dataset
        .write(&flat, &WriteOptions::default().with_grammar(HeaderGrammar::Flat))
        .unwrap();

    let options = ReadOptions::default().with_grammar(HeaderGrammar::Flat);
    let reread = nead::read_with_options(&flat, &options).unwrap();
    assert_eq!(reread.header.fields(), dataset.header.fields());
    let rh = reread.table.column("RH").unwrap();
    assert_eq!(rh.attribute("units"), Some(&Scalar::Str("%".into())));
}

#[test]
fn test_write_missing_field_leaves_no_file() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(&dir, "station.nead", STATION);
    let target = dir.path().join("out.nead");

    let options = ReadOptions::default().with_index_column(1);
    let dataset = nead::read_with_options(&source, &options).unwrap();
    let mut header = dataset.header.clone();
    header
        .set_global("comment", Scalar::from("rewritten"))
        .unwrap();

    // index columns count as declared fields
    nead::write(&dataset.table, &header, &target).unwrap();
    assert!(target.exists());

    let invalid = dir.path().join("invalid.nead");
    let fields = nead::FieldSpec::new(["timestamp", "SW"]).unwrap();
    let header = nead::HeaderModel::new(fields, ",").unwrap();
    match nead::write(&dataset.table, &header, &invalid) {
        Err(NeadError::MissingField { field }) => assert_eq!(field, "SW"),
        other => panic!("Expected MissingField, got {:?}", other),
    }
    assert!(!Path::new(&invalid).exists());
}
