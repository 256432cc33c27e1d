//! Property tests for CSV parsing

use fileshipper_ingest::format::csv::CsvParser;
use fileshipper_ingest::CsvOptions;
use proptest::prelude::*;
use serde_json::Value;
use std::path::Path;

/// Up to eight rows of two to six fields; fields are short and may be empty
fn table() -> impl Strategy<Value = (usize, Vec<Vec<String>>)> {
    (2usize..=6).prop_flat_map(|columns| {
        let row = prop::collection::vec("[a-z0-9 ]{0,6}", columns);
        (Just(columns), prop::collection::vec(row, 0..8))
    })
}

fn render(columns: usize, rows: &[Vec<String>]) -> String {
    let header: Vec<String> = (0..columns).map(|i| format!("col{}", i)).collect();
    let mut text = header.join(",");
    text.push('\n');
    for row in rows {
        text.push_str(&row.join(","));
        text.push('\n');
    }
    text
}

proptest! {
    #[test]
    fn prop_one_record_per_row_with_empty_as_null((columns, rows) in table()) {
        let input = render(columns, &rows);
        let records = CsvParser::new(CsvOptions::default())
            .parse_reader(Path::new("generated.csv"), input.as_bytes())
            .unwrap();

        prop_assert_eq!(records.len(), rows.len());
        for (record, row) in records.iter().zip(&rows) {
            prop_assert_eq!(record.len(), columns);
            for (i, field) in row.iter().enumerate() {
                let value = &record[&format!("col{}", i)];
                if field.is_empty() {
                    prop_assert_eq!(value, &Value::Null);
                } else {
                    prop_assert_eq!(value, &Value::String(field.clone()));
                }
            }
        }
    }

    #[test]
    fn prop_short_rows_are_rejected(columns in 3usize..=6, keep in 1usize..=2) {
        let header: Vec<String> = (0..columns).map(|i| format!("col{}", i)).collect();
        let row: Vec<&str> = vec!["x"; keep];
        let input = format!("{}\n{}\n", header.join(","), row.join(","));

        let err = CsvParser::new(CsvOptions::default())
            .parse_reader(Path::new("generated.csv"), input.as_bytes())
            .unwrap_err();
        prop_assert!(err.is_data_format());
    }
}
