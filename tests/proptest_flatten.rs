//! Property-based tests for column compilation and flattening.
//!
//! Uses proptest to verify that:
//! - Compiled column names are always unique
//! - Repeated field names get ` (k)` suffixes in field order
//! - Column selection follows the requested order
//! - Paths through missing keys resolve to nothing
//! - Every CSV record has as many cells as the header

use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use tracing::info;

use jira_csv::flatten::{FlattenOptions, ResolveOptions, flatten_row, resolve, truncate_description};
use jira_csv::format::write_csv;
use jira_csv::model::{FieldMetadata, FieldPath, FieldSchema};
use jira_csv::schema::{BUILTIN_COLUMNS, CompileOptions, compile, select_columns};

/// Initialize test logging for proptest (called once per test)
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

fn schema_strategy() -> impl Strategy<Value = FieldSchema> {
    prop_oneof![
        Just(FieldSchema::new("string")),
        Just(FieldSchema::new("user")),
        Just(FieldSchema::new("array").with_items("user")),
        Just(FieldSchema::new("option")),
    ]
}

/// Names drawn from a tiny pool so collisions are common, including with
/// built-in columns and with names generated from user fields.
fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Team".to_string()),
        Just("Team Name".to_string()),
        Just("Reporter".to_string()),
        Just("Summary".to_string()),
        Just("Key (2)".to_string()),
        "[A-Z][a-z]{2,6}",
    ]
}

fn fields_strategy() -> impl Strategy<Value = Vec<FieldMetadata>> {
    prop::collection::vec((name_strategy(), schema_strategy()), 0..24).prop_map(|fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (name, schema))| FieldMetadata::new(format!("customfield_{i}"), name, schema))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..Default::default()
    })]

    /// Property: No two compiled columns share a name
    #[test]
    fn compiled_names_are_unique(fields in fields_strategy()) {
        init_test_logging();
        let columns = compile(&fields, &[], CompileOptions::default());
        info!("proptest_compile_unique: fields={} columns={}", fields.len(), columns.len());

        let mut seen = HashSet::new();
        for column in &columns {
            prop_assert!(seen.insert(column.name.clone()), "duplicate column {}", column.name);
        }
        prop_assert!(columns.len() >= BUILTIN_COLUMNS.len() + fields.len());
    }

    /// Property: The k-th field sharing a fresh name is suffixed with ` (k)`
    #[test]
    fn repeated_names_are_numbered_in_order(repeats in 1usize..12) {
        init_test_logging();
        let fields: Vec<FieldMetadata> = (0..repeats)
            .map(|i| FieldMetadata::new(format!("customfield_{i}"), "Squad", FieldSchema::new("string")))
            .collect();
        let columns = compile(&fields, &[], CompileOptions::default());
        let custom: Vec<&str> = columns[BUILTIN_COLUMNS.len()..]
            .iter()
            .map(|column| column.name.as_str())
            .collect();

        prop_assert_eq!(custom[0], "Squad");
        for (k, name) in custom.iter().enumerate().skip(1) {
            prop_assert_eq!(name.to_string(), format!("Squad ({})", k + 1));
        }
    }

    /// Property: Selection yields requested names once each, in first-request order
    #[test]
    fn selection_follows_request_order(
        picks in prop::collection::vec(
            prop_oneof![
                (0..BUILTIN_COLUMNS.len()).prop_map(|i| BUILTIN_COLUMNS[i].0.to_string()),
                "[a-z]{3,8}",
            ],
            0..16,
        )
    ) {
        init_test_logging();
        let selection = select_columns(compile(&[], &[], CompileOptions::default()), &picks);

        let mut expected: Vec<&str> = Vec::new();
        for pick in &picks {
            if !expected.contains(&pick.as_str()) {
                expected.push(pick);
            }
        }
        let names: Vec<&str> = selection.columns.iter().map(|c| c.name.as_str()).collect();
        prop_assert_eq!(names, expected);

        for column in &selection.columns {
            let known = BUILTIN_COLUMNS.iter().any(|(name, _)| *name == column.name);
            prop_assert_eq!(column.is_placeholder(), !known);
            prop_assert_eq!(selection.missing.contains(&column.name), !known);
        }
    }

    /// Property: A path whose first key is absent resolves to nothing
    #[test]
    fn missing_branch_resolves_empty(key in "[a-z]{1,10}", rest in prop::collection::vec("[a-z]{1,5}", 0..4)) {
        init_test_logging();
        let issue = json!({"fields": {"labels": ["a", "b"]}, "key": "ENG-1"});
        prop_assume!(key != "fields" && key != "key");

        let path = FieldPath::from_segments(std::iter::once(key).chain(rest));
        prop_assert!(resolve(&issue, &path, ResolveOptions::default()).is_empty());
    }

    /// Property: Truncated descriptions are exactly `max` characters long
    #[test]
    fn truncation_hits_the_limit(description in "\\PC{0,80}", max in 3usize..60) {
        init_test_logging();
        match truncate_description(&description, max) {
            Some(truncated) => {
                prop_assert!(description.chars().count() > max);
                prop_assert_eq!(truncated.chars().count(), max);
                prop_assert!(truncated.ends_with("..."));
            }
            None => prop_assert!(description.chars().count() <= max),
        }
    }

    /// Property: Flattened rows always fill every column, whatever the cell text
    #[test]
    fn csv_records_match_header_width(
        summaries in prop::collection::vec("\\PC{0,40}", 1..10),
        remove_new_lines in any::<bool>(),
    ) {
        init_test_logging();
        let columns = compile(&[], &[], CompileOptions::default());
        let options = FlattenOptions { remove_new_lines, ..FlattenOptions::default() };
        let rows: Vec<_> = summaries
            .iter()
            .map(|summary| flatten_row(&json!({"key": "ENG-1", "fields": {"summary": summary}}), &columns, &options))
            .collect();
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let mut out = Vec::new();
        let written = write_csv(&mut out, &names, &rows).expect("write csv");
        prop_assert_eq!(written, rows.len());

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let mut count = 0;
        for record in reader.records() {
            let record = record.expect("record");
            prop_assert_eq!(record.len(), names.len());
            count += 1;
        }
        prop_assert_eq!(count, summaries.len());
    }
}
