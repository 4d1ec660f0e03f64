use booking_columnar::{
    AggSpec, ColumnSchema, ColumnType, ColumnarTable, ColumnarTableBuilder, RowMask, Value,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn build_table(schema: Vec<ColumnSchema>, rows: Vec<Vec<Value>>) -> ColumnarTable {
    let mut builder = ColumnarTableBuilder::new(schema);
    for row in rows {
        builder.append_row(&row);
    }
    builder.finalize()
}

fn key_value_schema() -> Vec<ColumnSchema> {
    vec![
        ColumnSchema::new("k", ColumnType::String),
        ColumnSchema::new("v", ColumnType::Number),
    ]
}

fn lookup(cols: &[Vec<Value>], measure: usize) -> HashMap<String, Value> {
    (0..cols[0].len())
        .map(|r| {
            let key = match &cols[0][r] {
                Value::Null => "<null>".to_owned(),
                other => other.to_string(),
            };
            (key, cols[measure][r].clone())
        })
        .collect()
}

#[test]
fn group_by_empty_table_is_empty() {
    let table = ColumnarTableBuilder::new(key_value_schema()).finalize();

    let result = table
        .group_by(&[0], &[AggSpec::count_rows(), AggSpec::sum_f64(1)])
        .unwrap();

    assert_eq!(result.row_count(), 0);
    assert_eq!(result.column_count(), 3);
    assert!(result.to_values().iter().all(|c| c.is_empty()));
}

#[test]
fn group_by_preserves_first_seen_key_order() {
    let rows = ["City", "Resort", "City", "Alpha", "Resort"]
        .iter()
        .map(|k| vec![Value::from(*k), Value::Number(1.0)])
        .collect();
    let table = build_table(key_value_schema(), rows);

    let result = table.group_by(&[0], &[AggSpec::count_rows()]).unwrap();
    assert_eq!(
        result.column(0).unwrap(),
        &[Value::from("City"), Value::from("Resort"), Value::from("Alpha")]
    );
    assert_eq!(
        result.column(1).unwrap(),
        &[Value::Number(2.0), Value::Number(2.0), Value::Number(1.0)]
    );
}

#[test]
fn group_by_handles_null_keys_and_null_values() {
    let rows = vec![
        vec![Value::from("A"), Value::Number(1.0)],
        vec![Value::Null, Value::Number(2.0)],
        vec![Value::Null, Value::Null],
        vec![Value::from("A"), Value::Number(3.0)],
        vec![Value::from("B"), Value::Null],
    ];
    let table = build_table(key_value_schema(), rows);

    let result = table
        .group_by(
            &[0],
            &[
                AggSpec::count_rows().with_name("cnt_rows"),
                AggSpec::count_non_null(1).with_name("cnt_nn"),
                AggSpec::sum_f64(1),
                AggSpec::min(1),
                AggSpec::max(1),
            ],
        )
        .unwrap();
    assert_eq!(result.row_count(), 3);
    let cols = result.to_values();

    let rows = lookup(&cols, 1);
    assert_eq!(rows["A"], Value::Number(2.0));
    assert_eq!(rows["<null>"], Value::Number(2.0));
    assert_eq!(rows["B"], Value::Number(1.0));

    let non_null = lookup(&cols, 2);
    assert_eq!(non_null["A"], Value::Number(2.0));
    assert_eq!(non_null["<null>"], Value::Number(1.0));
    assert_eq!(non_null["B"], Value::Number(0.0));

    let sums = lookup(&cols, 3);
    assert_eq!(sums["A"], Value::Number(4.0));
    assert_eq!(sums["B"], Value::Null);

    assert_eq!(lookup(&cols, 4)["A"], Value::Number(1.0));
    assert_eq!(lookup(&cols, 5)["A"], Value::Number(3.0));
    assert_eq!(lookup(&cols, 5)["B"], Value::Null);
}

#[test]
fn group_by_avg_ignores_nulls_and_is_null_without_values() {
    let rows = vec![
        vec![Value::from("A"), Value::Number(1.0)],
        vec![Value::from("A"), Value::Null],
        vec![Value::from("A"), Value::Number(3.0)],
        vec![Value::from("B"), Value::Null],
    ];
    let table = build_table(key_value_schema(), rows);

    let result = table
        .group_by(&[0], &[AggSpec::avg_f64(1).with_name("avg")])
        .unwrap();
    let avg = lookup(&result.to_values(), 1);
    assert_eq!(avg["A"], Value::Number(2.0));
    assert_eq!(avg["B"], Value::Null);
}

#[test]
fn group_by_distinct_count_ignores_nulls() {
    let rows = vec![
        vec![Value::from("A"), Value::Number(1.0)],
        vec![Value::from("A"), Value::Number(1.0)],
        vec![Value::from("A"), Value::Null],
        vec![Value::from("A"), Value::Number(2.0)],
        vec![Value::from("C"), Value::Null],
    ];
    let table = build_table(key_value_schema(), rows);

    let result = table
        .group_by(&[0], &[AggSpec::distinct_count(1)])
        .unwrap();
    let distinct = lookup(&result.to_values(), 1);
    assert_eq!(distinct["A"], Value::Number(2.0));
    assert_eq!(distinct["C"], Value::Number(0.0));
}

#[test]
fn group_by_multiple_keys() {
    let schema = vec![
        ColumnSchema::new("month", ColumnType::String),
        ColumnSchema::new("month_num", ColumnType::Number),
        ColumnSchema::new("adr", ColumnType::Number),
    ];
    let rows = vec![
        vec![Value::from("July"), Value::Number(7.0), Value::Number(100.0)],
        vec![Value::from("January"), Value::Number(1.0), Value::Number(50.0)],
        vec![Value::from("July"), Value::Number(7.0), Value::Number(120.0)],
    ];
    let table = build_table(schema, rows);

    let result = table
        .group_by(&[0, 1], &[AggSpec::avg_f64(2)])
        .unwrap();
    assert_eq!(
        result.to_values(),
        vec![
            vec![Value::from("July"), Value::from("January")],
            vec![Value::Number(7.0), Value::Number(1.0)],
            vec![Value::Number(110.0), Value::Number(50.0)],
        ]
    );
}

#[test]
fn group_by_mask_matches_group_by_on_materialized_rows() {
    let rows = vec![
        vec![Value::from("A"), Value::Number(1.0)],
        vec![Value::from("B"), Value::Number(2.0)],
        vec![Value::Null, Value::Number(3.0)],
        vec![Value::from("A"), Value::Null],
        vec![Value::from("C"), Value::Number(4.0)],
    ];
    let table = build_table(key_value_schema(), rows);

    let selected = [0usize, 2, 3, 4];
    let mask = RowMask::from_rows(table.row_count(), selected);
    let aggs = [AggSpec::count_rows(), AggSpec::sum_f64(1)];

    let expected = table
        .filter_table(&mask)
        .unwrap()
        .group_by(&[0], &aggs)
        .unwrap()
        .to_values();
    let by_mask = table.group_by_mask(&[0], &aggs, &mask).unwrap().to_values();
    let by_rows = table.group_by_rows(&[0], &aggs, &selected).unwrap().to_values();

    assert_eq!(by_mask, expected);
    assert_eq!(by_rows, expected);
}

#[test]
fn group_by_counts_sum_to_row_count() {
    let keys = ["PT", "GB", "FR", "PT", "ES", "GB", "PT"];
    let rows = keys
        .iter()
        .map(|k| vec![Value::from(*k), Value::Number(1.0)])
        .collect();
    let table = build_table(key_value_schema(), rows);

    let result = table.group_by(&[0], &[AggSpec::count_non_null(0)]).unwrap();
    let total: f64 = result
        .column(1)
        .unwrap()
        .iter()
        .filter_map(Value::as_f64)
        .sum();
    assert_eq!(total as usize, table.row_count());
}
