use booking_columnar::{ColumnType, Value};
use booking_model::schema::{ADR, ASSIGNED_ROOM_STATUS, COUNTRY, HOTEL, IS_CANCELED};
use booking_model::{import_csv, CsvOptions, DataLoadError};
use pretty_assertions::assert_eq;

const HEADER: &str = "hotel,is_canceled,country,meal,deposit_type,customer_type,market_segment,\
assigned_room_status,arrival_date_month,arrival_month_num,is_repeated_guest,adr,adults";

fn csv(rows: &[&str]) -> String {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

const ROW_A: &str = "Resort Hotel,0,PRT,BB,No Deposit,Transient,Direct,True,July,7,0,75.5,2";
const ROW_B: &str = "City Hotel,1,GBR,HB,Non Refund,Group,Groups,False,August,8,0,120,1";
const ROW_C: &str = "City Hotel,0,,BB,No Deposit,Transient,Online TA,True,July,7,1,,2";

#[test]
fn imports_booking_rows_with_declared_types() {
    let data = csv(&[ROW_A, ROW_B, ROW_C]);
    let dataset = import_csv(data.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(dataset.len(), 3);

    let table = dataset.table();
    let col = |name: &str| dataset.column_index(name).unwrap();
    assert_eq!(table.column_type(col(IS_CANCELED)), Some(ColumnType::Number));
    assert_eq!(
        table.column_type(col(ASSIGNED_ROOM_STATUS)),
        Some(ColumnType::Boolean)
    );

    assert_eq!(table.get_cell(0, col(HOTEL)), Value::from("Resort Hotel"));
    assert_eq!(table.get_cell(0, col(ADR)), Value::Number(75.5));
    assert_eq!(table.get_cell(1, col(IS_CANCELED)), Value::Number(1.0));
    assert_eq!(
        table.get_cell(1, col(ASSIGNED_ROOM_STATUS)),
        Value::Boolean(false)
    );
    assert_eq!(table.get_cell(2, col(COUNTRY)), Value::Null);
    assert_eq!(table.get_cell(2, col(ADR)), Value::Null);
}

#[test]
fn exact_duplicate_rows_keep_first_occurrence() {
    let data = csv(&[ROW_A, ROW_B, ROW_A, ROW_C, ROW_B]);
    let dataset = import_csv(data.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(dataset.len(), 3);

    let hotels: Vec<String> = dataset
        .rows()
        .map(|r| r[dataset.column_index(HOTEL).unwrap()].to_string())
        .collect();
    assert_eq!(hotels, vec!["Resort Hotel", "City Hotel", "City Hotel"]);
}

#[test]
fn duplicate_rows_give_the_same_fingerprint_as_deduplicated_input() {
    let with_dupes = csv(&[ROW_A, ROW_A, ROW_B]);
    let clean = csv(&[ROW_A, ROW_B]);
    let a = import_csv(with_dupes.as_bytes(), &CsvOptions::default()).unwrap();
    let b = import_csv(clean.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn rows_equal_after_typing_are_duplicates() {
    let data = csv(&[
        "Resort Hotel,0,PRT,BB,No Deposit,Transient,Direct,True,July,7,0,75,2",
        "Resort Hotel,0, PRT,BB,No Deposit,Transient,Direct,true,July,7,0,75.0,2",
        "Resort Hotel,0.0,PRT ,BB,No Deposit,Transient,Direct,TRUE,July,7,0,75.00,2",
    ]);
    let dataset = import_csv(data.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(dataset.len(), 1);
    let row = dataset.row(0).unwrap();
    assert_eq!(row[dataset.column_index(COUNTRY).unwrap()], Value::from("PRT"));
    assert_eq!(row[dataset.column_index(ADR).unwrap()], Value::Number(75.0));
}

#[test]
fn missing_required_column_is_reported_by_name() {
    let data = "hotel,is_canceled\nResort Hotel,0\n";
    let err = import_csv(data.as_bytes(), &CsvOptions::default()).unwrap_err();
    match err {
        DataLoadError::MissingColumn { column } => assert_eq!(column, "country"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn empty_input_is_an_error() {
    let err = import_csv("".as_bytes(), &CsvOptions::default()).unwrap_err();
    assert!(matches!(err, DataLoadError::EmptyInput), "{err:?}");
}

#[test]
fn header_without_rows_is_an_error() {
    let data = csv(&[]);
    let err = import_csv(data.as_bytes(), &CsvOptions::default()).unwrap_err();
    assert!(matches!(err, DataLoadError::NoRows), "{err:?}");
}

#[test]
fn unparsable_required_field_reports_its_line() {
    let bad = "City Hotel,maybe,GBR,HB,Non Refund,Group,Groups,False,August,8,0,120,1";
    let data = csv(&[ROW_A, bad]);
    let err = import_csv(data.as_bytes(), &CsvOptions::default()).unwrap_err();
    match err {
        DataLoadError::InvalidField {
            row,
            column,
            column_type,
            value,
        } => {
            assert_eq!(row, 3);
            assert_eq!(column, IS_CANCELED);
            assert_eq!(column_type, ColumnType::Number);
            assert_eq!(value, "maybe");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn extra_columns_are_typed_by_inference() {
    let data = "\
name,score,vip
a,1.5,true
b,,False
c,x,
";
    let options = CsvOptions {
        required_columns: Vec::new(),
        ..CsvOptions::default()
    };
    let dataset = import_csv(data.as_bytes(), &options).unwrap();
    let table = dataset.table();
    assert_eq!(table.column_type(0), Some(ColumnType::String));
    assert_eq!(table.column_type(1), Some(ColumnType::String));
    assert_eq!(table.column_type(2), Some(ColumnType::Boolean));
    assert_eq!(table.get_cell(1, 2), Value::Boolean(false));
    assert_eq!(table.get_cell(2, 2), Value::Null);

    let sampled_only_first_row = CsvOptions {
        inference_rows: 1,
        ..options
    };
    let dataset = import_csv(data.as_bytes(), &sampled_only_first_row).unwrap();
    let table = dataset.table();
    assert_eq!(table.column_type(1), Some(ColumnType::Number));
    assert_eq!(table.get_cell(0, 1), Value::Number(1.5));
    assert_eq!(table.get_cell(2, 1), Value::Null);
}

#[test]
fn semicolon_delimited_input() {
    let data = "hotel;adr\nCity Hotel;99.5\n";
    let options = CsvOptions {
        delimiter: b';',
        required_columns: vec![booking_columnar::ColumnSchema::new(
            ADR,
            ColumnType::Number,
        )],
        ..CsvOptions::default()
    };
    let dataset = import_csv(data.as_bytes(), &options).unwrap();
    assert_eq!(dataset.row(0), Some(vec![Value::from("City Hotel"), Value::Number(99.5)]));
}
