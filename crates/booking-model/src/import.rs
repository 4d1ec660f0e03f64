use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ahash::AHashSet;
use booking_columnar::{ColumnSchema, ColumnType, ColumnarTableBuilder, Value, ValueKey};
use csv::ByteRecord;
use encoding_rs::WINDOWS_1252;
use log::{debug, info};

use crate::dataset::Dataset;
use crate::error::DataLoadError;
use crate::schema::booking_columns;

#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// How to decode raw CSV bytes into text fields.
    pub encoding: CsvTextEncoding,
    /// Rows inspected when guessing the type of a column not listed in `required_columns`.
    pub inference_rows: usize,
    /// Columns that must be present, parsed strictly as their declared type.
    pub required_columns: Vec<ColumnSchema>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            encoding: CsvTextEncoding::Auto,
            inference_rows: 100,
            required_columns: booking_columns(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CsvTextEncoding {
    /// Decode as UTF-8; a field with invalid UTF-8 falls back to Windows-1252.
    #[default]
    Auto,
    /// Decode as UTF-8 and reject invalid byte sequences.
    Utf8,
    /// Decode as Windows-1252 (aka CP-1252).
    Windows1252,
}

/// Open `path` and import it with [`import_csv`].
pub fn load_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Dataset, DataLoadError> {
    let path = path.as_ref();
    debug!("loading bookings from {}", path.display());
    let file = File::open(path)?;
    import_csv(BufReader::new(file), options)
}

/// Read a delimited booking file into a deduplicated [`Dataset`].
///
/// Rows whose typed values equal an earlier row are dropped; the first occurrence wins and
/// row order is otherwise preserved. Required columns are parsed strictly (an empty field is
/// null, anything unparsable is an error). Other columns are typed by sampling the first
/// `inference_rows` rows, and values that do not fit the inferred type load as null.
pub fn import_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Dataset, DataLoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut record = ByteRecord::new();
    let mut record_index: u64 = 0;

    let has_first = csv_reader
        .read_byte_record(&mut record)
        .map_err(|e| map_csv_error(e, record_index + 1))?;
    if !has_first {
        return Err(DataLoadError::EmptyInput);
    }
    record_index += 1;

    let mut header_names: Vec<String> = Vec::new();
    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    // 1-based line of each raw row, header included, for error reporting.
    let mut raw_lines: Vec<u64> = Vec::new();

    if options.has_header {
        header_names = decode_record_to_strings(&record, record_index, options.encoding)?;
    } else {
        raw_rows.push(decode_record_to_strings(&record, record_index, options.encoding)?);
        raw_lines.push(record_index);
    }

    loop {
        record.clear();
        match csv_reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                record_index += 1;
                raw_rows.push(decode_record_to_strings(&record, record_index, options.encoding)?);
                raw_lines.push(record_index);
            }
            Err(e) => return Err(map_csv_error(e, record_index + 1)),
        }
    }

    let column_count = raw_rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header_names.len()))
        .max()
        .unwrap_or(0)
        .max(1);
    header_names.extend((header_names.len()..column_count).map(|i| format!("Column{}", i + 1)));
    for row in &mut raw_rows {
        row.resize(column_count, String::new());
    }

    let mut column_types = infer_column_types(&raw_rows, column_count, options.inference_rows);
    let mut strict = vec![false; column_count];
    for required in &options.required_columns {
        let idx = header_names
            .iter()
            .position(|h| h.trim() == required.name)
            .ok_or_else(|| DataLoadError::MissingColumn {
                column: required.name.clone(),
            })?;
        column_types[idx] = required.column_type;
        strict[idx] = true;
    }

    if raw_rows.is_empty() {
        return Err(DataLoadError::NoRows);
    }

    let schema: Vec<ColumnSchema> = header_names
        .iter()
        .zip(column_types.iter().copied())
        .map(|(name, column_type)| ColumnSchema::new(name.trim(), column_type))
        .collect();

    // Duplicates are detected on typed values, so `75` and `75.0` or ` PRT` and `PRT`
    // collapse into one record.
    let read = raw_rows.len();
    let mut seen: AHashSet<Vec<ValueKey>> = AHashSet::with_capacity(read);
    let mut builder = ColumnarTableBuilder::new(schema);
    for (row, line) in raw_rows.iter().zip(raw_lines) {
        let values = parse_row(row, line, &header_names, &column_types, &strict)?;
        if seen.insert(values.iter().map(Value::key).collect()) {
            builder.append_row(&values);
        }
    }
    let duplicates = read - builder.row_count();

    info!(
        "loaded {} booking rows ({} read, {} duplicates dropped, {} columns)",
        builder.row_count(),
        read,
        duplicates,
        column_count
    );
    Ok(Dataset::new(builder.finalize()))
}

fn parse_row(
    row: &[String],
    line: u64,
    header_names: &[String],
    column_types: &[ColumnType],
    strict: &[bool],
) -> Result<Vec<Value>, DataLoadError> {
    let mut values = Vec::with_capacity(row.len());
    for (col, field) in row.iter().enumerate() {
        let column_type = column_types[col];
        let value = match parse_typed_value(field, column_type) {
            Some(v) => v,
            None if strict[col] => {
                return Err(DataLoadError::InvalidField {
                    row: line,
                    column: header_names[col].trim().to_owned(),
                    column_type,
                    value: field.clone(),
                })
            }
            None => Value::Null,
        };
        values.push(value);
    }
    Ok(values)
}

/// `None` means the field is present but not a valid `column_type`. Empty fields are null.
fn parse_typed_value(v: &str, column_type: ColumnType) -> Option<Value> {
    let v = v.trim();
    if v.is_empty() {
        return Some(Value::Null);
    }
    match column_type {
        ColumnType::Number => parse_number_f64(v).map(Value::Number),
        ColumnType::Boolean => parse_bool(v).map(Value::Boolean),
        ColumnType::String => Some(Value::from(v)),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_number_f64(v: &str) -> Option<f64> {
    v.trim().parse::<f64>().ok()
}

fn infer_column_types(rows: &[Vec<String>], column_count: usize, sample: usize) -> Vec<ColumnType> {
    let mut out = Vec::with_capacity(column_count);
    for col in 0..column_count {
        let mut is_bool = true;
        let mut saw_text_bool = false;
        let mut is_number = true;

        for row in rows.iter().take(sample) {
            let v = row.get(col).map(|s| s.trim()).unwrap_or("");
            if v.is_empty() {
                continue;
            }
            match parse_bool(v) {
                Some(_) => {
                    if v != "0" && v != "1" {
                        saw_text_bool = true;
                    }
                }
                None => is_bool = false,
            }
            if parse_number_f64(v).is_none() {
                is_number = false;
            }
        }

        let ty = if is_bool && saw_text_bool {
            ColumnType::Boolean
        } else if is_number {
            ColumnType::Number
        } else {
            ColumnType::String
        };
        out.push(ty);
    }
    out
}

fn decode_record_to_strings(
    record: &ByteRecord,
    row: u64,
    encoding: CsvTextEncoding,
) -> Result<Vec<String>, DataLoadError> {
    let mut out = Vec::with_capacity(record.len());
    for (idx, field) in record.iter().enumerate() {
        let s = decode_field(field, row, idx, encoding)?;
        out.push(s.into_owned());
    }
    Ok(out)
}

fn decode_field<'a>(
    field: &'a [u8],
    row: u64,
    column: usize,
    encoding: CsvTextEncoding,
) -> Result<Cow<'a, str>, DataLoadError> {
    // UTF-8 BOM at the start of the file.
    let field = if row == 1 && column == 0 && field.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &field[3..]
    } else {
        field
    };

    match encoding {
        CsvTextEncoding::Utf8 => {
            std::str::from_utf8(field)
                .map(Cow::Borrowed)
                .map_err(|e| DataLoadError::Parse {
                    row,
                    column: format!("#{}", column + 1),
                    reason: format!("invalid UTF-8: {e}"),
                })
        }
        CsvTextEncoding::Windows1252 => {
            let (cow, _, _) = WINDOWS_1252.decode(field);
            Ok(cow)
        }
        CsvTextEncoding::Auto => match std::str::from_utf8(field) {
            Ok(s) => Ok(Cow::Borrowed(s)),
            Err(_) => {
                let (cow, _, _) = WINDOWS_1252.decode(field);
                Ok(cow)
            }
        },
    }
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> DataLoadError {
    let reason = err.to_string();
    let pos = err.position().cloned();

    match err.into_kind() {
        csv::ErrorKind::Io(e) => DataLoadError::Io(e),
        _ => {
            let row = pos
                .map(|p| p.record())
                .filter(|r| *r > 0)
                .unwrap_or(fallback_row);
            DataLoadError::Parse {
                row,
                column: String::new(),
                reason,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_text_and_digits() {
        assert_eq!(parse_bool(" True "), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn inference_needs_text_for_booleans() {
        let rows = vec![
            vec!["1".to_owned(), "true".to_owned(), "PT".to_owned()],
            vec!["0".to_owned(), "False".to_owned(), "".to_owned()],
        ];
        assert_eq!(
            infer_column_types(&rows, 3, 100),
            vec![ColumnType::Number, ColumnType::Boolean, ColumnType::String]
        );
    }

    #[test]
    fn windows_1252_fallback_in_auto_mode() {
        let field = b"S\xe3o Tom\xe9";
        let decoded = decode_field(field, 2, 0, CsvTextEncoding::Auto).unwrap();
        assert_eq!(decoded, "São Tomé");
        assert!(decode_field(field, 2, 0, CsvTextEncoding::Utf8).is_err());
    }
}
