//! Delimited text → [`Table`].
//!
//! The delimiter is fixed per dataset and never sniffed. Header names are
//! normalized with [`normalize_column_name`] so that `Área`, ` AREA ` and
//! `area` all address the same column downstream. Ragged rows are rejected
//! rather than padded.

use std::path::Path;

use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::{Column, ColumnKind, Table, Value, normalize_column_name},
    error::{CensusError, Result},
    io_utils,
};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub delimiter: u8,
    /// Tried in order; the first strict decode wins.
    pub encodings: Vec<&'static Encoding>,
    pub trim_cells: bool,
    pub empty_as_missing: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_DELIMITER,
            encodings: io_utils::default_encodings(),
            trim_cells: true,
            empty_as_missing: true,
        }
    }
}

impl IngestOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encodings(mut self, encodings: Vec<&'static Encoding>) -> Self {
        self.encodings = encodings;
        self
    }
}

pub fn read_path(path: &Path, options: &IngestOptions) -> Result<Table> {
    let bytes = io_utils::read_input(path)?;
    let table = read_table(&bytes, options)?;
    info!(
        "Loaded {} row(s) x {} column(s) from {:?}",
        table.row_count(),
        table.column_count(),
        path
    );
    Ok(table)
}

/// Parses raw bytes into a text-only table. `bytes` is not modified.
pub fn read_table(bytes: &[u8], options: &IngestOptions) -> Result<Table> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CensusError::EmptyTable("input contains no data".to_string()));
    }
    let (text, encoding) = io_utils::decode_with_fallback(bytes, &options.encodings)?;
    debug!("Parsing table decoded as {}", encoding.name());

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(if options.trim_cells {
            csv::Trim::All
        } else {
            csv::Trim::None
        })
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()?
        .iter()
        .map(normalize_column_name)
        .collect::<Vec<_>>();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(CensusError::EmptyTable("header row is empty".to_string()));
    }
    let expected = headers.len();

    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); expected];
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != expected {
            return Err(CensusError::MalformedRow {
                row: row_idx + 2,
                expected,
                found: record.len(),
            });
        }
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(to_cell(field, options.empty_as_missing));
        }
    }
    if cells[0].is_empty() {
        return Err(CensusError::EmptyTable(
            "header present but no data rows".to_string(),
        ));
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::new(name, ColumnKind::Text, values))
        .collect();
    Table::new(columns)
}

fn to_cell(field: &str, empty_as_missing: bool) -> Value {
    if field.is_empty() && empty_as_missing {
        Value::Missing
    } else {
        Value::Text(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    #[test]
    fn header_names_are_normalized() {
        let table = read_table(
            "  uf ;Área;valor\nSP;1;2\n".as_bytes(),
            &IngestOptions::default().with_encodings(vec![UTF_8]),
        )
        .unwrap();
        assert_eq!(table.headers(), vec!["UF", "AREA", "VALOR"]);
    }

    #[test]
    fn empty_fields_become_missing() {
        let table = read_table(
            b"UF;VALOR\nSP;\n",
            &IngestOptions::default(),
        )
        .unwrap();
        assert_eq!(table.column("VALOR").unwrap().values, vec![Value::Missing]);
    }

    #[test]
    fn empty_fields_stay_text_when_requested() {
        let options = IngestOptions {
            empty_as_missing: false,
            ..IngestOptions::default()
        };
        let table = read_table(b"UF;VALOR\nSP;\n", &options).unwrap();
        assert_eq!(
            table.column("VALOR").unwrap().values,
            vec![Value::text("")]
        );
    }

    #[test]
    fn ragged_row_reports_record_number() {
        let err = read_table(b"UF;VALOR\nSP;1\nMG\n", &IngestOptions::default()).unwrap_err();
        match err {
            CensusError::MalformedRow {
                row,
                expected,
                found,
            } => {
                assert_eq!(row, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
