use std::{collections::HashSet, fmt};

use serde::Serialize;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::error::{CensusError, Result};

/// A single cell. `Missing` is neither an empty string nor zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{n:.0}")
                } else {
                    n.to_string()
                }
            }
            Value::Missing => String::new(),
        }
    }

    /// Text for delimited output. Numbers keep at most two decimals, the most
    /// a single decimal separator can carry and still read back as a decimal.
    pub fn as_export(&self) -> String {
        match self {
            Value::Number(n) => format_decimal(*n, EXPORT_DECIMALS),
            other => other.as_display(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(n) if n.is_finite() => Value::Number(n),
            _ => Value::Missing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Text => "text",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Builds a text column; useful in tests and for small literal tables.
    pub fn from_texts<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|v| Value::Text(v.into())).collect();
        Self::new(name, ColumnKind::Text, values)
    }

    pub fn from_numbers<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let values = values.into_iter().map(Value::from).collect();
        Self::new(name, ColumnKind::Numeric, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row index and value of every finite numeric cell.
    pub fn numbers(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| value.as_number().map(|n| (idx, n)))
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    pub fn ensure_numeric(&self) -> Result<()> {
        if self.kind == ColumnKind::Numeric {
            Ok(())
        } else {
            Err(CensusError::NotNumeric {
                name: self.name.clone(),
                kind: self.kind.to_string(),
            })
        }
    }
}

/// Column-oriented table with a row count shared by every column.
///
/// Operations that change the table consume it and hand back a new one, so a
/// table is never observable in a half-updated state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(CensusError::DuplicateColumn(column.name.clone()));
            }
            if column.len() != row_count {
                return Err(CensusError::LengthMismatch {
                    name: column.name.clone(),
                    expected: row_count,
                    found: column.len(),
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`Table::column`] but reports an unknown name as an error.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| CensusError::UnknownColumn(name.to_string()))
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric)
    }

    /// Swaps in a column with the same name, keeping its position.
    pub fn replace_column(mut self, column: Column) -> Result<Self> {
        self.check_length(&column)?;
        let idx = self
            .column_index(&column.name)
            .ok_or_else(|| CensusError::UnknownColumn(column.name.clone()))?;
        self.columns[idx] = column;
        Ok(self)
    }

    pub fn push_column(mut self, column: Column) -> Result<Self> {
        if self.column_index(&column.name).is_some() {
            return Err(CensusError::DuplicateColumn(column.name));
        }
        if self.columns.is_empty() {
            self.row_count = column.len();
        } else {
            self.check_length(&column)?;
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Keeps the rows whose entry in `mask` is `true`, preserving order.
    pub fn retain_rows(self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.row_count {
            return Err(CensusError::InvalidArgument(format!(
                "Row mask has {} entries but the table has {} row(s)",
                mask.len(),
                self.row_count
            )));
        }
        let kept = mask.iter().filter(|keep| **keep).count();
        let columns = self
            .columns
            .into_iter()
            .map(|column| {
                let values = column
                    .values
                    .into_iter()
                    .zip(mask)
                    .filter_map(|(value, keep)| keep.then_some(value))
                    .collect();
                Column::new(column.name, column.kind, values)
            })
            .collect();
        Ok(Self {
            columns,
            row_count: kept,
        })
    }

    /// Renders up to `limit` rows as display strings (0 renders every row).
    pub fn display_rows(&self, limit: usize) -> Vec<Vec<String>> {
        let take = if limit == 0 {
            self.row_count
        } else {
            limit.min(self.row_count)
        };
        (0..take)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| column.values[row].as_display())
                    .collect()
            })
            .collect()
    }

    /// Every row as delimited-output text, see [`Value::as_export`].
    pub fn export_rows(&self) -> Vec<Vec<String>> {
        (0..self.row_count)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| column.values[row].as_export())
                    .collect()
            })
            .collect()
    }

    fn check_length(&self, column: &Column) -> Result<()> {
        if column.len() != self.row_count {
            return Err(CensusError::LengthMismatch {
                name: column.name.clone(),
                expected: self.row_count,
                found: column.len(),
            });
        }
        Ok(())
    }
}

/// Canonical header form: trimmed, accents removed, uppercase.
///
/// Applying it twice gives the same result as applying it once.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

pub const EXPORT_DECIMALS: usize = 2;

/// Rounds to `places` decimals and drops trailing zeros.
pub fn format_decimal(value: f64, places: usize) -> String {
    let formatted = format!("{value:.places$}");
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let formatted = format!("{value:.4}");
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
