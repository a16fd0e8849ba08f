//! Locale-formatted numeric text → `f64`.
//!
//! Census extracts mix `1.234,56` (pt-BR) with `1234.56` and bare integers,
//! sometimes in the same column. One fixed separator policy resolves all of
//! them:
//!
//! * both `.` and `,` present: the last separator is the decimal point and
//!   every other separator is grouping;
//! * one symbol present more than once: every occurrence is grouping;
//! * one symbol present exactly once: decimal point when followed by exactly
//!   one or two digits, grouping otherwise (`1.234` is one thousand two
//!   hundred thirty-four).
//!
//! Anything else in the cell (currency symbols, spaces, signs, footnote
//! markers) is discarded before the policy runs. A cell that still does not
//! parse becomes [`Value::Missing`]; nothing here ever returns an error per
//! cell.

use log::debug;

use crate::{
    data::{Column, ColumnKind, Table, Value},
    error::Result,
};

const GROUP_OR_DECIMAL: [char; 2] = ['.', ','];

/// Canonicalizes a single text cell.
pub fn canonicalize_text(raw: &str) -> Value {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || GROUP_OR_DECIMAL.contains(c))
        .collect();
    if kept.is_empty() {
        return Value::Missing;
    }
    let Some(plain) = apply_separator_policy(&kept) else {
        return Value::Missing;
    };
    match plain.parse::<f64>() {
        Ok(value) if value.is_finite() => Value::Number(value),
        _ => Value::Missing,
    }
}

/// Canonicalizes any cell: text is parsed, numbers and `Missing` pass through.
pub fn canonicalize_value(value: &Value) -> Value {
    match value {
        Value::Text(raw) => canonicalize_text(raw),
        Value::Number(n) if n.is_finite() => Value::Number(*n),
        Value::Number(_) | Value::Missing => Value::Missing,
    }
}

pub fn canonicalize_column(column: &Column) -> Column {
    let values: Vec<Value> = column.values.iter().map(canonicalize_value).collect();
    let lost = values
        .iter()
        .zip(&column.values)
        .filter(|(after, before)| after.is_missing() && !before.is_missing())
        .count();
    if lost > 0 {
        debug!(
            "Column '{}': {lost} cell(s) did not parse as numbers and are now missing",
            column.name
        );
    }
    Column::new(column.name.clone(), ColumnKind::Numeric, values)
}

/// Canonicalizes the named columns in place of their text originals.
pub fn canonicalize_columns<S: AsRef<str>>(table: Table, names: &[S]) -> Result<Table> {
    names.iter().try_fold(table, |table, name| {
        let replacement = canonicalize_column(table.require(name.as_ref())?);
        table.replace_column(replacement)
    })
}

/// True when every non-missing cell parses and at least one cell does.
pub fn is_numeric_candidate(column: &Column) -> bool {
    let mut parsed = 0usize;
    for value in &column.values {
        match value {
            Value::Missing => {}
            Value::Number(n) if n.is_finite() => parsed += 1,
            Value::Number(_) => return false,
            Value::Text(raw) if is_placeholder(raw) => {}
            Value::Text(raw) => {
                if !looks_numeric(raw) {
                    return false;
                }
                parsed += 1;
            }
        }
    }
    parsed > 0
}

/// Suppression markers published in place of a value (`-`, `...`, `X`).
pub fn is_placeholder(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.eq_ignore_ascii_case("x") || trimmed.chars().all(|c| !c.is_alphanumeric())
}

// Stricter than `canonicalize_text`: a code like "1-SIST_POC" must not pass.
fn looks_numeric(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || GROUP_OR_DECIMAL.contains(&c))
        && canonicalize_text(trimmed).as_number().is_some()
}

/// Rewrites digits-and-separators text into `f64::from_str` form.
fn apply_separator_policy(kept: &str) -> Option<String> {
    let dots = kept.matches('.').count();
    let commas = kept.matches(',').count();
    let decimal_at = match (dots, commas) {
        (0, 0) => None,
        (_, 0) | (0, _) => {
            let total = dots + commas;
            let position = kept.find(GROUP_OR_DECIMAL)?;
            let trailing = kept.len() - position - 1;
            (total == 1 && (1..=2).contains(&trailing)).then_some(position)
        }
        _ => kept.rfind(GROUP_OR_DECIMAL),
    };
    let mut plain = String::with_capacity(kept.len());
    for (idx, ch) in kept.char_indices() {
        if ch.is_ascii_digit() {
            plain.push(ch);
        } else if Some(idx) == decimal_at {
            plain.push('.');
        }
    }
    if plain.is_empty() || plain == "." {
        None
    } else {
        Some(plain)
    }
}
