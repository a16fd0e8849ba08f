//! Code → label translation for categorical columns.
//!
//! Maps come from configuration and are read-only once loaded. Lookups are a
//! single pass over the cells: a label produced by the map is never looked up
//! again, so mapping the same column twice with a map whose labels are not
//! themselves codes gives the same result as mapping it once.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::{
    data::{Column, ColumnKind, Table, Value, normalize_column_name},
    error::{CensusError, Result},
};

pub type CategoryMap = BTreeMap<String, String>;

/// How cell text is compared with map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyFold {
    /// Trimmed text must equal the key.
    #[default]
    Exact,
    /// Accents, case and surrounding whitespace are ignored on both sides.
    Normalized,
}

impl KeyFold {
    fn fold(self, key: &str) -> String {
        match self {
            KeyFold::Exact => key.trim().to_string(),
            KeyFold::Normalized => normalize_column_name(key),
        }
    }
}

/// Replaces known codes with their labels; unknown codes are kept verbatim.
pub fn map_column(column: &Column, map: &CategoryMap) -> Column {
    let mut unmapped = 0usize;
    let values = column
        .values
        .iter()
        .map(|value| match value {
            Value::Text(code) => match map.get(code.trim()) {
                Some(label) => Value::Text(label.clone()),
                None => {
                    unmapped += 1;
                    value.clone()
                }
            },
            other => other.clone(),
        })
        .collect();
    if unmapped > 0 {
        debug!(
            "Column '{}': {unmapped} cell(s) kept their original code",
            column.name
        );
    }
    Column::new(column.name.clone(), ColumnKind::Categorical, values)
}

/// Applies one map per named column. Every named column must exist.
pub fn map_columns(table: Table, maps: &BTreeMap<String, CategoryMap>) -> Result<Table> {
    maps.iter().try_fold(table, |table, (name, map)| {
        let mapped = map_column(table.require(name)?, map);
        table.replace_column(mapped)
    })
}

/// Appends `target`, computed by looking up each `source` cell in `map`.
///
/// Unlike [`map_column`], a cell with no entry becomes `Missing` in the new
/// column: the derived column only ever holds labels.
pub fn derive_column(
    table: Table,
    source: &str,
    target: &str,
    map: &CategoryMap,
    fold: KeyFold,
) -> Result<Table> {
    if table.column_index(target).is_some() {
        return Err(CensusError::DuplicateColumn(target.to_string()));
    }
    let folded: BTreeMap<String, &String> = map
        .iter()
        .map(|(key, label)| (fold.fold(key), label))
        .collect();
    let source_column = table.require(source)?;
    let values: Vec<Value> = source_column
        .values
        .iter()
        .map(|value| match value {
            Value::Missing => Value::Missing,
            other => folded
                .get(&fold.fold(&other.as_display()))
                .map(|label| Value::Text((*label).clone()))
                .unwrap_or(Value::Missing),
        })
        .collect();
    let unmatched = values
        .iter()
        .zip(&source_column.values)
        .filter(|(derived, original)| derived.is_missing() && !original.is_missing())
        .count();
    if unmatched > 0 {
        warn!("{unmatched} value(s) of '{source}' have no entry for derived column '{target}'");
    }
    table.push_column(Column::new(target, ColumnKind::Categorical, values))
}

/// Inverts a `label → [codes]` grouping into a `code → label` map.
///
/// A code listed under more than one label keeps the first label in key order.
pub fn invert_groups(groups: &BTreeMap<String, Vec<String>>) -> CategoryMap {
    let mut map = CategoryMap::new();
    for (label, codes) in groups {
        for code in codes {
            map.entry(code.clone()).or_insert_with(|| label.clone());
        }
    }
    map
}
