//! Group-by aggregation and top / middle / bottom extraction.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    data::{Column, Table},
    error::{CensusError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Count,
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub entity: String,
    pub value: f64,
}

/// Entity → metric, one row per entity, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub key: String,
    pub metric: String,
    pub rows: Vec<RankEntry>,
}

impl AggregateTable {
    /// Builds a table from raw pairs. Repeated entities are summed and
    /// non-finite metrics are dropped.
    pub fn from_pairs<I, S>(key: impl Into<String>, metric: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut rows: Vec<RankEntry> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (entity, value) in pairs {
            if !value.is_finite() {
                continue;
            }
            let entity = entity.into();
            match positions.get(&entity) {
                Some(&idx) => rows[idx].value += value,
                None => {
                    positions.insert(entity.clone(), rows.len());
                    rows.push(RankEntry { entity, value });
                }
            }
        }
        Self {
            key: key.into(),
            metric: metric.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows ordered by descending metric, ties broken by entity name.
    pub fn sorted_desc(&self) -> Vec<RankEntry> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.entity.cmp(&b.entity))
        });
        rows
    }
}

/// Three disjoint views over the same ranking, each sorted descending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankSet {
    pub top: Vec<RankEntry>,
    pub middle: Vec<RankEntry>,
    pub bottom: Vec<RankEntry>,
}

impl RankSet {
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.top
            .iter()
            .chain(&self.middle)
            .chain(&self.bottom)
            .map(|entry| entry.entity.as_str())
    }
}

/// Top is taken first, bottom from what is left, middle from what remains
/// after both; short tables shrink the middle rather than repeat entities.
pub fn extract(table: &AggregateTable, n: usize) -> RankSet {
    let sorted = table.sorted_desc();
    let top_len = n.min(sorted.len());
    let (top, rest) = sorted.split_at(top_len);
    let bottom_len = n.min(rest.len());
    let (remainder, bottom) = rest.split_at(rest.len() - bottom_len);
    let middle_len = n.min(remainder.len());
    RankSet {
        top: top.to_vec(),
        middle: remainder[..middle_len].to_vec(),
        bottom: bottom.to_vec(),
    }
}

/// Groups `table` by `key`. `metric` is required for `Sum` and `Mean`.
///
/// Rows with a missing key are skipped, as are missing metrics for `Sum`
/// and `Mean`. A group whose metrics are all missing sums to zero and has no
/// mean, so it is left out of a `Mean` aggregation.
pub fn aggregate(
    table: &Table,
    key: &str,
    metric: Option<&str>,
    aggregation: Aggregation,
) -> Result<AggregateTable> {
    let key_column = table.require(key)?;
    let metric_column = match (aggregation, metric) {
        (Aggregation::Count, _) => None,
        (_, Some(name)) => {
            let column = table.require(name)?;
            column.ensure_numeric()?;
            Some(column)
        }
        (_, None) => {
            return Err(CensusError::InvalidArgument(format!(
                "{aggregation:?} aggregation needs a metric column"
            )));
        }
    };

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (f64, usize)> = HashMap::new();
    for (row, key_value) in key_column.values.iter().enumerate() {
        if key_value.is_missing() {
            continue;
        }
        let entity = key_value.as_display();
        let slot = groups.entry(entity.clone()).or_insert_with(|| {
            order.push(entity);
            (0.0, 0)
        });
        match metric_column.map(|column: &Column| column.values[row].as_number()) {
            None => slot.1 += 1,
            Some(Some(value)) => {
                slot.0 += value;
                slot.1 += 1;
            }
            Some(None) => {}
        }
    }

    let metric_name = match aggregation {
        Aggregation::Count => "count".to_string(),
        _ => metric.unwrap_or_default().to_string(),
    };
    let pairs = order.into_iter().filter_map(|entity| {
        let (sum, count) = groups[&entity];
        let value = match aggregation {
            Aggregation::Sum => sum,
            Aggregation::Count => count as f64,
            Aggregation::Mean if count > 0 => sum / count as f64,
            Aggregation::Mean => return None,
        };
        Some((entity, value))
    });
    Ok(AggregateTable::from_pairs(key, metric_name, pairs))
}
