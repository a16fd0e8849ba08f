//! Adaptive "porte" binning of a numeric column.
//!
//! With enough distinct values the column is cut at evenly spaced quantiles
//! (linear interpolation between order statistics). Sparse columns, with fewer
//! distinct values than requested groups, get one bin per distinct value,
//! split at an order-of-magnitude threshold when one falls between two
//! neighbouring values and at their midpoint otherwise. Either way every cut
//! that would leave an interval without observations is dropped, so the
//! number of bins produced can be lower than requested. That is reported through [`Binning::is_reduced`] and
//! a warning, never an error.
//!
//! Intervals are `[lower, upper)` except the last one, which is closed. The
//! first lower bound is the observed minimum and the last upper bound sits a
//! hair above the observed maximum, so every observed value lands in exactly
//! one bin.

use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::{Column, ColumnKind, Table, Value, format_number},
    error::{CensusError, Result},
};

pub const DEFAULT_GROUPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningOptions {
    pub groups: usize,
    /// Preferred breakpoints for sparse columns, any order.
    pub thresholds: Vec<f64>,
    /// Names for the bins, smallest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
}

impl Default for BinningOptions {
    fn default() -> Self {
        Self {
            groups: DEFAULT_GROUPS,
            thresholds: default_thresholds(),
            names: Some(default_names()),
        }
    }
}

impl BinningOptions {
    pub fn with_groups(mut self, groups: usize) -> Self {
        self.groups = groups;
        self
    }
}

/// 1, 10, 100, ..., 1e12.
pub fn default_thresholds() -> Vec<f64> {
    (0..=12).map(|exp| 10f64.powi(exp)).collect()
}

pub fn default_names() -> Vec<String> {
    ["Pequeno", "Médio", "Grande"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Quantile,
    FixedThreshold,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
}

impl Bin {
    pub fn contains(&self, value: f64) -> bool {
        let above = if self.lower_inclusive {
            value >= self.lower
        } else {
            value > self.lower
        };
        let below = if self.upper_inclusive {
            value <= self.upper
        } else {
            value < self.upper
        };
        above && below
    }
}

/// Ordered, gap-free and overlap-free bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BinSet {
    bins: Vec<Bin>,
}

impl BinSet {
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Index of the bin holding `value`; `None` outside the observed domain.
    pub fn locate(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        self.bins.iter().position(|bin| bin.contains(value))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.bins.iter().map(|b| b.label.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binning {
    pub column: String,
    pub bins: BinSet,
    /// Bin index per row; `None` for rows without a usable number.
    pub assignments: Vec<Option<usize>>,
    /// Rows per bin, aligned with `bins`.
    pub counts: Vec<usize>,
    pub requested: usize,
    pub strategy: Strategy,
}

impl Binning {
    pub fn produced(&self) -> usize {
        self.bins.len()
    }

    pub fn is_reduced(&self) -> bool {
        self.produced() < self.requested
    }

    pub fn label_for(&self, row: usize) -> Option<&str> {
        let idx = (*self.assignments.get(row)?)?;
        self.bins.bins.get(idx).map(|bin| bin.label.as_str())
    }

    /// Per-row labels as a categorical column.
    pub fn into_column(self, name: impl Into<String>) -> Column {
        let Binning {
            bins, assignments, ..
        } = self;
        let values = assignments
            .into_iter()
            .map(|slot| match slot {
                Some(idx) => Value::Text(bins.bins[idx].label.clone()),
                None => Value::Missing,
            })
            .collect();
        Column::new(name, ColumnKind::Categorical, values)
    }
}

/// Classifies every row of a numeric column.
pub fn classify(column: &Column, options: &BinningOptions) -> Result<Binning> {
    if options.groups == 0 {
        return Err(CensusError::InvalidArgument(
            "group count must be at least 1".to_string(),
        ));
    }
    column.ensure_numeric()?;

    let mut sorted: Vec<f64> = column.numbers().map(|(_, value)| value).collect();
    if sorted.is_empty() {
        return Err(CensusError::InsufficientData(column.name.clone()));
    }
    sorted.sort_by(f64::total_cmp);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let distinct = sorted.iter().dedup().count();

    let (strategy, candidates) = if distinct < options.groups {
        (
            Strategy::FixedThreshold,
            sparse_cuts(&sorted, &options.thresholds),
        )
    } else {
        (Strategy::Quantile, quantile_cuts(&sorted, options.groups))
    };
    let cuts = drop_empty_intervals(&sorted, &candidates);
    debug!(
        "Column '{}': {distinct} distinct value(s), {strategy:?} strategy, cuts {cuts:?}",
        column.name
    );

    let produced = cuts.len() + 1;
    if produced < options.groups {
        warn!(
            "Column '{}' supports only {produced} of {} requested group(s)",
            column.name, options.groups
        );
    }

    let bins = build_bins(min, max, &cuts, options.names.as_deref());
    let mut counts = vec![0usize; bins.len()];
    let assignments: Vec<Option<usize>> = column
        .values
        .iter()
        .map(|value| {
            let slot = value.as_number().and_then(|n| bins.locate(n));
            if let Some(idx) = slot {
                counts[idx] += 1;
            }
            slot
        })
        .collect();

    Ok(Binning {
        column: column.name.clone(),
        bins,
        assignments,
        counts,
        requested: options.groups,
        strategy,
    })
}

/// Classifies `source` and appends the labels as `target`.
pub fn append_porte(
    table: Table,
    source: &str,
    target: &str,
    options: &BinningOptions,
) -> Result<(Table, Binning)> {
    let binning = classify(table.require(source)?, options)?;
    let table = table.push_column(binning.clone().into_column(target))?;
    Ok((table, binning))
}

fn quantile_cuts(sorted: &[f64], groups: usize) -> Vec<f64> {
    (1..groups)
        .map(|i| percentile_linear(sorted, i as f64 / groups as f64))
        .collect()
}

/// One cut between each pair of neighbouring distinct values: the smallest
/// configured threshold that separates them, or their midpoint when none does.
fn sparse_cuts(sorted: &[f64], thresholds: &[f64]) -> Vec<f64> {
    let thresholds: Vec<f64> = thresholds
        .iter()
        .copied()
        .filter(|t| t.is_finite())
        .sorted_by(f64::total_cmp)
        .collect();
    sorted
        .iter()
        .copied()
        .dedup()
        .tuple_windows()
        .map(|(below, above)| {
            thresholds
                .iter()
                .copied()
                .find(|t| *t > below && *t <= above)
                .unwrap_or_else(|| below + (above - below) / 2.0)
        })
        .collect()
}

/// Keeps a cut only when the interval it closes holds at least one value.
fn drop_empty_intervals(sorted: &[f64], candidates: &[f64]) -> Vec<f64> {
    let max = sorted[sorted.len() - 1];
    let mut kept = Vec::with_capacity(candidates.len());
    let mut lower = sorted[0];
    for &cut in candidates {
        if cut <= lower || cut > max {
            continue;
        }
        let below_cut = sorted.partition_point(|v| *v < cut);
        let from_lower = sorted.partition_point(|v| *v < lower);
        if below_cut > from_lower {
            kept.push(cut);
            lower = cut;
        }
    }
    kept
}

fn percentile_linear(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = pos - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

fn build_bins(min: f64, max: f64, cuts: &[f64], names: Option<&[String]>) -> BinSet {
    let produced = cuts.len() + 1;
    let epsilon = 1e-9 * max.abs().max(1.0);
    let mut edges = Vec::with_capacity(produced + 1);
    edges.push(min);
    edges.extend_from_slice(cuts);
    edges.push(max + epsilon);

    let bins = edges
        .iter()
        .tuple_windows()
        .enumerate()
        .map(|(idx, (&lower, &upper))| {
            let last = idx + 1 == produced;
            let name = bin_name(names, idx, produced);
            let label = if produced == 1 {
                format!("{name} ({}–{})", format_number(min), format_number(max))
            } else if idx == 0 {
                format!("{name} (< {})", format_number(upper))
            } else if last {
                format!("{name} (≥ {})", format_number(lower))
            } else {
                format!("{name} ({}–{})", format_number(lower), format_number(upper))
            };
            Bin {
                label,
                lower,
                upper,
                lower_inclusive: true,
                upper_inclusive: last,
            }
        })
        .collect();
    BinSet { bins }
}

/// Spreads the configured names over fewer bins, keeping the extremes.
fn bin_name(names: Option<&[String]>, idx: usize, produced: usize) -> String {
    match names {
        Some(names) if names.len() == produced => names[idx].clone(),
        Some(names) if names.len() > produced => {
            let pick = if produced == 1 {
                0
            } else {
                (idx * (names.len() - 1) + (produced - 1) / 2) / (produced - 1)
            };
            names[pick].clone()
        }
        _ => format!("Grupo {}", idx + 1),
    }
}
