//! Pairwise-complete Pearson correlation over numeric columns.

use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::{
    data::{Column, Table},
    error::Result,
};

/// Square matrix over `columns`; `None` where the coefficient is undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub a: String,
    pub b: String,
    pub coefficient: f64,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// The `k` strongest pairs by absolute coefficient.
    ///
    /// Only the upper triangle is read, so a column is never paired with
    /// itself and each unordered pair appears at most once.
    pub fn top_pairs(&self, k: usize) -> Vec<CorrelationPair> {
        let n = self.columns.len();
        (0..n)
            .tuple_combinations()
            .filter_map(|(i, j)| {
                self.values[i][j].map(|coefficient| {
                    let (a, b) = if self.columns[i] <= self.columns[j] {
                        (&self.columns[i], &self.columns[j])
                    } else {
                        (&self.columns[j], &self.columns[i])
                    };
                    CorrelationPair {
                        a: a.clone(),
                        b: b.clone(),
                        coefficient,
                    }
                })
            })
            .sorted_by(|x, y| {
                y.coefficient
                    .abs()
                    .total_cmp(&x.coefficient.abs())
                    .then_with(|| x.a.cmp(&y.a))
                    .then_with(|| x.b.cmp(&y.b))
            })
            .take(k)
            .collect()
    }
}

/// Correlates the named columns, or every numeric column when `names` is
/// `None`. Fewer than two columns gives an empty matrix.
pub fn analyze<S: AsRef<str>>(table: &Table, names: Option<&[S]>) -> Result<CorrelationMatrix> {
    let columns: Vec<&Column> = match names {
        Some(names) => names
            .iter()
            .map(|name| {
                let column = table.require(name.as_ref())?;
                column.ensure_numeric()?;
                Ok(column)
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unique_by(|column| column.name.clone())
            .collect(),
        None => table.numeric_columns().collect(),
    };
    if columns.len() < 2 {
        debug!(
            "Only {} numeric column(s) available, correlation matrix is empty",
            columns.len()
        );
        return Ok(CorrelationMatrix {
            columns: Vec::new(),
            values: Vec::new(),
        });
    }

    let data: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|column| column.values.iter().map(|v| v.as_number()).collect())
        .collect();
    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        values[i][i] = pearson(&data[i], &data[i]).map(|_| 1.0);
        for j in (i + 1)..n {
            let r = pearson(&data[i], &data[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.name.clone()).collect(),
        values,
    })
}

/// Pearson's r over the rows where both sides are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let paired: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if paired.len() < 2 {
        return None;
    }
    let n = paired.len() as f64;
    let (sum_x, sum_y) = paired
        .iter()
        .fold((0.0_f64, 0.0_f64), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);

    let mut cov = 0.0_f64;
    let mut var_x = 0.0_f64;
    let mut var_y = 0.0_f64;
    let mut square_x = 0.0_f64;
    let mut square_y = 0.0_f64;
    for &(x, y) in &paired {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
        square_x += x * x;
        square_y += y * y;
    }
    let constant_x = paired.iter().all(|(x, _)| *x == paired[0].0);
    let constant_y = paired.iter().all(|(_, y)| *y == paired[0].1);
    if constant_x
        || constant_y
        || negligible(var_x, square_x)
        || negligible(var_y, square_y)
    {
        return None;
    }
    // Separate square roots keep tiny-scale variances from underflowing.
    let denom = var_x.sqrt() * var_y.sqrt();
    let r = (cov / denom).clamp(-1.0, 1.0);
    r.is_finite().then_some(r)
}

/// Variance indistinguishable from rounding noise at the data's own scale.
fn negligible(variance: f64, sum_of_squares: f64) -> bool {
    !variance.is_finite() || variance <= f64::EPSILON * sum_of_squares
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            Column::from_numbers("A", [Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Column::from_numbers("B", [Some(2.0), Some(4.0), Some(6.0), Some(8.0)]),
            Column::from_numbers("C", [Some(4.0), Some(1.0), Some(3.0), Some(2.0)]),
            Column::from_numbers("K", [Some(5.0), Some(5.0), Some(5.0), Some(5.0)]),
            Column::from_texts("UF", ["SP", "MG", "RJ", "BA"]),
        ])
        .unwrap()
    }

    #[test]
    fn perfect_linear_relation() {
        let matrix = analyze::<&str>(&table(), None).unwrap();
        let r = matrix.get("A", "B").unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        assert_eq!(matrix.get("A", "A"), Some(1.0));
    }

    #[test]
    fn constant_column_is_undefined() {
        let matrix = analyze::<&str>(&table(), None).unwrap();
        assert_eq!(matrix.get("K", "K"), None);
        assert_eq!(matrix.get("A", "K"), None);
        assert!(matrix.columns.iter().all(|c| c != "UF"));
    }

    #[test]
    fn top_pairs_skip_self_and_repeats() {
        let matrix = analyze::<&str>(&table(), None).unwrap();
        let pairs = matrix.top_pairs(10);
        assert_eq!(pairs.len(), 3);
        assert_eq!((pairs[0].a.as_str(), pairs[0].b.as_str()), ("A", "B"));
        for pair in &pairs {
            assert_ne!(pair.a, pair.b);
        }
        for window in pairs.windows(2) {
            assert!(window[0].coefficient.abs() >= window[1].coefficient.abs());
        }
    }

    #[test]
    fn repeated_names_are_correlated_once() {
        let matrix = analyze(&table(), Some(&["A", "B", "A"][..])).unwrap();
        assert_eq!(matrix.columns, vec!["A", "B"]);
        assert_eq!(matrix.top_pairs(5).len(), 1);
    }

    #[test]
    fn pairwise_complete_rows_only() {
        let xs = [Some(1.0), None, Some(2.0), Some(3.0)];
        let ys = [Some(1.0), Some(100.0), Some(2.0), Some(3.0)];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), None);
    }

    #[test]
    fn tiny_scale_variation_is_still_correlated() {
        let xs = [Some(1e-9), Some(2e-9), Some(3e-9), Some(4e-9)];
        let ys = [Some(2e-9), Some(4e-9), Some(6e-9), Some(8e-9)];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-9);

        let table = Table::new(vec![
            Column::from_numbers("A", xs),
            Column::from_numbers("B", ys),
        ])
        .unwrap();
        let matrix = analyze::<&str>(&table, None).unwrap();
        assert_eq!(matrix.get("A", "A"), Some(1.0));
        assert_eq!(matrix.top_pairs(1).len(), 1);
    }

    #[test]
    fn constant_column_against_large_scale_is_undefined() {
        let constant = [Some(0.1); 7];
        let large = [1e12, 2e12, 4e12, 8e12, 3e12, 5e12, 9e12].map(Some);
        assert_eq!(pearson(&constant, &large), None);
        assert_eq!(pearson(&large, &constant), None);
        assert_eq!(pearson(&constant, &constant), None);
        let nearly = [0.1, 0.2 - 0.1, 0.3 - 0.2, 0.1, 0.1, 0.1, 0.1].map(Some);
        assert_eq!(pearson(&nearly, &large), None);
    }

    #[test]
    fn single_numeric_column_gives_empty_matrix() {
        let table = Table::new(vec![Column::from_numbers("A", [Some(1.0), Some(2.0)])]).unwrap();
        assert!(analyze::<&str>(&table, None).unwrap().is_empty());
    }
}
