//! ## Quantile Bucketization
//!
//! [`BucketBoundaries`] holds the interior boundaries of an equal-frequency binning. For `k`
//! buckets over `n` analyzed values sorted ascending, boundary `i` (for `i` in `1..k`) is the
//! value at position `floor(i * n / k)`.
//!
//! A value is assigned the number of boundaries that are less than or equal to it, so a value
//! that falls exactly on a boundary goes to the upper bucket. Values below the smallest or above
//! the largest boundary land in the first or last bucket, which also covers values outside the
//! range seen during analysis. NaN goes to bucket 0.
//!
//! With fewer analyzed values than buckets, boundaries repeat and the lowest buckets can stay
//! empty: for the values `1, 2, 3` and 10 buckets the boundaries are `[1, 1, 1, 2, 2, 2, 3, 3, 3]`
//! and the three values land in buckets 3, 6 and 9.
//!
//! [`BucketBoundaries::case_expr`] builds the same lookup as a DataFusion CASE expression.

use datafusion::logical_expr::{lit, Case as DFCase, Expr};
use datafusion_functions::math;

/// Interior equal-frequency boundaries of a numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketBoundaries {
    boundaries: Vec<f64>,
    num_buckets: usize,
}

impl BucketBoundaries {
    /// Uses the given boundaries as they are. They must be sorted ascending.
    pub fn new(boundaries: Vec<f64>, num_buckets: usize) -> Self {
        Self {
            boundaries,
            num_buckets,
        }
    }

    /// Computes `num_buckets - 1` quantile boundaries from values sorted ascending.
    ///
    /// NaN values must be removed beforehand. An empty input yields no boundaries, so every
    /// value maps to bucket 0.
    pub fn from_sorted(sorted: &[f64], num_buckets: usize) -> Self {
        let n = sorted.len();
        if n == 0 || num_buckets < 2 {
            return Self::new(Vec::new(), num_buckets);
        }
        let boundaries = (1..num_buckets)
            .map(|i| {
                let pos = (i * n / num_buckets).min(n - 1);
                sorted[pos]
            })
            .collect();
        Self::new(boundaries, num_buckets)
    }

    /// Sorts `values`, drops NaN, and computes the boundaries.
    pub fn from_values(mut values: Vec<f64>, num_buckets: usize) -> Self {
        values.retain(|v| !v.is_nan());
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values, num_buckets)
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Bucket index of `x` in `[0, num_buckets)`.
    pub fn bucketize(&self, x: f64) -> i64 {
        let bucket = self.boundaries.partition_point(|b| *b <= x);
        bucket.min(self.num_buckets.saturating_sub(1)) as i64
    }

    /// Builds a CASE expression mapping a Float64 `value` to its bucket index.
    ///
    /// Boundaries are tested from the top down, so the first match is the highest boundary that
    /// is less than or equal to the value. NaN is tested first and maps to bucket 0.
    pub fn case_expr(&self, value: Expr) -> Expr {
        let last = self.num_buckets.saturating_sub(1);
        let mut when_then_expr = vec![(
            Box::new(math::isnan().call(vec![value.clone()])),
            Box::new(lit(0_i64)),
        )];
        when_then_expr.extend(self.boundaries.iter().enumerate().rev().map(|(i, b)| {
            let bucket = (i + 1).min(last) as i64;
            (
                Box::new(value.clone().gt_eq(lit(*b))),
                Box::new(lit(bucket)),
            )
        }));
        Expr::Case(DFCase {
            expr: None,
            when_then_expr,
            else_expr: Some(Box::new(lit(0_i64))),
        })
    }
}
