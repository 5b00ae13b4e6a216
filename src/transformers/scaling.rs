//! ## Z-score standardization
//!
//! [`Moments`] holds the dataset-wide count, mean, and population variance of a filled numeric
//! column. [`Moments::scale`] rescales a value to zero mean and unit variance. A variance below
//! the configured epsilon is replaced with 1 so constant columns never produce infinities.
//!
//! NaN values are left out of the moments, the same way the quantile analysis leaves them out of
//! the bucket boundaries. A NaN input still scales to NaN.
//!
//! [`Moments::scale_expr`] builds the same rescaling as a DataFusion expression.

use datafusion::logical_expr::{lit, Expr};

/// Count, mean and population variance of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub count: u64,
    pub mean: f64,
    pub variance: f64,
}

impl Default for Moments {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            variance: 0.0,
        }
    }
}

impl Moments {
    pub fn new(count: u64, mean: f64, variance: f64) -> Self {
        Self {
            count,
            mean,
            variance,
        }
    }

    /// Computes the moments of `values` in one pass with Welford's update.
    ///
    /// NaN values are skipped. An input with no other values yields zero mean and zero variance.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0_u64;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        for x in values.into_iter().filter(|x| !x.is_nan()) {
            count += 1;
            let delta = x - mean;
            mean += delta / count as f64;
            m2 += delta * (x - mean);
        }
        let variance = if count > 0 { m2 / count as f64 } else { 0.0 };
        Self {
            count,
            mean,
            variance,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// The value `scale` divides by: the standard deviation, or 1 when the variance is below
    /// `epsilon` (or not a number).
    pub fn divisor(&self, epsilon: f64) -> f64 {
        if self.variance.is_nan() || self.variance < epsilon || self.variance == 0.0 {
            1.0
        } else {
            self.std_dev()
        }
    }

    /// Rescales `x` to zero mean and unit variance.
    pub fn scale(&self, x: f64, epsilon: f64) -> f64 {
        (x - self.mean) / self.divisor(epsilon)
    }

    /// `(value - mean) / divisor` as an expression over a Float64 `value`.
    pub fn scale_expr(&self, value: Expr, epsilon: f64) -> Expr {
        (value - lit(self.mean)) / lit(self.divisor(epsilon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values() {
        let m = Moments::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(m.count, 8);
        assert!((m.mean - 5.0).abs() < 1e-12);
        assert!((m.variance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Moments::from_values(Vec::<f64>::new()), Moments::default());
    }

    #[test]
    fn test_zero_variance_does_not_divide() {
        let m = Moments::from_values([3.0, 3.0, 3.0]);
        assert_eq!(m.scale(3.0, 1e-12), 0.0);
        assert_eq!(m.scale(5.0, 1e-12), 2.0);
        assert_eq!(m.divisor(1e-12), 1.0);
    }

    #[test]
    fn test_nan_is_skipped() {
        let mut values: Vec<f64> = (0..99).map(f64::from).collect();
        values.push(f64::NAN);
        let m = Moments::from_values(values);
        assert_eq!(m.count, 99);
        assert!((m.mean - 49.0).abs() < 1e-12);
        assert!((m.variance - 816.666_666_666_666_6).abs() < 1e-9);
        assert!(m.scale(5.0, 1e-12).is_finite());
        assert!(m.scale(f64::NAN, 1e-12).is_nan());

        let only_nan = Moments::from_values([f64::NAN, f64::NAN]);
        assert_eq!(only_nan, Moments::default());
    }
}
