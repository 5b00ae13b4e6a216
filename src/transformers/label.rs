//! ## Tip Label
//!
//! The label marks a trip as a good tip when the tip exceeds a fraction of the fare
//! (10% by default). A NaN fare always yields 0.
//!
//! [`label_expr`] derives the same label inside a DataFusion plan.

use crate::exceptions::TaxiTransformResult;
use crate::record::RawRecord;
use crate::settings::{LabelPolicy, TransformConfig};
use crate::transformers::imputation::{fill_numeric, filled_numeric_expr};
use datafusion::logical_expr::{col, lit, Case as DFCase, Expr};
use datafusion_functions::math;

/// Returns 1 if `tips > threshold * fare`, else 0. A NaN fare yields 0.
pub fn derive_label(fare: f64, tips: f64, threshold: f64) -> i64 {
    if fare.is_nan() {
        0
    } else if tips > fare * threshold {
        1
    } else {
        0
    }
}

/// Derives the label of a raw record under the configured [`LabelPolicy`].
pub fn label_for_record(record: &RawRecord, config: &TransformConfig) -> TaxiTransformResult<i64> {
    let raw_fare = record.require(&config.fare_key)?;
    let raw_tips = record.require(&config.label_key)?;

    if config.label_policy == LabelPolicy::CheckBeforeFill && raw_fare.is_missing() {
        // Still reject a tips column of the wrong type.
        fill_numeric(&config.label_key, raw_tips)?;
        return Ok(0);
    }

    let fare = fill_numeric(&config.fare_key, raw_fare)?;
    let tips = fill_numeric(&config.label_key, raw_tips)?;
    Ok(derive_label(fare, tips, config.tip_threshold))
}

/// The label of every row as an Int64 CASE expression, under the configured [`LabelPolicy`].
///
/// NaN operands are tested explicitly, since Arrow orders NaN above every other float.
pub fn label_expr(config: &TransformConfig) -> Expr {
    let tips = filled_numeric_expr(&config.label_key);
    let limit = filled_numeric_expr(&config.fare_key) * lit(config.tip_threshold);
    let zero = || Box::new(lit(0_i64));

    let mut when_then_expr = Vec::new();
    if config.label_policy == LabelPolicy::CheckBeforeFill {
        when_then_expr.push((Box::new(col(config.fare_key.as_str()).is_null()), zero()));
    }
    when_then_expr.push((Box::new(math::isnan().call(vec![limit.clone()])), zero()));
    when_then_expr.push((Box::new(math::isnan().call(vec![tips.clone()])), zero()));
    when_then_expr.push((Box::new(tips.gt(limit)), Box::new(lit(1_i64))));
    Expr::Case(DFCase {
        expr: None,
        when_then_expr,
        else_expr: Some(zero()),
    })
}
