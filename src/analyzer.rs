//! ## Analyze Pass
//!
//! The analyze pass reads the full dataset once and produces [`AnalyzedStatistics`]:
//!
//! - [`Moments`] (count, mean, population variance) for every dense-float column,
//! - a [`Vocabulary`] for every vocabulary column,
//! - [`BucketBoundaries`] for every bucket column.
//!
//! All statistics are computed on filled values, so a missing value counts as `0` or `""`.
//! NaN values are left out of the moments and the bucket boundaries.
//!
//! Two sources are supported through the [`Analyze`] trait: in-memory [`RawRecord`]s, analyzed
//! one column per rayon task, and DataFusion DataFrames, analyzed with aggregate queries that run
//! concurrently. The transform only consumes the resulting value object and never depends on
//! which source produced it.

use crate::exceptions::{TaxiTransformError, TaxiTransformResult};
use crate::record::{RawRecord, ValueKind};
use crate::settings::TransformConfig;
use crate::transformers::categorical_encoding::Vocabulary;
use crate::transformers::discretization::BucketBoundaries;
use crate::transformers::imputation::{
    fill_numeric, fill_string, filled_numeric_expr, filled_string_expr,
};
use crate::transformers::scaling::Moments;
use arrow::array::{Array, Float64Array};
use arrow::datatypes::DataType;
use async_trait::async_trait;
use datafusion::common::DFSchema;
use datafusion::functions_aggregate::expr_fn::{avg, count, var_pop};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use datafusion_expr::{col, lit, not};
use datafusion_functions::math;
use futures::future::try_join_all;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Dataset-wide statistics consumed by the transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzedStatistics {
    moments: BTreeMap<String, Moments>,
    vocabularies: BTreeMap<String, Vocabulary>,
    boundaries: BTreeMap<String, BucketBoundaries>,
}

impl AnalyzedStatistics {
    pub fn new(
        moments: BTreeMap<String, Moments>,
        vocabularies: BTreeMap<String, Vocabulary>,
        boundaries: BTreeMap<String, BucketBoundaries>,
    ) -> Self {
        Self {
            moments,
            vocabularies,
            boundaries,
        }
    }

    pub fn insert_moments(&mut self, column: impl Into<String>, moments: Moments) {
        self.moments.insert(column.into(), moments);
    }

    pub fn insert_vocabulary(&mut self, column: impl Into<String>, vocabulary: Vocabulary) {
        self.vocabularies.insert(column.into(), vocabulary);
    }

    pub fn insert_boundaries(&mut self, column: impl Into<String>, boundaries: BucketBoundaries) {
        self.boundaries.insert(column.into(), boundaries);
    }

    pub fn moments(&self, column: &str) -> TaxiTransformResult<&Moments> {
        self.moments.get(column).ok_or_else(|| {
            TaxiTransformError::MissingStatistic(format!("No mean/variance for column '{}'", column))
        })
    }

    pub fn vocabulary(&self, column: &str) -> TaxiTransformResult<&Vocabulary> {
        self.vocabularies.get(column).ok_or_else(|| {
            TaxiTransformError::MissingStatistic(format!("No vocabulary for column '{}'", column))
        })
    }

    pub fn bucket_boundaries(&self, column: &str) -> TaxiTransformResult<&BucketBoundaries> {
        self.boundaries.get(column).ok_or_else(|| {
            TaxiTransformError::MissingStatistic(format!(
                "No bucket boundaries for column '{}'",
                column
            ))
        })
    }

    /// Checks that every column of `config` has the statistic its rule needs.
    pub fn ensure_covers(&self, config: &TransformConfig) -> TaxiTransformResult<()> {
        for key in &config.dense_float_keys {
            self.moments(key)?;
        }
        for key in &config.vocab_keys {
            self.vocabulary(key)?;
        }
        for key in &config.bucket_keys {
            self.bucket_boundaries(key)?;
        }
        Ok(())
    }
}

/// A dataset the analyze pass can read.
#[async_trait]
pub trait Analyze {
    /// Computes the statistics every rule in `config` needs.
    async fn analyze(&self, config: &TransformConfig) -> TaxiTransformResult<AnalyzedStatistics>;
}

#[async_trait]
impl Analyze for Vec<RawRecord> {
    async fn analyze(&self, config: &TransformConfig) -> TaxiTransformResult<AnalyzedStatistics> {
        analyze_records(self, config)
    }
}

#[async_trait]
impl Analyze for DataFrame {
    async fn analyze(&self, config: &TransformConfig) -> TaxiTransformResult<AnalyzedStatistics> {
        analyze_dataframe(self, config).await
    }
}

fn log_statistics(stats: &AnalyzedStatistics) {
    for (key, m) in &stats.moments {
        debug!(column = %key, count = m.count, mean = m.mean, variance = m.variance, "moments");
    }
    for (key, v) in &stats.vocabularies {
        debug!(column = %key, size = v.len(), oov_buckets = v.num_oov_buckets(), "vocabulary");
    }
    for (key, b) in &stats.boundaries {
        debug!(column = %key, boundaries = ?b.boundaries(), "bucket boundaries");
    }
}

fn numeric_column(records: &[RawRecord], key: &str) -> TaxiTransformResult<Vec<f64>> {
    records
        .iter()
        .map(|r| r.require(key).and_then(|v| fill_numeric(key, v)))
        .collect()
}

/// Analyzes in-memory records. Each column is processed by its own rayon task.
pub fn analyze_records(
    records: &[RawRecord],
    config: &TransformConfig,
) -> TaxiTransformResult<AnalyzedStatistics> {
    config.validate()?;
    info!(
        examples = records.len(),
        "Analyzing records for columns: {:?}",
        config.input_columns()
    );

    let moments = config
        .dense_float_keys
        .par_iter()
        .map(|key| -> TaxiTransformResult<(String, Moments)> {
            let values = numeric_column(records, key)?;
            Ok((key.clone(), Moments::from_values(values)))
        })
        .collect::<TaxiTransformResult<BTreeMap<_, _>>>()?;

    let vocabularies = config
        .vocab_keys
        .par_iter()
        .map(|key| -> TaxiTransformResult<(String, Vocabulary)> {
            let mut frequencies: HashMap<String, u64> = HashMap::new();
            for record in records {
                let token = fill_string(key, record.require(key)?)?;
                *frequencies.entry(token).or_insert(0) += 1;
            }
            let vocabulary =
                Vocabulary::from_frequencies(frequencies, config.vocab_size, config.oov_size);
            Ok((key.clone(), vocabulary))
        })
        .collect::<TaxiTransformResult<BTreeMap<_, _>>>()?;

    let boundaries = config
        .bucket_keys
        .par_iter()
        .map(|key| -> TaxiTransformResult<(String, BucketBoundaries)> {
            let values = numeric_column(records, key)?;
            Ok((
                key.clone(),
                BucketBoundaries::from_values(values, config.bucket_size),
            ))
        })
        .collect::<TaxiTransformResult<BTreeMap<_, _>>>()?;

    // The label and fare columns carry no statistic but must still be present and numeric.
    for key in [&config.label_key, &config.fare_key] {
        numeric_column(records, key)?;
    }

    let stats = AnalyzedStatistics::new(moments, vocabularies, boundaries);
    log_statistics(&stats);
    Ok(stats)
}

fn is_numeric_type(dt: &DataType) -> bool {
    dt.is_integer() || dt.is_floating()
}

fn is_string_type(dt: &DataType) -> bool {
    matches!(dt, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View)
}

/// Checks that the DataFrame schema holds every configured column with a type its rule accepts.
pub(crate) fn validate_schema(schema: &DFSchema, config: &TransformConfig) -> TaxiTransformResult<()> {
    let field_type = |name: &str| -> TaxiTransformResult<DataType> {
        schema
            .field_with_name(None, name)
            .map(|f| f.data_type().clone())
            .map_err(|_| {
                TaxiTransformError::MissingColumn(format!("Column '{}' not found in DataFrame", name))
            })
    };

    let numeric_keys = config
        .dense_float_keys
        .iter()
        .chain(config.bucket_keys.iter())
        .chain([&config.label_key, &config.fare_key]);
    for name in numeric_keys {
        let dt = field_type(name)?;
        if !is_numeric_type(&dt) {
            return Err(TaxiTransformError::type_mismatch(name.as_str(), "numeric", dt));
        }
    }
    for name in &config.vocab_keys {
        let dt = field_type(name)?;
        if !is_string_type(&dt) {
            return Err(TaxiTransformError::type_mismatch(
                name.as_str(),
                ValueKind::Str,
                dt,
            ));
        }
    }
    Ok(())
}

fn plan_error(msg: String) -> TaxiTransformError {
    TaxiTransformError::DataFusionError(datafusion::error::DataFusionError::Plan(msg))
}

/// Reads a nullable Float64 scalar at row 0 of `array`.
fn scalar_f64(array: &dyn Array, what: &str, col_name: &str) -> TaxiTransformResult<Option<f64>> {
    match ScalarValue::try_from_array(array, 0)? {
        ScalarValue::Float64(v) => Ok(v),
        _ => Err(plan_error(format!(
            "Failed to compute {} for column {}",
            what, col_name
        ))),
    }
}

async fn compute_moments(df: &DataFrame, col_name: &str) -> TaxiTransformResult<(String, Moments)> {
    let agg_df = df
        .clone()
        .select(vec![filled_numeric_expr(col_name).alias("value")])?
        .filter(not(math::isnan().call(vec![col("value")])))?
        .aggregate(
            vec![],
            vec![
                count(col("value")).alias("n"),
                avg(col("value")).alias("mean"),
                var_pop(col("value")).alias("variance"),
            ],
        )?;
    let batches = agg_df.collect().await?;
    let batch = batches
        .iter()
        .find(|b| b.num_rows() > 0)
        .ok_or_else(|| plan_error("No data found".to_string()))?;

    let count = match ScalarValue::try_from_array(batch.column(0), 0)? {
        ScalarValue::Int64(Some(n)) => n.max(0) as u64,
        _ => 0,
    };
    let mean = scalar_f64(batch.column(1), "mean", col_name)?.unwrap_or(0.0);
    let variance = scalar_f64(batch.column(2), "variance", col_name)?.unwrap_or(0.0);
    Ok((col_name.to_string(), Moments::new(count, mean, variance)))
}

async fn compute_vocabulary(
    df: &DataFrame,
    col_name: &str,
    config: &TransformConfig,
) -> TaxiTransformResult<(String, Vocabulary)> {
    let ranked_df = df
        .clone()
        .aggregate(
            vec![filled_string_expr(col_name).alias("token")],
            vec![count(lit(1)).alias("cnt")],
        )?
        .sort(vec![
            col("cnt").sort(false, false),
            col("token").sort(true, false),
        ])?
        .limit(0, Some(config.vocab_size))?;
    let batches = ranked_df.collect().await?;

    let mut ranked = Vec::new();
    for batch in batches {
        let array = batch.column(0);
        for i in 0..batch.num_rows() {
            match ScalarValue::try_from_array(array, i)? {
                ScalarValue::Utf8(Some(token))
                | ScalarValue::LargeUtf8(Some(token))
                | ScalarValue::Utf8View(Some(token)) => ranked.push(token),
                _ => {
                    return Err(plan_error(format!(
                        "Failed to compute vocabulary for column {}",
                        col_name
                    )))
                }
            }
        }
    }
    Ok((
        col_name.to_string(),
        Vocabulary::from_ranked(ranked, config.oov_size),
    ))
}

async fn compute_boundaries(
    df: &DataFrame,
    col_name: &str,
    num_buckets: usize,
) -> TaxiTransformResult<(String, BucketBoundaries)> {
    let sorted_df = df
        .clone()
        .select(vec![filled_numeric_expr(col_name).alias("value")])?
        .filter(not(math::isnan().call(vec![col("value")])))?
        .sort(vec![col("value").sort(true, false)])?;
    let batches = sorted_df.collect().await?;

    let mut values = Vec::new();
    for batch in batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| plan_error(format!("Expected Float64 array for column {}", col_name)))?;
        values.extend(array.iter().flatten());
    }
    Ok((
        col_name.to_string(),
        BucketBoundaries::from_sorted(&values, num_buckets),
    ))
}

/// Analyzes a DataFrame with aggregate queries, running the per-column queries concurrently.
pub async fn analyze_dataframe(
    df: &DataFrame,
    config: &TransformConfig,
) -> TaxiTransformResult<AnalyzedStatistics> {
    config.validate()?;
    validate_schema(df.schema(), config)?;

    info!("Computing mean and variance of dense columns: {:?}", config.dense_float_keys);
    let moments = try_join_all(
        config
            .dense_float_keys
            .iter()
            .map(|key| compute_moments(df, key)),
    )
    .await?;

    info!("Computing vocabularies of categorical columns: {:?}", config.vocab_keys);
    let vocabularies = try_join_all(
        config
            .vocab_keys
            .iter()
            .map(|key| compute_vocabulary(df, key, config)),
    )
    .await?;

    info!("Computing quantile boundaries of bucket columns: {:?}", config.bucket_keys);
    let boundaries = try_join_all(
        config
            .bucket_keys
            .iter()
            .map(|key| compute_boundaries(df, key, config.bucket_size)),
    )
    .await?;

    let stats = AnalyzedStatistics::new(
        moments.into_iter().collect(),
        vocabularies.into_iter().collect(),
        boundaries.into_iter().collect(),
    );
    log_statistics(&stats);
    Ok(stats)
}
