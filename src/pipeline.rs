//! ## Taxi Preprocessing
//!
//! This module ties the column catalog, the analyzed statistics, and the transform rules together.
//!
//! ### Overview
//!
//! - [`preprocess`] maps one [`RawRecord`] to one [`TransformedRecord`]:
//!   - dense-float columns are filled and z-score scaled,
//!   - vocabulary columns are filled and mapped to vocabulary indices,
//!   - bucket columns are filled and mapped to quantile bucket indices,
//!   - the label is derived from the fare and tip columns.
//! - [`transform_exprs`] expresses the same rules as DataFusion expressions.
//! - [`TaxiPreprocessor`] wraps both in the fit/transform shape used for DataFrames:
//!   `fit` runs the analyze pass, `transform` adds a projection of the transformed columns to the
//!   DataFrame's logical plan without executing it.
//!
//! Output columns are named with [`TransformConfig::transformed_name`].

use crate::analyzer::{analyze_dataframe, analyze_records, validate_schema, AnalyzedStatistics};
use crate::exceptions::{TaxiTransformError, TaxiTransformResult};
use crate::record::{RawRecord, RawValue, TransformedRecord, TransformedValue};
use crate::settings::TransformConfig;
use crate::transformers::imputation::{
    fill_numeric, fill_string, filled_numeric_expr, filled_string_expr,
};
use crate::transformers::label::{label_expr, label_for_record};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::logical_expr::Expr;
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Transforms one raw record with previously analyzed statistics.
///
/// Fails if a configured column is absent from the record, holds a value of the wrong type, or
/// has no statistic in `stats`.
pub fn preprocess(
    record: &RawRecord,
    config: &TransformConfig,
    stats: &AnalyzedStatistics,
) -> TaxiTransformResult<TransformedRecord> {
    let mut output = TransformedRecord::new();

    for key in &config.dense_float_keys {
        let x = fill_numeric(key, record.require(key)?)?;
        let scaled = stats.moments(key)?.scale(x, config.variance_epsilon);
        output.insert(config.transformed_name(key), TransformedValue::Float(scaled));
    }

    for key in &config.vocab_keys {
        let token = fill_string(key, record.require(key)?)?;
        let index = stats.vocabulary(key)?.lookup(&token);
        output.insert(config.transformed_name(key), TransformedValue::Int(index));
    }

    for key in &config.bucket_keys {
        let x = fill_numeric(key, record.require(key)?)?;
        let bucket = stats.bucket_boundaries(key)?.bucketize(x);
        output.insert(config.transformed_name(key), TransformedValue::Int(bucket));
    }

    let label = label_for_record(record, config)?;
    output.insert(
        config.transformed_name(&config.label_key),
        TransformedValue::Int(label),
    );

    Ok(output)
}

/// Transforms a slice of records in parallel, keeping their order.
pub fn preprocess_all(
    records: &[RawRecord],
    config: &TransformConfig,
    stats: &AnalyzedStatistics,
) -> TaxiTransformResult<Vec<TransformedRecord>> {
    info!("Standardization of dense columns: {:?}", config.dense_float_keys);
    info!("Transformation of categorical columns: {:?}", config.vocab_keys);
    info!("Bucketization of bucket columns: {:?}", config.bucket_keys);
    records
        .par_iter()
        .map(|record| preprocess(record, config, stats))
        .collect()
}

/// Builds one Arrow batch from transformed records, with columns in catalog output order.
pub fn records_to_batch(
    records: &[TransformedRecord],
    config: &TransformConfig,
) -> TaxiTransformResult<RecordBatch> {
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for key in config.output_keys() {
        let name = config.transformed_name(&key);
        let values = records
            .iter()
            .map(|r| {
                r.get(&name).copied().ok_or_else(|| {
                    TaxiTransformError::MissingColumn(format!(
                        "Column '{}' not found in transformed record",
                        name
                    ))
                })
            })
            .collect::<TaxiTransformResult<Vec<_>>>()?;

        if config.dense_float_keys.contains(&key) {
            let floats: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            fields.push(Field::new(&name, DataType::Float64, false));
            columns.push(Arc::new(Float64Array::from(floats)));
        } else {
            let ints: Vec<i64> = values.iter().filter_map(|v| v.as_i64()).collect();
            fields.push(Field::new(&name, DataType::Int64, false));
            columns.push(Arc::new(Int64Array::from(ints)));
        }
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    Ok(batch)
}

/// Reads the `columns` of collected Arrow batches into raw records.
pub fn records_from_batches(
    batches: &[RecordBatch],
    columns: &[String],
) -> TaxiTransformResult<Vec<RawRecord>> {
    let mut records = Vec::new();
    for batch in batches {
        let schema = batch.schema();
        let indices = columns
            .iter()
            .map(|name| {
                schema.index_of(name).map_err(|_| {
                    TaxiTransformError::MissingColumn(format!(
                        "Column '{}' not found in record batch",
                        name
                    ))
                })
            })
            .collect::<TaxiTransformResult<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let mut record = RawRecord::new();
            for (name, &idx) in columns.iter().zip(indices.iter()) {
                let scalar = ScalarValue::try_from_array(batch.column(idx), row)?;
                record.insert(name.as_str(), RawValue::try_from_scalar(name, scalar)?);
            }
            records.push(record);
        }
    }
    Ok(records)
}

/// One expression per output column, in catalog output order and aliased to the transformed
/// names. Evaluated row by row they give the same values as [`preprocess`].
pub fn transform_exprs(
    config: &TransformConfig,
    stats: &AnalyzedStatistics,
) -> TaxiTransformResult<Vec<Expr>> {
    let mut exprs = Vec::with_capacity(config.output_keys().len());

    for key in &config.dense_float_keys {
        let scaled = stats
            .moments(key)?
            .scale_expr(filled_numeric_expr(key), config.variance_epsilon);
        exprs.push(scaled.alias(config.transformed_name(key)));
    }

    for key in &config.vocab_keys {
        let index = stats
            .vocabulary(key)?
            .index_expr(key, filled_string_expr(key));
        exprs.push(index.alias(config.transformed_name(key)));
    }

    for key in &config.bucket_keys {
        let bucket = stats
            .bucket_boundaries(key)?
            .case_expr(filled_numeric_expr(key));
        exprs.push(bucket.alias(config.transformed_name(key)));
    }

    exprs.push(label_expr(config).alias(config.transformed_name(&config.label_key)));
    Ok(exprs)
}

/// Fit/transform preprocessing over DataFusion DataFrames.
///
/// `fit` runs the analyze pass and keeps the resulting statistics. `transform` is then
/// deterministic: the same input and statistics always yield the same output.
pub struct TaxiPreprocessor {
    config: TransformConfig,
    stats: Option<AnalyzedStatistics>,
}

impl TaxiPreprocessor {
    /// Create an unfitted preprocessor.
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            stats: None,
        }
    }

    /// Create a preprocessor from statistics analyzed elsewhere.
    pub fn with_statistics(
        config: TransformConfig,
        stats: AnalyzedStatistics,
    ) -> TaxiTransformResult<Self> {
        config.validate()?;
        stats.ensure_covers(&config)?;
        Ok(Self {
            config,
            stats: Some(stats),
        })
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Statistics from the last fit, if any.
    pub fn statistics(&self) -> Option<&AnalyzedStatistics> {
        self.stats.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.stats.is_some()
    }

    fn fitted_stats(&self) -> TaxiTransformResult<&AnalyzedStatistics> {
        self.stats.as_ref().ok_or(TaxiTransformError::FitNotCalled)
    }

    /// Runs the analyze pass over the DataFrame.
    pub async fn fit(&mut self, df: &DataFrame) -> TaxiTransformResult<()> {
        let start = Instant::now();
        let stats = analyze_dataframe(df, &self.config).await?;
        debug!("Analyze pass completed in {:?}", start.elapsed());
        self.stats = Some(stats);
        Ok(())
    }

    /// Runs the analyze pass over in-memory records.
    pub fn fit_records(&mut self, records: &[RawRecord]) -> TaxiTransformResult<()> {
        self.stats = Some(analyze_records(records, &self.config)?);
        Ok(())
    }

    /// Transforms in-memory records with the fitted statistics.
    pub fn transform_records(
        &self,
        records: &[RawRecord],
    ) -> TaxiTransformResult<Vec<TransformedRecord>> {
        preprocess_all(records, &self.config, self.fitted_stats()?)
    }

    /// Projects `df` onto the transformed columns.
    ///
    /// Nothing is executed: the returned DataFrame extends the input's logical plan and keeps its
    /// session.
    pub fn transform(&self, df: DataFrame) -> TaxiTransformResult<DataFrame> {
        let stats = self.fitted_stats()?;
        validate_schema(df.schema(), &self.config)?;
        let exprs = transform_exprs(&self.config, stats)?;
        Ok(df.select(exprs)?)
    }

    /// Transforms `df` and collects the result into a single Arrow batch.
    pub async fn transform_to_batch(&self, df: DataFrame) -> TaxiTransformResult<RecordBatch> {
        let start = Instant::now();
        let transformed = self.transform(df)?;
        let schema = Arc::new(transformed.schema().as_arrow().clone());
        let batches = transformed.collect().await?;
        let batch = concat_batches(&schema, &batches)?;
        debug!(
            rows = batch.num_rows(),
            "Transform completed in {:?}",
            start.elapsed()
        );
        Ok(batch)
    }

    /// Fits on `df` and transforms it.
    pub async fn fit_transform(&mut self, df: DataFrame) -> TaxiTransformResult<DataFrame> {
        self.fit(&df).await?;
        self.transform(df)
    }
}
