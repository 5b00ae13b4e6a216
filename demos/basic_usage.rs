// Run `cargo run --example basic_usage` to execute this example.
// Set DEBUG_TAXI_TRANSFORM=true to see the analyze and transform logs.

use std::error::Error;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use taxi_transform::pipeline::TaxiPreprocessor;
use taxi_transform::settings::TransformConfig;

/// Builds a small batch of taxi trips with a few missing values.
fn sample_trips() -> Result<RecordBatch, Box<dyn Error>> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("fare", DataType::Float64, true),
        Field::new("tips", DataType::Float64, true),
        Field::new("trip_miles", DataType::Float64, true),
        Field::new("trip_seconds", DataType::Int64, true),
        Field::new("payment_type", DataType::Utf8, true),
        Field::new("company", DataType::Utf8, true),
        Field::new("pickup_latitude", DataType::Float64, true),
        Field::new("pickup_longitude", DataType::Float64, true),
        Field::new("dropoff_latitude", DataType::Float64, true),
        Field::new("dropoff_longitude", DataType::Float64, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(vec![
            Some(12.25),
            Some(5.0),
            None,
            Some(31.5),
            Some(8.75),
            Some(17.0),
        ])),
        Arc::new(Float64Array::from(vec![
            Some(3.0),
            Some(0.0),
            Some(2.0),
            Some(2.0),
            None,
            Some(4.0),
        ])),
        Arc::new(Float64Array::from(vec![2.1, 0.6, 1.4, 11.3, 1.0, 3.9])),
        Arc::new(Int64Array::from(vec![720, 300, 540, 2160, 420, 960])),
        Arc::new(StringArray::from(vec![
            Some("Credit Card"),
            Some("Cash"),
            Some("Credit Card"),
            Some("Credit Card"),
            None,
            Some("Mobile"),
        ])),
        Arc::new(StringArray::from(vec![
            Some("Flash Cab"),
            Some("Sun Taxi"),
            None,
            Some("Flash Cab"),
            Some("Medallion Leasing"),
            Some("Sun Taxi"),
        ])),
        Arc::new(Float64Array::from(vec![41.88, 41.90, 41.79, 41.97, 41.89, 41.92])),
        Arc::new(Float64Array::from(vec![-87.63, -87.64, -87.60, -87.90, -87.62, -87.65])),
        Arc::new(Float64Array::from(vec![
            Some(41.89),
            Some(41.88),
            Some(41.87),
            None,
            Some(41.90),
            Some(41.94),
        ])),
        Arc::new(Float64Array::from(vec![-87.62, -87.63, -87.62, -87.63, -87.66, -87.65])),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let ctx = SessionContext::new();
    let input_df = ctx.read_batch(sample_trips()?)?;

    // Use five buckets since the sample only has six trips.
    let config = TransformConfig::default().with_bucket_size(5);
    let mut preprocessor = TaxiPreprocessor::new(config);
    let transformed = preprocessor.fit_transform(input_df).await?;

    transformed.show().await?;
    Ok(())
}
