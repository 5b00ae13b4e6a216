#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::memory::MemTable;
use datafusion::prelude::{DataFrame, SessionContext};
use taxi_transform::record::{RawRecord, RawValue};

/// One synthetic taxi trip, with `None` marking a missing value.
pub struct Trip {
    pub fare: Option<f64>,
    pub tips: Option<f64>,
    pub trip_miles: Option<f64>,
    pub trip_seconds: Option<i64>,
    pub payment_type: Option<String>,
    pub company: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
}

const PAYMENT_TYPES: [&str; 4] = ["Credit Card", "Cash", "Cash", "Mobile"];

/// Builds `n` deterministic trips with a sprinkling of missing values.
pub fn taxi_trips(n: usize) -> Vec<Trip> {
    (0..n)
        .map(|i| {
            let fare = 5.0 + (i % 17) as f64 * 1.5;
            let tips = match i % 3 {
                0 => fare * 0.2,
                1 => 0.0,
                _ => fare * 0.05,
            };
            Trip {
                fare: (i % 23 != 0).then_some(fare),
                tips: (i % 29 != 0).then_some(tips),
                trip_miles: (i % 19 != 0).then_some((i % 11) as f64 * 0.7),
                trip_seconds: Some(60 + (i as i64 * 37) % 900),
                payment_type: (i % 31 != 0).then(|| PAYMENT_TYPES[i % 4].to_string()),
                company: (i % 13 != 0).then(|| format!("Company {}", i % 7)),
                pickup_latitude: Some(41.7 + ((i * 7) % 100) as f64 / 1000.0),
                pickup_longitude: Some(-87.9 + ((i * 11) % 100) as f64 / 1000.0),
                dropoff_latitude: (i % 17 != 0).then_some(41.8 + ((i * 13) % 100) as f64 / 1000.0),
                dropoff_longitude: Some(-87.6 - ((i * 3) % 100) as f64 / 1000.0),
            }
        })
        .collect()
}

pub fn to_records(trips: &[Trip]) -> Vec<RawRecord> {
    trips
        .iter()
        .map(|t| {
            RawRecord::new()
                .with("fare", RawValue::Float(t.fare))
                .with("tips", RawValue::Float(t.tips))
                .with("trip_miles", RawValue::Float(t.trip_miles))
                .with("trip_seconds", RawValue::Int(t.trip_seconds))
                .with("payment_type", RawValue::Str(t.payment_type.clone()))
                .with("company", RawValue::Str(t.company.clone()))
                .with("pickup_latitude", RawValue::Float(t.pickup_latitude))
                .with("pickup_longitude", RawValue::Float(t.pickup_longitude))
                .with("dropoff_latitude", RawValue::Float(t.dropoff_latitude))
                .with("dropoff_longitude", RawValue::Float(t.dropoff_longitude))
        })
        .collect()
}

/// Registers the trips as an in-memory table and returns it as a DataFrame.
pub async fn to_dataframe(trips: &[Trip]) -> DataFrame {
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

    let floats = |f: fn(&Trip) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(trips.iter().map(f).collect::<Vec<_>>()))
    };
    let strings = |f: fn(&Trip) -> Option<String>| -> ArrayRef {
        Arc::new(StringArray::from(trips.iter().map(f).collect::<Vec<_>>()))
    };
    let columns: Vec<ArrayRef> = vec![
        floats(|t| t.fare),
        floats(|t| t.tips),
        floats(|t| t.trip_miles),
        Arc::new(Int64Array::from(
            trips.iter().map(|t| t.trip_seconds).collect::<Vec<_>>(),
        )),
        strings(|t| t.payment_type.clone()),
        strings(|t| t.company.clone()),
        floats(|t| t.pickup_latitude),
        floats(|t| t.pickup_longitude),
        floats(|t| t.dropoff_latitude),
        floats(|t| t.dropoff_longitude),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("trips", Arc::new(mem_table)).unwrap();
    ctx.table("trips").await.unwrap()
}
