use approx::assert_abs_diff_eq;

use taxi_transform::analyzer::{analyze_records, AnalyzedStatistics};
use taxi_transform::exceptions::{TaxiTransformError, TaxiTransformResult};
use taxi_transform::pipeline::{preprocess, preprocess_all, TaxiPreprocessor};
use taxi_transform::record::{RawRecord, RawValue, TransformedValue};
use taxi_transform::settings::{LabelPolicy, TransformConfig};

mod shared;

fn fitted() -> (TransformConfig, Vec<RawRecord>, AnalyzedStatistics) {
    let config = TransformConfig::default();
    let records = shared::to_records(&shared::taxi_trips(500));
    let stats = analyze_records(&records, &config).expect("analyze");
    (config, records, stats)
}

#[test]
fn test_output_keys_are_transformed_catalog() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let out = preprocess(&records[1], &config, &stats)?;

    let mut expected = config.transformed_names(&config.output_keys());
    expected.sort();
    let keys: Vec<String> = out.keys().cloned().collect();
    assert_eq!(keys, expected);
    assert_eq!(keys.len(), 3 + 2 + 4 + 1);

    for key in config.transformed_names(&config.dense_float_keys) {
        assert!(matches!(out[&key], TransformedValue::Float(_)), "{}", key);
    }
    for key in config.transformed_names(&config.vocab_keys)
        .into_iter()
        .chain(config.transformed_names(&config.bucket_keys))
        .chain(config.transformed_names(&[config.label_key.as_str()]))
    {
        assert!(matches!(out[&key], TransformedValue::Int(_)), "{}", key);
    }
    Ok(())
}

#[test]
fn test_dense_columns_are_standardized() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let out = preprocess_all(&records, &config, &stats)?;

    for key in config.transformed_names(&config.dense_float_keys) {
        let values: Vec<f64> = out.iter().map(|r| r[&key].as_f64().unwrap()).collect();
        assert!(values.iter().all(|v| v.is_finite()), "{}", key);
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(variance, 1.0, epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn test_constant_column_stays_finite() -> TaxiTransformResult<()> {
    let config = TransformConfig::new(vec!["fare".to_string()], vec![], vec![], "tips", "fare");
    let records: Vec<RawRecord> = (0..5)
        .map(|_| RawRecord::new().with("fare", 7.0).with("tips", 1.0))
        .collect();
    let stats = analyze_records(&records, &config)?;
    let out = preprocess(&records[0], &config, &stats)?;
    assert_eq!(out["fare_xf"], TransformedValue::Float(0.0));

    let drifted = RawRecord::new().with("fare", 9.0).with("tips", 1.0);
    let out = preprocess(&drifted, &config, &stats)?;
    assert_eq!(out["fare_xf"], TransformedValue::Float(2.0));
    Ok(())
}

#[test]
fn test_vocabulary_indices_in_range_and_stable() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let bound = (config.vocab_size + config.oov_size) as i64;

    for record in &records {
        let first = preprocess(record, &config, &stats)?;
        let second = preprocess(record, &config, &stats)?;
        for key in config.transformed_names(&config.vocab_keys) {
            let index = first[&key].as_i64().unwrap();
            assert!((0..bound).contains(&index));
            assert_eq!(first[&key], second[&key]);
        }
    }

    // "Cash" is the most frequent payment type.
    let cash = records[1].clone().with("payment_type", "Cash");
    assert_eq!(preprocess(&cash, &config, &stats)?["payment_type_xf"].as_i64(), Some(0));
    Ok(())
}

#[test]
fn test_unseen_strings_map_to_oov_buckets() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let vocab_len = stats.vocabulary("company")?.len() as i64;

    for company in ["Yellow Cab Affiliation", "Blue Ribbon", "Taxi Affiliation Services"] {
        let record = records[1].clone().with("company", company);
        let a = preprocess(&record, &config, &stats)?["company_xf"].as_i64().unwrap();
        let b = preprocess(&record, &config, &stats)?["company_xf"].as_i64().unwrap();
        assert_eq!(a, b);
        assert!(a >= vocab_len && a < vocab_len + config.oov_size as i64);
    }
    Ok(())
}

#[test]
fn test_bucket_indices_are_monotonic() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let mut latitudes: Vec<f64> = (0..200).map(|i| 41.5 + i as f64 * 0.002).collect();
    latitudes.sort_by(f64::total_cmp);

    let buckets: Vec<i64> = latitudes
        .iter()
        .map(|lat| {
            let record = records[1].clone().with("pickup_latitude", *lat);
            preprocess(&record, &config, &stats)
                .map(|out| out["pickup_latitude_xf"].as_i64().unwrap())
        })
        .collect::<TaxiTransformResult<_>>()?;

    assert!(buckets.iter().all(|b| (0..10).contains(b)));
    assert!(buckets.windows(2).all(|w| w[0] <= w[1]));
    // The sweep runs past both ends of the analyzed range.
    assert_eq!(buckets.first(), Some(&0));
    assert_eq!(buckets.last(), Some(&9));
    Ok(())
}

#[test]
fn test_label_examples() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let label = |fare: RawValue, tips: RawValue| -> TaxiTransformResult<i64> {
        let record = records[1].clone().with("fare", fare).with("tips", tips);
        Ok(preprocess(&record, &config, &stats)?["tips_xf"].as_i64().unwrap())
    };

    assert_eq!(label(10.0.into(), 1.01.into())?, 1);
    assert_eq!(label(10.0.into(), 1.00.into())?, 0);
    assert_eq!(label(0.0.into(), 0.0.into())?, 0);
    for tips in [0.0, 3.0, 1e6] {
        assert_eq!(label(f64::NAN.into(), tips.into())?, 0);
    }
    // Missing tips fill to 0.
    assert_eq!(label(10.0.into(), RawValue::Float(None))?, 0);
    Ok(())
}

#[test]
fn test_missing_fare_label_under_both_policies() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let record = records[1]
        .clone()
        .with("fare", RawValue::Float(None))
        .with("tips", 2.5);

    // Fill happens before the NaN check: the missing fare reads as 0 and any positive tip wins.
    let fill_first = preprocess(&record, &config, &stats)?;
    assert_eq!(fill_first["tips_xf"].as_i64(), Some(1));

    let check_first = config.clone().with_label_policy(LabelPolicy::CheckBeforeFill);
    let out = preprocess(&record, &check_first, &stats)?;
    assert_eq!(out["tips_xf"].as_i64(), Some(0));

    // The policies only differ on a missing fare.
    let present = records[1].clone().with("fare", 10.0).with("tips", 2.5);
    assert_eq!(
        preprocess(&present, &config, &stats)?["tips_xf"],
        preprocess(&present, &check_first, &stats)?["tips_xf"]
    );
    Ok(())
}

#[test]
fn test_transform_is_idempotent() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let first = preprocess_all(&records, &config, &stats)?;
    let second = preprocess_all(&records, &config, &stats)?;
    assert_eq!(format!("{:?}", first), format!("{:?}", second));
    for (a, b) in first.iter().zip(second.iter()) {
        for (key, value) in a {
            match (value, &b[key]) {
                (TransformedValue::Float(x), TransformedValue::Float(y)) => {
                    assert_eq!(x.to_bits(), y.to_bits())
                }
                (x, y) => assert_eq!(x, y),
            }
        }
    }
    Ok(())
}

#[test]
fn test_missing_column_is_reported() {
    let (config, _, stats) = fitted();
    let record = RawRecord::new().with("fare", 10.0).with("tips", 1.0);
    let err = preprocess(&record, &config, &stats).unwrap_err();
    assert!(matches!(err, TaxiTransformError::MissingColumn(msg) if msg.contains("trip_miles")));
}

#[test]
fn test_type_mismatch_is_reported() {
    let (config, records, stats) = fitted();
    let record = records[1].clone().with("company", 42.0);
    match preprocess(&record, &config, &stats) {
        Err(TaxiTransformError::TypeMismatch { column, .. }) => assert_eq!(column, "company"),
        other => panic!("expected type mismatch, got {:?}", other),
    }
    let record = records[1].clone().with("trip_miles", "far");
    assert!(matches!(
        preprocess(&record, &config, &stats),
        Err(TaxiTransformError::TypeMismatch { column, .. }) if column == "trip_miles"
    ));
}

#[test]
fn test_missing_statistic_is_reported() {
    let (config, records, _) = fitted();
    let err = preprocess(&records[1], &config, &AnalyzedStatistics::default()).unwrap_err();
    assert!(matches!(err, TaxiTransformError::MissingStatistic(_)));
}

#[test]
fn test_preprocessor_over_records() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let mut preprocessor = TaxiPreprocessor::new(config.clone());
    assert!(matches!(
        preprocessor.transform_records(&records),
        Err(TaxiTransformError::FitNotCalled)
    ));
    preprocessor.fit_records(&records)?;
    assert_eq!(preprocessor.statistics(), Some(&stats));
    assert_eq!(
        preprocessor.transform_records(&records)?,
        preprocess_all(&records, &config, &stats)?
    );

    let external = TaxiPreprocessor::with_statistics(config.clone(), stats)?;
    assert!(external.is_fitted());
    assert!(TaxiPreprocessor::with_statistics(config, AnalyzedStatistics::default()).is_err());
    Ok(())
}

#[test]
fn test_nan_in_dense_column_keeps_other_rows_finite() -> TaxiTransformResult<()> {
    let (config, mut records, _) = fitted();
    records[3] = records[3].clone().with("trip_miles", f64::NAN);
    let stats = analyze_records(&records, &config)?;
    assert_eq!(stats.moments("trip_miles")?.count, records.len() as u64 - 1);

    let out = preprocess_all(&records, &config, &stats)?;
    for (i, record) in out.iter().enumerate() {
        let scaled = record["trip_miles_xf"].as_f64().unwrap();
        if i == 3 {
            assert!(scaled.is_nan());
        } else {
            assert!(scaled.is_finite(), "row {}", i);
        }
    }
    Ok(())
}

#[test]
fn test_custom_suffix_names_record_keys() -> TaxiTransformResult<()> {
    let (config, records, stats) = fitted();
    let config = config.with_suffix("_t");
    let out = preprocess(&records[1], &config, &stats)?;

    let mut expected = config.transformed_names(&config.output_keys());
    expected.sort();
    let keys: Vec<String> = out.keys().cloned().collect();
    assert_eq!(keys, expected);
    assert!(out.contains_key("tips_t"));
    assert!(!out.contains_key("tips_xf"));
    Ok(())
}
