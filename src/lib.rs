//! # Taxi Transform
//!
//! Feature preprocessing for taxi trip data, built on Apache DataFusion.
//!
//! The crate turns raw trip columns into model-ready features and a binary "good tip" label.
//! An analyze pass computes dataset-wide statistics once; the transform then applies them row
//! by row:
//!
//! - dense numeric columns are scaled to zero mean and unit variance,
//! - categorical columns are mapped to vocabulary indices with hashed out-of-vocabulary buckets,
//! - geo-coordinate columns are assigned to equal-frequency quantile buckets,
//! - the label is 1 when the tip exceeds 10% of the fare.
//!
//! ### Example
//!
//! ```rust
//! use taxi_transform::analyzer::analyze_records;
//! use taxi_transform::pipeline::preprocess;
//! use taxi_transform::record::RawRecord;
//! use taxi_transform::settings::TransformConfig;
//!
//! let config = TransformConfig::new(
//!     vec!["fare".to_string()],
//!     vec![],
//!     vec!["company".to_string()],
//!     "tips",
//!     "fare",
//! );
//! let records = vec![
//!     RawRecord::new().with("fare", 10.0).with("tips", 2.0).with("company", "Flash Cab"),
//!     RawRecord::new().with("fare", 20.0).with("tips", 0.0).with("company", "Sun Taxi"),
//! ];
//! let stats = analyze_records(&records, &config).unwrap();
//! let out = preprocess(&records[0], &config, &stats).unwrap();
//! assert_eq!(out["tips_xf"].as_i64(), Some(1));
//! ```

pub mod analyzer;
pub mod exceptions;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod settings;
pub mod transformers;
