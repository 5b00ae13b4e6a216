//! ## Transform Configuration
//!
//! [`TransformConfig`] is the column catalog and policy surface of the preprocessing step.
//! It declares which raw columns are standardized, bucketized, or vocabulary-indexed, which
//! column is the label, and which column holds the fare used to derive the label.
//!
//! The default configuration reproduces the taxi trips setup:
//!
//! | Rule          | Columns                                                                  |
//! |---------------|--------------------------------------------------------------------------|
//! | z-score       | `fare`, `trip_miles`, `trip_seconds`                                     |
//! | bucketize     | `pickup_latitude`, `pickup_longitude`, `dropoff_latitude`, `dropoff_longitude` |
//! | vocabulary    | `payment_type`, `company`                                                |
//! | label         | `tips` (with fare column `fare`)                                         |
//!
//! The configuration is immutable once built and is passed explicitly to the analyze pass
//! and the transform.

use crate::exceptions::{TaxiTransformError, TaxiTransformResult};
use std::collections::HashSet;

/// Columns standardized to zero mean and unit variance.
pub const DENSE_FLOAT_FEATURE_KEYS: [&str; 3] = ["fare", "trip_miles", "trip_seconds"];

/// Geo-coordinate columns bucketized on quantile boundaries.
pub const BUCKET_FEATURE_KEYS: [&str; 4] = [
    "pickup_latitude",
    "pickup_longitude",
    "dropoff_latitude",
    "dropoff_longitude",
];

/// Categorical columns mapped to vocabulary indices.
pub const VOCAB_FEATURE_KEYS: [&str; 2] = ["payment_type", "company"];

pub const LABEL_KEY: &str = "tips";
pub const FARE_KEY: &str = "fare";

/// Number of most frequent strings kept in each vocabulary.
pub const VOCAB_SIZE: usize = 10_000;

/// Number of hash buckets for out-of-vocabulary strings.
pub const OOV_SIZE: usize = 10;

/// Number of quantile buckets for the geo-coordinate columns.
pub const BUCKET_SIZE: usize = 10;

/// Suffix appended to every transformed column name.
pub const TRANSFORMED_SUFFIX: &str = "_xf";

/// A tip is "good" when it exceeds this fraction of the fare.
pub const TIP_FRACTION_THRESHOLD: f64 = 0.10;

/// Variances below this value are treated as 1 when scaling.
pub const VARIANCE_EPSILON: f64 = 1e-12;

/// Ordering of the missing-value fill and the NaN check when deriving the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPolicy {
    /// Fill a missing fare with 0 first and check for NaN afterwards.
    ///
    /// A missing fare and a genuine zero fare become indistinguishable, so a missing fare
    /// with any positive tip yields label 1. Only an explicit NaN fare yields label 0.
    #[default]
    FillThenCheck,
    /// A missing fare yields label 0 before any fill takes place.
    CheckBeforeFill,
}

/// Column catalog and policy constants for the taxi preprocessing step.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    pub dense_float_keys: Vec<String>,
    pub bucket_keys: Vec<String>,
    pub vocab_keys: Vec<String>,
    pub label_key: String,
    pub fare_key: String,
    pub vocab_size: usize,
    pub oov_size: usize,
    pub bucket_size: usize,
    pub suffix: String,
    pub tip_threshold: f64,
    pub variance_epsilon: f64,
    pub label_policy: LabelPolicy,
}

fn to_strings(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            dense_float_keys: to_strings(&DENSE_FLOAT_FEATURE_KEYS),
            bucket_keys: to_strings(&BUCKET_FEATURE_KEYS),
            vocab_keys: to_strings(&VOCAB_FEATURE_KEYS),
            label_key: LABEL_KEY.to_string(),
            fare_key: FARE_KEY.to_string(),
            vocab_size: VOCAB_SIZE,
            oov_size: OOV_SIZE,
            bucket_size: BUCKET_SIZE,
            suffix: TRANSFORMED_SUFFIX.to_string(),
            tip_threshold: TIP_FRACTION_THRESHOLD,
            variance_epsilon: VARIANCE_EPSILON,
            label_policy: LabelPolicy::default(),
        }
    }
}

impl TransformConfig {
    /// Create a configuration with the given column catalog and the default policy constants.
    pub fn new(
        dense_float_keys: Vec<String>,
        bucket_keys: Vec<String>,
        vocab_keys: Vec<String>,
        label_key: impl Into<String>,
        fare_key: impl Into<String>,
    ) -> Self {
        Self {
            dense_float_keys,
            bucket_keys,
            vocab_keys,
            label_key: label_key.into(),
            fare_key: fare_key.into(),
            ..Self::default()
        }
    }

    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = vocab_size;
        self
    }

    pub fn with_oov_size(mut self, oov_size: usize) -> Self {
        self.oov_size = oov_size;
        self
    }

    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_tip_threshold(mut self, tip_threshold: f64) -> Self {
        self.tip_threshold = tip_threshold;
        self
    }

    pub fn with_variance_epsilon(mut self, variance_epsilon: f64) -> Self {
        self.variance_epsilon = variance_epsilon;
        self
    }

    pub fn with_label_policy(mut self, label_policy: LabelPolicy) -> Self {
        self.label_policy = label_policy;
        self
    }

    /// Name of the transformed counterpart of `key` under this configuration's suffix.
    pub fn transformed_name(&self, key: &str) -> String {
        format!("{}{}", key, self.suffix)
    }

    /// Appends this configuration's suffix to every key, keeping order.
    pub fn transformed_names<S: AsRef<str>>(&self, keys: &[S]) -> Vec<String> {
        keys.iter().map(|k| self.transformed_name(k.as_ref())).collect()
    }

    /// Every raw column the transform reads, in catalog order and without duplicates.
    ///
    /// The fare column is included even when it is not a dense-float column.
    pub fn input_columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.dense_float_keys
            .iter()
            .chain(self.vocab_keys.iter())
            .chain(self.bucket_keys.iter())
            .chain(std::iter::once(&self.label_key))
            .chain(std::iter::once(&self.fare_key))
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect()
    }

    /// Raw column names whose transformed counterparts make up the output, in output order.
    pub fn output_keys(&self) -> Vec<String> {
        self.dense_float_keys
            .iter()
            .chain(self.vocab_keys.iter())
            .chain(self.bucket_keys.iter())
            .chain(std::iter::once(&self.label_key))
            .cloned()
            .collect()
    }

    /// Checks that the catalog is well formed.
    ///
    /// The dense, bucket, vocabulary, and label sets must be disjoint, each column may be listed
    /// once, no column name may be empty, and the vocabulary and bucket sizes must be positive.
    /// Empty column lists are allowed; the corresponding rule then produces no output.
    pub fn validate(&self) -> TaxiTransformResult<()> {
        if self.vocab_size == 0 {
            return Err(TaxiTransformError::InvalidParameter(
                "Vocabulary size must be at least 1".to_string(),
            ));
        }
        if self.bucket_size == 0 {
            return Err(TaxiTransformError::InvalidParameter(
                "Number of buckets must be at least 1".to_string(),
            ));
        }
        if !self.tip_threshold.is_finite() {
            return Err(TaxiTransformError::InvalidParameter(format!(
                "Tip threshold {} must be finite",
                self.tip_threshold
            )));
        }
        if self.variance_epsilon.is_nan() || self.variance_epsilon < 0.0 {
            return Err(TaxiTransformError::InvalidParameter(format!(
                "Variance epsilon {} must be non-negative",
                self.variance_epsilon
            )));
        }
        if self.label_key.is_empty() || self.fare_key.is_empty() {
            return Err(TaxiTransformError::InvalidParameter(
                "Label and fare column names must not be empty".to_string(),
            ));
        }
        let lists = [
            ("dense", &self.dense_float_keys),
            ("bucket", &self.bucket_keys),
            ("vocabulary", &self.vocab_keys),
        ];
        for (rule, keys) in lists {
            if keys.iter().any(|k| k.is_empty()) {
                return Err(TaxiTransformError::InvalidParameter(format!(
                    "Empty column name in the {} columns",
                    rule
                )));
            }
        }

        let mut seen = HashSet::new();
        for key in self
            .dense_float_keys
            .iter()
            .chain(self.bucket_keys.iter())
            .chain(self.vocab_keys.iter())
            .chain(std::iter::once(&self.label_key))
        {
            if !seen.insert(key.as_str()) {
                return Err(TaxiTransformError::InvalidParameter(format!(
                    "Column '{}' is assigned to more than one transform rule",
                    key
                )));
            }
        }
        Ok(())
    }
}
