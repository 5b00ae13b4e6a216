//! # Vocabulary Encoding
//!
//! A [`Vocabulary`] maps categorical strings to integer indices by frequency rank:
//!
//! - the most frequent string gets index 0, the next one index 1, and so on, up to `top_k`
//!   strings; equal frequencies are ordered by ascending byte-wise string value,
//! - strings outside the vocabulary are hashed with 64-bit FNV-1a into one of `num_oov_buckets`
//!   indices placed right after the vocabulary, so every input receives an index.
//!
//! Given the same analyzed corpus, the same string always maps to the same index.
//!
//! [`Vocabulary::index_expr`] applies the lookup inside a DataFusion plan through a scalar UDF
//! that owns a copy of the vocabulary.

use arrow::array::{AsArray, Int64Array};
use arrow::datatypes::DataType;
use datafusion::error::{DataFusionError, Result as DFResult};
use datafusion::logical_expr::{
    create_udf, ColumnarValue, Expr, ScalarFunctionImplementation, Volatility,
};
use fnv::FnvHasher;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::Arc;

/// Index returned for unseen strings when there are no OOV buckets.
pub const DEFAULT_INDEX: i64 = -1;

/// Ranked vocabulary of a categorical column plus its out-of-vocabulary policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, i64>,
    num_oov_buckets: usize,
}

impl Vocabulary {
    /// Builds a vocabulary from strings that are already ranked (most frequent first).
    ///
    /// Duplicate strings keep their first rank.
    pub fn from_ranked(ranked: Vec<String>, num_oov_buckets: usize) -> Self {
        let mut tokens = Vec::with_capacity(ranked.len());
        let mut index = HashMap::with_capacity(ranked.len());
        for token in ranked {
            if !index.contains_key(&token) {
                index.insert(token.clone(), tokens.len() as i64);
                tokens.push(token);
            }
        }
        Self {
            tokens,
            index,
            num_oov_buckets,
        }
    }

    /// Ranks `(string, count)` pairs and keeps the `top_k` most frequent strings.
    pub fn from_frequencies<I>(frequencies: I, top_k: usize, num_oov_buckets: usize) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut ranked: Vec<(String, u64)> = frequencies.into_iter().collect();
        ranked.sort_by(|(a, ca), (b, cb)| cb.cmp(ca).then_with(|| a.cmp(b)));
        ranked.truncate(top_k);
        Self::from_ranked(
            ranked.into_iter().map(|(token, _)| token).collect(),
            num_oov_buckets,
        )
    }

    /// Number of in-vocabulary strings.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// In-vocabulary strings in index order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn num_oov_buckets(&self) -> usize {
        self.num_oov_buckets
    }

    /// Size of the index space: vocabulary length plus OOV buckets.
    pub fn index_space(&self) -> usize {
        self.tokens.len() + self.num_oov_buckets
    }

    /// Index of `token`, hashing unseen strings into the OOV range.
    pub fn lookup(&self, token: &str) -> i64 {
        if let Some(&i) = self.index.get(token) {
            return i;
        }
        if self.num_oov_buckets == 0 {
            return DEFAULT_INDEX;
        }
        (self.tokens.len() + oov_bucket(token, self.num_oov_buckets)) as i64
    }

    /// True if `token` is part of the learned vocabulary.
    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Applies [`Vocabulary::lookup`] to a Utf8 `value` expression. A null input is looked up
    /// as `""`.
    pub fn index_expr(&self, column: &str, value: Expr) -> Expr {
        let vocabulary = Arc::new(self.clone());
        let lookup: ScalarFunctionImplementation =
            Arc::new(move |args: &[ColumnarValue]| -> DFResult<ColumnarValue> {
                let arrays = ColumnarValue::values_to_arrays(args)?;
                let tokens = arrays
                    .first()
                    .and_then(|a| a.as_string_opt::<i32>())
                    .ok_or_else(|| {
                        DataFusionError::Internal(
                            "vocabulary lookup expects one Utf8 argument".to_string(),
                        )
                    })?;
                let indices: Int64Array = tokens
                    .iter()
                    .map(|t| Some(vocabulary.lookup(t.unwrap_or(""))))
                    .collect();
                Ok(ColumnarValue::Array(Arc::new(indices)))
            });
        let udf = create_udf(
            &format!("vocabulary_index_{}", column),
            vec![DataType::Utf8],
            DataType::Int64,
            Volatility::Immutable,
            lookup,
        );
        udf.call(vec![value])
    }
}

/// Deterministic OOV bucket of `token` in `[0, num_buckets)`.
pub fn oov_bucket(token: &str, num_buckets: usize) -> usize {
    let mut hasher = FnvHasher::default();
    hasher.write(token.as_bytes());
    (hasher.finish() % num_buckets as u64) as usize
}
