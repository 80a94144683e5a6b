//! Memoizing predictor decorator using moka.
//!
//! Wraps any [`Predictor`] and caches its results keyed by the exact
//! [`PredictionQuery`]. This is where the expensive part of the pipeline
//! (model inference) is deduplicated; the core itself stays stateless.
//!
//! Only successful predictions are cached, so a transient failure is retried
//! on the next call. [`MemoizedPredictor::invalidate_all`] drops every entry,
//! e.g. after the wrapped model has been retrained.
//!
//! The cache is a bounded `moka::sync::Cache`, so lookups from several
//! threads need no outer lock.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache as MokaCache;
use tracing::debug;

use super::traits::{Prediction, PredictionError, PredictionQuery, Predictor};

/// Default maximum number of cached predictions.
pub const DEFAULT_PREDICTION_CACHE_ENTRIES: u64 = 4096;

/// Hit/miss counters of a [`MemoizedPredictor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictorCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

impl PredictorCacheStats {
    /// Fraction of lookups served from cache (0.0 when unused).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Predictor decorator that caches results by query.
pub struct MemoizedPredictor<P> {
    inner: P,
    cache: MokaCache<PredictionQuery, Prediction>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P: Predictor> MemoizedPredictor<P> {
    /// Wrap a predictor with a cache of [`DEFAULT_PREDICTION_CACHE_ENTRIES`].
    pub fn new(inner: P) -> Self {
        Self::with_capacity(inner, DEFAULT_PREDICTION_CACHE_ENTRIES)
    }

    /// Wrap a predictor with a cache holding at most `max_entries` results.
    pub fn with_capacity(inner: P, max_entries: u64) -> Self {
        Self {
            inner,
            cache: MokaCache::builder().max_capacity(max_entries).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The wrapped predictor.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop every cached prediction.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
        debug!(predictor = self.inner.name(), "Prediction cache invalidated");
    }

    /// Drop the cached prediction for one query.
    pub fn invalidate(&self, query: &PredictionQuery) {
        self.cache.invalidate(query);
    }

    /// Current counters.
    pub fn stats(&self) -> PredictorCacheStats {
        self.cache.run_pending_tasks();
        PredictorCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

impl<P: Predictor> Predictor for MemoizedPredictor<P> {
    fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError> {
        if let Some(cached) = self.cache.get(query) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let prediction = self.inner.predict(query)?;
        self.cache.insert(query.clone(), prediction);
        Ok(prediction)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
