//! Per-transition timing predictors.
//!
//! # Architecture
//!
//! ```text
//! BusOptimizer ──► dyn Predictor
//!                      │
//!                      ├── MemoizedPredictor<P>   (moka cache keyed by query)
//!                      │        └── P
//!                      └── TimingTablePredictor   (static spacing table)
//! ```

mod memo;
mod table;
mod traits;

pub use memo::{MemoizedPredictor, PredictorCacheStats, DEFAULT_PREDICTION_CACHE_ENTRIES};
pub use table::{
    TimingTablePredictor, DEFAULT_REFRESH_RATE_US, DEFAULT_SPACING_CYCLES,
    WRITE_TO_READ_SPACING_CYCLES,
};
pub use traits::{Prediction, PredictionError, PredictionQuery, Predictor};
