//! Core conversion logic and shared types

pub mod config;
pub mod conversion;
pub mod error;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use conversion::{ConversionEngine, ConversionRecord};
pub use error::{ConversionError, FailureCause, FetchError, HistoryError, RateError};
pub use rates::{RateSource, RateTable};
