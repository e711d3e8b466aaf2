pub mod exchangerate_api;
pub mod util;

pub use exchangerate_api::ExchangeRateApiClient;
pub use util::{RetryPolicy, Sleeper, TokioSleeper};
