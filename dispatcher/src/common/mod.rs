pub mod errors;
pub mod rate_limiter;

pub use errors::{CancelReason, DispatchError, LimitsError};
pub use rate_limiter::{RateLimitError, RateLimiter};
