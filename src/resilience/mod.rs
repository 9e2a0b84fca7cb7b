//! Failure handling around remote calls.
//!
//! - [`retry`] -- bounded retry with capped exponential backoff and a
//!   configurable fatal-code classifier.
//! - [`breaker`] -- the per-episode consecutive-failure circuit breaker.

pub mod breaker;
pub mod retry;

pub use breaker::CircuitBreaker;
pub use retry::{with_retry, ErrorClassifier, Retrier, RetryPolicy, DEFAULT_FATAL_CODES};
