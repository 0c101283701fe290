//! Resilient provider dispatch
//!
//! Two building blocks make provider calls survive partial outages:
//!
//! - `fallback`: walks an ordered list of endpoints and returns the first success,
//!   aggregating every failure when none succeeds.
//! - `retry`: re-runs one operation up to a fixed number of attempts, keeping only the
//!   last failure.
//!
//! Broadcasting composes both: the whole fallback sequence is retried as one operation.

/// Ordered fallback across provider endpoints
pub mod fallback;
/// Bounded-attempt retry
pub mod retry;

pub use fallback::{AggregatedError, Endpoint, EndpointFailure, EndpointFuture, dispatch};
pub use retry::{RetryExhaustedError, RetryPolicy, retry};
