//! Ordered fallback across provider endpoints.
//!
//! Endpoints are invoked one at a time in priority order, never concurrently. The first
//! success wins and no later endpoint is touched.

use crate::provider::ProviderError;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Future returned by an endpoint call.
pub type EndpointFuture<T> = BoxFuture<'static, Result<T, ProviderError>>;

/// A named, reusable, zero-argument provider operation.
pub struct Endpoint<T> {
	name: String,
	call: Arc<dyn Fn() -> EndpointFuture<T> + Send + Sync>,
}

impl<T> Endpoint<T> {
	pub fn new<F>(name: impl Into<String>, call: F) -> Self
	where
		F: Fn() -> EndpointFuture<T> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			call: Arc::new(call),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn call(&self) -> EndpointFuture<T> {
		(self.call)()
	}
}

impl<T> Clone for Endpoint<T> {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			call: self.call.clone(),
		}
	}
}

impl<T> fmt::Debug for Endpoint<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Endpoint").field("name", &self.name).finish()
	}
}

/// Failure recorded for one endpoint during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
	pub endpoint: String,
	pub error: ProviderError,
}

impl fmt::Display for EndpointFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.endpoint, self.error)
	}
}

/// Every endpoint in a fallback sequence failed; no provider could satisfy the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("All {} providers failed: [{}]", .failures.len(), display_failures(.failures))]
pub struct AggregatedError {
	/// Failures in endpoint order.
	pub failures: Vec<EndpointFailure>,
}

impl AggregatedError {
	pub fn len(&self) -> usize {
		self.failures.len()
	}

	pub fn is_empty(&self) -> bool {
		self.failures.is_empty()
	}
}

fn display_failures(failures: &[EndpointFailure]) -> String {
	failures
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("; ")
}

/// Invokes `endpoints` in order and returns the first successful result.
pub async fn dispatch<T>(endpoints: &[Endpoint<T>]) -> Result<T, AggregatedError> {
	let mut failures = Vec::with_capacity(endpoints.len());

	for endpoint in endpoints {
		match endpoint.call().await {
			Ok(value) => {
				if !failures.is_empty() {
					debug!(
						"Endpoint {} succeeded after {} failed attempts",
						endpoint.name(),
						failures.len()
					);
				}
				return Ok(value);
			}
			Err(error) => {
				warn!("Endpoint {} failed: {}", endpoint.name(), error);
				failures.push(EndpointFailure {
					endpoint: endpoint.name().to_string(),
					error,
				});
			}
		}
	}

	Err(AggregatedError { failures })
}
