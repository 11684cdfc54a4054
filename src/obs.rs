//! Optional observability helpers for cache operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `google_token_cache.operation` with the
//!   `operation` and `stage` fields, plus events when refreshes start, finish, or fail.
//! - Enable `metrics` to increment the `google_token_cache_operation_total` counter for every
//!   attempt/hit/join/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// `TokenCache::refresh` calls, including cache hits.
	Refresh,
	/// Assertion construction (credential load + signing).
	Assertion,
	/// Token endpoint round trip.
	Exchange,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Refresh => "refresh",
			Operation::Assertion => "assertion",
			Operation::Exchange => "exchange",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation that performs work.
	Attempt,
	/// Refresh served from the cached header.
	Hit,
	/// Refresh joined an exchange already in flight.
	Join,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Hit => "hit",
			Outcome::Join => "join",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records success or failure for a finished operation.
pub(crate) fn record_result<T>(operation: Operation, result: &Result<T>) {
	match result {
		Ok(_) => record_outcome(operation, Outcome::Success),
		Err(_) => record_outcome(operation, Outcome::Failure),
	}
}
