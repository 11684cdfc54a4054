//! Wall-clock sources used for assertion timestamps and cache expiry.
//!
//! Expiry bookkeeping works in whole Unix seconds, matching the `iat`/`exp` claim
//! resolution, so every clock reports `i64` seconds.

// std
use std::sync::atomic::{AtomicI64, Ordering};
// self
use crate::_prelude::*;

/// Source of the current Unix time in whole seconds.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current Unix timestamp in seconds.
	fn now_unix(&self) -> i64;
}

/// Clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now_unix(&self) -> i64 {
		OffsetDateTime::now_utc().unix_timestamp()
	}
}

/// Manually driven clock for deterministic tests and simulations.
///
/// Clones share the same instant, so a test can keep one handle while the cache holds another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Arc<AtomicI64>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: i64) -> Self {
		Self(Arc::new(AtomicI64::new(start)))
	}

	/// Jumps to an absolute instant.
	pub fn set(&self, now: i64) {
		self.0.store(now, Ordering::SeqCst);
	}

	/// Moves the clock forward by `by`.
	pub fn advance(&self, by: Duration) {
		self.0.fetch_add(by.whole_seconds(), Ordering::SeqCst);
	}
}
impl Clock for ManualClock {
	fn now_unix(&self) -> i64 {
		self.0.load(Ordering::SeqCst)
	}
}
