//! Refresh state machine shared by every handle of a [`TokenCache`](super::TokenCache).

// crates.io
use futures::future::{BoxFuture, Shared};
// self
use crate::{_prelude::*, auth::CachedAuth};

/// In-flight refresh shared by every caller of the same cycle.
pub(crate) type SharedRefresh = Shared<BoxFuture<'static, Result<crate::auth::AuthHeader>>>;

/// Observable phase of the cache at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheState {
	/// No refresh has run yet.
	Empty,
	/// A cached header is inside its validity window.
	Fresh,
	/// The cached header reached its renewal instant; the next call refreshes.
	Stale,
	/// An exchange is in flight; callers wait on its result.
	Refreshing,
	/// The last refresh failed; the next call refreshes.
	Backoff,
}
impl CacheState {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheState::Empty => "empty",
			CacheState::Fresh => "fresh",
			CacheState::Stale => "stale",
			CacheState::Refreshing => "refreshing",
			CacheState::Backoff => "backoff",
		}
	}
}
impl Display for CacheState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

pub(crate) enum RefreshState {
	Empty,
	Cached(CachedAuth),
	Refreshing {
		pending: SharedRefresh,
		previous: Option<CachedAuth>,
	},
	Backoff {
		error: Error,
		failed_at: i64,
	},
}
impl RefreshState {
	pub(crate) fn phase_at(&self, now: i64) -> CacheState {
		match self {
			Self::Empty => CacheState::Empty,
			Self::Cached(auth) if auth.is_fresh_at(now) => CacheState::Fresh,
			Self::Cached(_) => CacheState::Stale,
			Self::Refreshing { .. } => CacheState::Refreshing,
			Self::Backoff { .. } => CacheState::Backoff,
		}
	}

	/// Instant from which a new refresh may start; `None` while one is in flight.
	///
	/// A failed cycle is due immediately, so the first call after a failure retries.
	pub(crate) fn expiry(&self) -> Option<i64> {
		match self {
			Self::Empty => Some(i64::MIN),
			Self::Cached(auth) => Some(auth.expires_at),
			Self::Refreshing { .. } => None,
			Self::Backoff { failed_at, .. } => Some(*failed_at),
		}
	}

	pub(crate) fn cached(&self) -> Option<&CachedAuth> {
		match self {
			Self::Cached(auth) => Some(auth),
			Self::Refreshing { previous, .. } => previous.as_ref(),
			_ => None,
		}
	}
}
impl Debug for RefreshState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Empty => f.write_str("Empty"),
			Self::Cached(auth) => f.debug_tuple("Cached").field(auth).finish(),
			Self::Refreshing { previous, .. } =>
				f.debug_struct("Refreshing").field("previous", previous).finish_non_exhaustive(),
			Self::Backoff { error, failed_at } => f
				.debug_struct("Backoff")
				.field("error", error)
				.field("failed_at", failed_at)
				.finish(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{AuthHeader, TokenSecret};

	fn cached(expires_at: i64) -> RefreshState {
		RefreshState::Cached(CachedAuth {
			header: AuthHeader::new("Bearer", &TokenSecret::new("abc")),
			issued_at: 1_000,
			expires_at,
		})
	}

	#[test]
	fn phases_follow_expiry() {
		assert_eq!(RefreshState::Empty.phase_at(0), CacheState::Empty);
		assert_eq!(cached(4_300).phase_at(4_200), CacheState::Fresh);
		assert_eq!(cached(4_300).phase_at(4_300), CacheState::Stale);

		let backoff = RefreshState::Backoff {
			error: Error::ExchangeRejected { status: 400, body: String::new() },
			failed_at: 5_000,
		};

		assert_eq!(backoff.phase_at(5_000), CacheState::Backoff);
		assert_eq!(backoff.expiry(), Some(5_000));
		assert!(backoff.cached().is_none());
	}

	#[test]
	fn empty_state_is_always_due() {
		assert!(RefreshState::Empty.expiry().is_some_and(|expiry| 0 >= expiry));
		assert_eq!(CacheState::Backoff.to_string(), "backoff");
	}
}
