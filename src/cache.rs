//! Single-flight token cache with expiry tracking and failure backoff.
//!
//! [`TokenCache::refresh`] hands out the cached `Authorization` header while it is inside its
//! validity window `[issued, reported_expiry - renew_margin)`. Once the window closes, the first
//! caller builds a new assertion, exchanges it, and publishes the exchange as a shared future;
//! every caller arriving before it settles awaits that same future, so concurrent cache misses
//! cost one network round trip.
//!
//! The decision to start a refresh and the publication of the in-flight future happen under a
//! single mutex acquisition that never spans an `.await`, which keeps the single-flight property
//! on multi-threaded executors. A failed cycle delivers its error to all of its waiters and
//! leaves the cache in [`CacheState::Backoff`]; the next call starts a fresh attempt. The cache
//! never retries on its own.
//!
//! A started cycle is also handed to a [`Spawner`], so it runs to completion even when every
//! caller stops waiting. With the `tokio` feature the default spawner uses the ambient tokio
//! runtime; without one, the cycle advances only while some caller awaits it.

mod metrics;
mod state;

pub use metrics::RefreshMetrics;
pub use state::CacheState;

// std
use std::sync::Weak;
// crates.io
use futures::{FutureExt, future::BoxFuture};
// self
use crate::{
	_prelude::*,
	assertion::AssertionBuilder,
	auth::{AuthHeader, CachedAuth},
	cache::state::{RefreshState, SharedRefresh},
	clock::{Clock, SystemClock},
	exchange::{TokenExchange, TokenResponse},
	obs::{self, Operation, OperationSpan, Outcome},
};

/// Runs a detached future to completion in the background.
pub type Spawner = Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>;

/// Caches the `Authorization` header for one credential/scope pair.
///
/// Clones are cheap handles onto the same state.
#[derive(Clone)]
pub struct TokenCache {
	assertions: Arc<AssertionBuilder>,
	exchange: Arc<dyn TokenExchange>,
	clock: Arc<dyn Clock>,
	renew_margin: Duration,
	state: Arc<Mutex<RefreshState>>,
	metrics: Arc<RefreshMetrics>,
	spawner: Option<Spawner>,
}
impl TokenCache {
	/// Creates an empty cache; the first [`refresh`](Self::refresh) performs an exchange.
	pub fn new(
		assertions: AssertionBuilder,
		exchange: Arc<dyn TokenExchange>,
		renew_margin: Duration,
	) -> Self {
		Self {
			assertions: Arc::new(assertions),
			exchange,
			clock: Arc::new(SystemClock),
			renew_margin,
			state: Arc::new(Mutex::new(RefreshState::Empty)),
			metrics: Default::default(),
			spawner: default_spawner(),
		}
	}

	/// Replaces the clock used for expiry bookkeeping.
	///
	/// The assertion builder keeps its own clock; tests driving time manually should hand the
	/// same clock to both.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replaces the spawner that drives started refresh cycles in the background.
	pub fn with_spawner(mut self, spawner: Spawner) -> Self {
		self.spawner = Some(spawner);

		self
	}

	/// Returns the current `Authorization` header, exchanging a new assertion when needed.
	pub async fn refresh(&self) -> Result<AuthHeader> {
		match self.begin() {
			Step::Cached(header) => Ok(header),
			Step::Wait(pending) => pending.await,
		}
	}

	/// Phase of the state machine right now.
	pub fn state(&self) -> CacheState {
		self.state.lock().phase_at(self.clock.now_unix())
	}

	/// Last successfully cached header, including one that is stale or being replaced.
	pub fn cached(&self) -> Option<CachedAuth> {
		self.state.lock().cached().cloned()
	}

	/// Error of the most recent cycle while the cache is in backoff.
	pub fn last_error(&self) -> Option<Error> {
		match &*self.state.lock() {
			RefreshState::Backoff { error, .. } => Some(error.clone()),
			_ => None,
		}
	}

	/// Counters describing cache activity.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Evaluates the transition rule and returns what the caller should do.
	fn begin(&self) -> Step {
		const OPERATION: Operation = Operation::Refresh;

		let mut state = self.state.lock();
		let now = self.clock.now_unix();

		match &*state {
			RefreshState::Cached(auth) if auth.is_fresh_at(now) => {
				self.metrics.record_hit();
				obs::record_outcome(OPERATION, Outcome::Hit);
				obs::refresh_hit(now, auth.expires_at);

				return Step::Cached(auth.header.clone());
			},
			RefreshState::Refreshing { pending, .. } => {
				self.metrics.record_join();
				obs::record_outcome(OPERATION, Outcome::Join);

				return Step::Wait(pending.clone());
			},
			_ => {},
		}

		let previous_expiry = state.expiry().filter(|expiry| *expiry != i64::MIN);
		let previous = state.cached().cloned();
		let pending = self.start_cycle().boxed().shared();

		self.metrics.record_exchange();
		obs::record_outcome(OPERATION, Outcome::Attempt);
		obs::refresh_started(now, previous_expiry);

		*state = RefreshState::Refreshing { pending: pending.clone(), previous };

		drop(state);

		if let Some(spawn) = &self.spawner {
			spawn(pending.clone().map(|_| ()).boxed());
		}

		Step::Wait(pending)
	}

	/// Builds the future for one refresh cycle.
	///
	/// The future only holds a weak reference to the state so an abandoned cycle cannot keep the
	/// cache alive through the shared future stored inside it.
	fn start_cycle(&self) -> impl Future<Output = Result<AuthHeader>> + Send + 'static {
		let assertions = self.assertions.clone();
		let exchange = self.exchange.clone();
		let clock = self.clock.clone();
		let renew_margin = self.renew_margin;
		let metrics = self.metrics.clone();
		let state = Arc::downgrade(&self.state);
		let span = OperationSpan::new(Operation::Refresh, "refresh_cycle");

		span.instrument(async move {
			let result = fetch_token(&assertions, exchange.as_ref()).await;
			let now = clock.now_unix();

			settle(&state, &metrics, result, now, renew_margin)
		})
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("assertions", &self.assertions)
			.field("renew_margin", &self.renew_margin)
			.field("state", &*self.state.lock())
			.finish()
	}
}

#[cfg(feature = "tokio")]
fn default_spawner() -> Option<Spawner> {
	Some(Arc::new(|cycle: BoxFuture<'static, ()>| {
		if let Ok(runtime) = tokio::runtime::Handle::try_current() {
			drop(runtime.spawn(cycle));
		}
	}))
}
#[cfg(not(feature = "tokio"))]
fn default_spawner() -> Option<Spawner> {
	None
}

enum Step {
	Cached(AuthHeader),
	Wait(SharedRefresh),
}

async fn fetch_token(
	assertions: &AssertionBuilder,
	exchange: &dyn TokenExchange,
) -> Result<TokenResponse> {
	let assertion = assertions.create_assertion().await?;

	exchange.exchange(assertion).await
}

/// Publishes the outcome of a cycle and returns it to the waiters.
fn settle(
	state: &Weak<Mutex<RefreshState>>,
	metrics: &RefreshMetrics,
	result: Result<TokenResponse>,
	now: i64,
	renew_margin: Duration,
) -> Result<AuthHeader> {
	match result {
		Ok(token) => {
			let expires_at = now
				.saturating_add(token.expires_in)
				.saturating_sub(renew_margin.whole_seconds());
			let header = AuthHeader::new(&token.token_type, &token.access_token);

			metrics.record_success();
			obs::record_outcome(Operation::Refresh, Outcome::Success);
			obs::refresh_succeeded(expires_at, token.expires_in);
			publish(
				state,
				RefreshState::Cached(CachedAuth { header: header.clone(), issued_at: now, expires_at }),
			);

			Ok(header)
		},
		Err(err) => {
			metrics.record_failure();
			obs::record_outcome(Operation::Refresh, Outcome::Failure);
			obs::refresh_failed(&err);
			publish(state, RefreshState::Backoff { error: err.clone(), failed_at: now });

			Err(err)
		},
	}
}

fn publish(state: &Weak<Mutex<RefreshState>>, next: RefreshState) {
	if let Some(state) = state.upgrade() {
		*state.lock() = next;
	}
}
