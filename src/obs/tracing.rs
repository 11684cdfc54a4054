// self
use crate::{_prelude::*, obs::Operation};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by cache operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"google_token_cache.operation",
				operation = operation.as_str(),
				stage
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event when a caller starts a new exchange.
pub(crate) fn refresh_started(now: i64, previous_expiry: Option<i64>) {
	#[cfg(feature = "tracing")]
	tracing::debug!(now, previous_expiry, "starting token refresh");
	#[cfg(not(feature = "tracing"))]
	let _ = (now, previous_expiry);
}

/// Emits a debug event when a call is answered from the cached header.
pub(crate) fn refresh_hit(now: i64, expires_at: i64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(now, expires_at, "serving cached token");
	#[cfg(not(feature = "tracing"))]
	let _ = (now, expires_at);
}

/// Emits a debug event when a refresh stored a new header.
pub(crate) fn refresh_succeeded(expires_at: i64, expires_in: i64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(expires_at, expires_in, "token refreshed");
	#[cfg(not(feature = "tracing"))]
	let _ = (expires_at, expires_in);
}

/// Emits a warning when a refresh failed and the cache entered backoff.
pub(crate) fn refresh_failed(err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %err, remote = err.is_remote(), "token refresh failed");
	#[cfg(not(feature = "tracing"))]
	let _ = err;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OperationSpan::new(Operation::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn events_are_noops_without_subscriber() {
		refresh_started(1_000, None);
		refresh_hit(1_000, 4_300);
		refresh_succeeded(4_300, 3_600);
		refresh_failed(&Error::ExchangeRejected { status: 500, body: String::new() });
	}
}
