//! Transport primitives for token exchanges.
//!
//! [`TokenHttpClient`] is the crate's only dependency on an HTTP stack. The exchanger asks it
//! for an [`AsyncHttpClient`] handle per request, sends a fully built [`HttpRequest`], and reads
//! status and body from the [`HttpResponse`]. Retries, timeouts, and proxies are the
//! transport's business; whatever error it finally surfaces ends the current refresh attempt.

// std
use std::ops::Deref;
// crates.io
use oauth2::AsyncHttpClient;
#[cfg(feature = "reqwest")] use oauth2::{HttpClientError, HttpRequest, HttpResponse};
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Abstraction over HTTP transports capable of executing token exchanges.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back a cache shared
/// across tasks, and the handles they return must own whatever state their request futures
/// need so those futures stay `Send` while the exchange is in flight.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single exchange.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = oauth2::HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle for the next request.
	fn handle(&self) -> Self::Handle;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly, so [`ReqwestHttpClient::new`] disables redirect following.
/// A custom client passed to [`ReqwestHttpClient::with_client`] should do the same.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that never follows redirects.
	pub fn new() -> Result<Self, ConfigError> {
		Self::builder().build().map(Self).map_err(ConfigError::from)
	}

	/// Builds a client that never follows redirects and gives up after `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let timeout = std::time::Duration::try_from(timeout).map_err(|e| {
			ConfigError::HttpClientBuild { message: format!("Invalid timeout: {e}") }
		})?;

		Self::builder().timeout(timeout).build().map(Self).map_err(ConfigError::from)
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn builder() -> reqwest::ClientBuilder {
		ReqwestClient::builder().redirect(reqwest::redirect::Policy::none())
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// Per-request handle returned by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn reqwest_client_builds_with_timeout() {
		assert!(ReqwestHttpClient::new().is_ok());
		assert!(ReqwestHttpClient::with_timeout(Duration::seconds(10)).is_ok());
		assert!(matches!(
			ReqwestHttpClient::with_timeout(Duration::seconds(-1)),
			Err(ConfigError::HttpClientBuild { .. })
		));
	}
}
