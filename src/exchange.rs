//! Assertion-for-token exchange against the OAuth 2.0 token endpoint.
//!
//! [`TokenExchange`] is the seam between the cache and the network: the cache hands over one
//! signed [`Assertion`] and expects a [`TokenResponse`] or a typed [`Error`] back.
//! [`TokenExchanger`] is the HTTP implementation. It performs no caching and keeps no state; a
//! non-success status becomes [`Error::ExchangeRejected`] with the raw body, and transport
//! failures go through a [`TransportErrorMapper`].

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest,
	http::{
		Method,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	assertion::Assertion,
	auth::TokenSecret,
	error::{ConfigError, TransportError},
	http::TokenHttpClient,
	obs::{self, Operation, OperationSpan, Outcome},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Grant type identifying an RFC 7523 JWT-bearer exchange.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Boxed future returned by [`TokenExchange::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenResponse>> + 'a + Send>>;

/// Exchanges a signed assertion for an access token.
pub trait TokenExchange
where
	Self: Send + Sync,
{
	/// Sends `assertion` to the token endpoint once.
	fn exchange(&self, assertion: Assertion) -> ExchangeFuture<'_>;
}

/// Successful token endpoint payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
	/// Scheme to echo back in the `Authorization` header, usually `Bearer`.
	pub token_type: String,
	/// Access token.
	pub access_token: TokenSecret,
	/// Lifetime in seconds; a missing value counts as already expired.
	#[serde(default)]
	pub expires_in: i64,
}

#[derive(Serialize)]
struct JwtBearerRequest<'a> {
	grant_type: &'static str,
	assertion: &'a str,
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			other => map_generic_transport_error(other),
		}
	}
}

/// Maps the transport-agnostic [`HttpClientError`] variants; custom mappers can delegate here
/// after handling their own transport error.
pub fn map_generic_transport_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::from(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { message }.into(),
		other => TransportError::Other { message: other.to_string() }.into(),
	}
}

#[cfg(feature = "reqwest")]
/// Exchanger specialized for the crate's default reqwest transport stack.
pub type ReqwestExchanger = TokenExchanger<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// HTTP implementation of [`TokenExchange`].
pub struct TokenExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Endpoint receiving the JWT-bearer grant.
	pub token_endpoint: Url,
	/// HTTP client wrapper used for every exchange.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
}
impl<C, M> TokenExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an exchanger that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		token_endpoint: Url,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self { token_endpoint, http_client: http_client.into(), transport_mapper: mapper.into() }
	}

	/// Performs one exchange.
	pub async fn exchange_assertion(&self, assertion: &Assertion) -> Result<TokenResponse> {
		const OPERATION: Operation = Operation::Exchange;

		let span = OperationSpan::new(OPERATION, "exchange_assertion");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result: Result<TokenResponse> = span
			.instrument(async move {
				let request = self.build_request(assertion)?;
				let handle = self.http_client.handle();
				let response = handle
					.call(request)
					.await
					.map_err(|err| self.transport_mapper.map_transport_error(err))?;
				let status = response.status();

				if !status.is_success() {
					return Err(Error::ExchangeRejected {
						status: status.as_u16(),
						body: String::from_utf8_lossy(response.body()).into_owned(),
					});
				}

				parse_token_response(response.body(), status.as_u16())
			})
			.await;

		obs::record_result(OPERATION, &result);

		result
	}

	fn build_request(&self, assertion: &Assertion) -> Result<HttpRequest> {
		let body = serde_json::to_vec(&JwtBearerRequest {
			grant_type: JWT_BEARER_GRANT,
			assertion: assertion.token.expose(),
		})
		.map_err(|e| ConfigError::HttpRequest { message: e.to_string() })?;

		oauth2::http::Request::builder()
			.method(Method::POST)
			.uri(self.token_endpoint.as_str())
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.body(body)
			.map_err(|e| ConfigError::from(e).into())
	}
}
#[cfg(feature = "reqwest")]
impl TokenExchanger<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an exchanger backed by a fresh reqwest transport.
	pub fn new(token_endpoint: Url) -> Result<Self> {
		Ok(Self::with_http_client(
			token_endpoint,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> TokenExchange for TokenExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange(&self, assertion: Assertion) -> ExchangeFuture<'_> {
		Box::pin(async move { self.exchange_assertion(&assertion).await })
	}
}
impl<C, M> Debug for TokenExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchanger").field("token_endpoint", &self.token_endpoint).finish()
	}
}

fn parse_token_response(body: &[u8], status: u16) -> Result<TokenResponse> {
	let de = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(de)
		.map_err(|source| Error::MalformedResponse { source: Arc::new(source), status })
}
