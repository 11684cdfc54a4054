//! Demonstrates plugging a non-reqwest HTTP client and mapper into the token cache.
//!
//! 1. Implement [`TokenHttpClient`] so each exchange gets an [`AsyncHttpClient`] handle.
//! 2. Provide a [`TransportErrorMapper`] that understands the transport's error type.
//! 3. Wrap both in a [`TokenExchanger`] and hand it to [`AuthClient::builder`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use color_eyre::Result;
// self
use google_token_cache::{
	AuthClient,
	config::ClientConfig,
	credentials::{Credentials, SigningKey, StaticCredentials},
	error::{Error, TransportError},
	exchange::{TokenExchanger, TransportErrorMapper, map_generic_transport_error},
	http::TokenHttpClient,
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let credentials = Arc::new(StaticCredentials::new(Credentials::new(
		"svc-demo@example.iam.gserviceaccount.com",
		SigningKey::hmac(b"demo-secret".to_vec()),
	)));
	let config = ClientConfig::default();
	let exchanger: TokenExchanger<MockHttpClient, MockTransportErrorMapper> =
		TokenExchanger::with_http_client(
			config.token_endpoint.clone(),
			MockHttpClient::success(),
			MockTransportErrorMapper,
		);
	let client =
		AuthClient::builder(config.clone(), credentials.clone()).build(Arc::new(exchanger))?;
	let header = client.authorization().await?;

	println!("Header issued through the mock transport: {header:?}.");

	let failing: TokenExchanger<MockHttpClient, MockTransportErrorMapper> =
		TokenExchanger::with_http_client(
			config.token_endpoint.clone(),
			MockHttpClient::transport_error(MockTransportError::DnsFailure {
				host: "www.googleapis.com",
			}),
			MockTransportErrorMapper,
		);
	let failing_client = AuthClient::builder(config, credentials).build(Arc::new(failing))?;

	match failing_client.authorization().await {
		Ok(_) => println!("Mock transport unexpectedly succeeded."),
		Err(e) => println!(
			"Transport error mapped by the exchanger: {e} (cache state: {}).",
			failing_client.cache().state()
		),
	}

	Ok(())
}

#[derive(Clone, Debug)]
enum MockTransportError {
	DnsFailure { host: &'static str },
}
impl Display for MockTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::DnsFailure { host } => write!(f, "DNS lookup failed for {host}"),
		}
	}
}
impl StdError for MockTransportError {}

#[derive(Clone)]
enum MockBehavior {
	Success,
	TransportError(MockTransportError),
}

#[derive(Clone)]
struct MockHttpClient {
	behavior: MockBehavior,
}
impl MockHttpClient {
	fn success() -> Self {
		Self { behavior: MockBehavior::Success }
	}

	fn transport_error(error: MockTransportError) -> Self {
		Self { behavior: MockBehavior::TransportError(error) }
	}
}
impl TokenHttpClient for MockHttpClient {
	type Handle = MockHttpHandle;
	type TransportError = MockTransportError;

	fn handle(&self) -> Self::Handle {
		MockHttpHandle { behavior: self.behavior.clone() }
	}
}

struct MockHttpHandle {
	behavior: MockBehavior,
}
impl<'a> AsyncHttpClient<'a> for MockHttpHandle {
	type Error = HttpClientError<MockTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let behavior = self.behavior.clone();

		Box::pin(async move {
			println!("Mock transport received {} {}.", request.method(), request.uri());

			match behavior {
				MockBehavior::Success => Ok(HttpResponse::new(
					b"{\"access_token\":\"mock-access\",\"token_type\":\"Bearer\",\"expires_in\":3600}"
						.to_vec(),
				)),
				// `HttpClientError::Reqwest` carries any boxed transport error despite its name.
				MockBehavior::TransportError(error) => Err(HttpClientError::Reqwest(Box::new(error))),
			}
		})
	}
}

struct MockTransportErrorMapper;
impl TransportErrorMapper<MockTransportError> for MockTransportErrorMapper {
	fn map_transport_error(&self, error: HttpClientError<MockTransportError>) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			other => map_generic_transport_error(other),
		}
	}
}
