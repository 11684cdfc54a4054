//! Shared helpers for integration tests.

#![allow(dead_code)]

// std
use std::{path::PathBuf, sync::Arc};
// crates.io
use httpmock::MockServer;
// self
use google_token_cache::{
	AuthClient,
	clock::ManualClock,
	config::ClientConfig,
	credentials::{CredentialProvider, Credentials, SigningKey, StaticCredentials},
	exchange::{ReqwestExchanger, ReqwestTransportErrorMapper},
	http::ReqwestHttpClient,
	reqwest::Client as ReqwestClient,
	url::Url,
};

pub const CLIENT_EMAIL: &str = "svc-cache@demo-project.iam.gserviceaccount.com";
pub const HMAC_SECRET: &[u8] = b"integration-secret";

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(google_token_cache::reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

pub fn token_endpoint(server: &MockServer) -> Url {
	Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully.")
}

pub fn test_exchanger(server: &MockServer) -> ReqwestExchanger {
	ReqwestExchanger::with_http_client(
		token_endpoint(server),
		test_reqwest_http_client(),
		Arc::new(ReqwestTransportErrorMapper),
	)
}

/// HMAC credentials keep tests independent of RSA key material.
pub fn hmac_credentials() -> Arc<dyn CredentialProvider> {
	Arc::new(StaticCredentials::new(Credentials::new(
		CLIENT_EMAIL,
		SigningKey::hmac(HMAC_SECRET.to_vec()),
	)))
}

/// Builds a client whose token endpoint is the mock server and whose time is driven manually.
pub fn build_reqwest_test_client(
	server: &MockServer,
	credentials: Arc<dyn CredentialProvider>,
	start: i64,
) -> (AuthClient, ManualClock) {
	let clock = ManualClock::new(start);
	let config = ClientConfig::default().with_token_endpoint(token_endpoint(server));
	let client = AuthClient::builder(config, credentials)
		.clock(Arc::new(clock.clone()))
		.build(Arc::new(test_exchanger(server)))
		.expect("Test client should build successfully.");

	(client, clock)
}

pub fn fixture_path(name: &str) -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}
