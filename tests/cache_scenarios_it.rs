mod common;

// crates.io
use httpmock::prelude::*;
// self
use common::*;
use google_token_cache::{auth::AuthHeader, cache::CacheState, error::Error};

fn token_body(access_token: &str, expires_in: i64) -> String {
	format!("{{\"access_token\":\"{access_token}\",\"token_type\":\"Bearer\",\"expires_in\":{expires_in}}}")
}

#[tokio::test]
async fn header_is_cached_until_renewal_margin_then_refreshed() {
	let server = MockServer::start_async().await;
	let (client, clock) = build_reqwest_test_client(&server, hmac_credentials(), 1_000);
	let mut first_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(token_body("abc", 3_600));
		})
		.await;
	let header = client.authorization().await.expect("Initial refresh should succeed.");

	assert_eq!(header.expose(), "Bearer abc");
	assert_eq!(client.cache().cached().map(|auth| auth.expires_at), Some(4_300));
	assert_eq!(client.cache().state(), CacheState::Fresh);

	clock.set(4_200);

	let header = client.authorization().await.expect("Cached header should be returned.");

	assert_eq!(header.expose(), "Bearer abc");

	first_mock.assert_calls_async(1).await;
	first_mock.delete_async().await;

	let second_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(token_body("def", 3_600));
		})
		.await;

	clock.set(4_301);

	let header = client.authorization().await.expect("Expired header should be refreshed.");

	assert_eq!(header.expose(), "Bearer def");
	assert_eq!(client.cache().cached().map(|auth| auth.expires_at), Some(7_601));

	second_mock.assert_calls_async(1).await;

	let metrics = client.cache().metrics();

	assert_eq!(metrics.exchanges(), 2);
	assert_eq!(metrics.hits(), 1);
	assert_eq!(metrics.successes(), 2);
}

#[tokio::test]
async fn rejected_exchange_enters_backoff_and_next_call_retries() {
	let server = MockServer::start_async().await;
	let (client, _clock) = build_reqwest_test_client(&server, hmac_credentials(), 1_000);
	let mut rejecting = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let err = client.authorization().await.expect_err("HTTP 400 should fail the refresh.");

	assert!(matches!(
		&err,
		Error::ExchangeRejected { status: 400, body } if body == "{\"error\":\"invalid_grant\"}"
	));
	assert_eq!(client.cache().state(), CacheState::Backoff);
	assert!(client.cache().last_error().is_some());

	client.authorization().await.expect_err("The retry should reach the endpoint again.");

	rejecting.assert_calls_async(2).await;
	rejecting.delete_async().await;

	let accepting = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(token_body("ok", 3_600));
		})
		.await;
	let header = client.authorization().await.expect("A later success should replace the failure.");

	assert_eq!(header.expose(), "Bearer ok");
	assert_eq!(client.cache().state(), CacheState::Fresh);
	assert!(client.cache().last_error().is_none());

	accepting.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_trigger_one_exchange() {
	let server = MockServer::start_async().await;
	let (client, _clock) = build_reqwest_test_client(&server, hmac_credentials(), 1_000);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body(token_body("shared", 3_600));
		})
		.await;
	let (first, second, third, fourth): (
		Result<AuthHeader, Error>,
		Result<AuthHeader, Error>,
		Result<AuthHeader, Error>,
		Result<AuthHeader, Error>,
	) = tokio::join!(
		client.authorization(),
		client.authorization(),
		client.authorization(),
		client.authorization(),
	);

	for result in [first, second, third, fourth] {
		assert_eq!(
			result.expect("Every concurrent caller should succeed.").expose(),
			"Bearer shared"
		);
	}

	mock.assert_calls_async(1).await;

	assert_eq!(client.cache().metrics().exchanges(), 1);
	assert_eq!(client.cache().metrics().joins(), 3);
}

#[tokio::test]
async fn concurrent_callers_share_one_failure() {
	let server = MockServer::start_async().await;
	let (client, _clock) = build_reqwest_test_client(&server, hmac_credentials(), 1_000);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(503).delay(std::time::Duration::from_millis(100)).body("unavailable");
		})
		.await;
	let (first, second) = tokio::join!(client.authorization(), client.authorization());

	for result in [first, second] {
		assert!(matches!(
			result,
			Err(Error::ExchangeRejected { status: 503, ref body }) if body == "unavailable"
		));
	}

	mock.assert_calls_async(1).await;
}
