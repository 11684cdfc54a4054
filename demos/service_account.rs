//! Authorizes a Google Cloud Storage request with a service-account key file.
//!
//! Point `GOOGLE_APPLICATION_CREDENTIALS` at a JSON key and pass a bucket name:
//!
//! ```sh
//! GOOGLE_APPLICATION_CREDENTIALS=key.json cargo run --example service_account -- my-bucket
//! ```

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use google_token_cache::{
	auth::ScopeSet, config::ClientConfig, create_client, credentials::KeyFileCredentials,
	ext::AuthorizationHeader, reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let bucket = std::env::args().nth(1).ok_or_else(|| eyre!("Usage: service_account <bucket>"))?;
	let credentials = Arc::new(KeyFileCredentials::from_env()?);
	let config = ClientConfig::default()
		.with_scope(ScopeSet::new(["https://www.googleapis.com/auth/devstorage.read_only"])?);
	let client = create_client(config, credentials)?;
	let http = Client::new();
	let request = http.get(format!("https://storage.googleapis.com/storage/v1/b/{bucket}/o"));
	let response = client.authorize(request, &AuthorizationHeader).await?.send().await?;

	println!("Listing objects returned HTTP {}.", response.status());

	// A second call within the validity window reuses the cached header.
	let header = client.authorization().await?;
	let metrics = client.cache().metrics();

	println!(
		"Header scheme {}, {} exchange(s), {} cache hit(s).",
		header.token_type(),
		metrics.exchanges(),
		metrics.hits()
	);

	Ok(())
}
