//! Construction-time configuration for assertions, exchanges, and cache renewal.

// std
use std::net::IpAddr;
// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError};

/// Google's OAuth 2.0 token endpoint accepting JWT-bearer assertions.
pub const GOOGLE_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";
/// Scope granting access to every Google Cloud API the account is authorized for.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Settings fixed when a client is created.
///
/// Every field has a default matching Google's service-account flow; the `with_*` setters
/// override them. Call [`ClientConfig::validate`] (done by [`crate::create_client`]) before use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Scopes requested by each assertion.
	pub scope: ScopeSet,
	/// Lifetime of each signed assertion (`exp - iat`).
	pub ttl: Duration,
	/// How long before the reported expiry a cached token stops being handed out.
	pub renew_margin: Duration,
	/// Token endpoint, also used as the assertion audience.
	pub token_endpoint: Url,
}
impl ClientConfig {
	/// Default assertion lifetime.
	pub const DEFAULT_TTL: Duration = Duration::hours(1);
	/// Default renewal margin.
	pub const DEFAULT_RENEW_MARGIN: Duration = Duration::minutes(5);

	/// Overrides the requested scopes.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Overrides the assertion lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Overrides the renewal margin.
	pub fn with_renew_margin(mut self, renew_margin: Duration) -> Self {
		self.renew_margin = renew_margin;

		self
	}

	/// Overrides the token endpoint (and with it the assertion audience).
	pub fn with_token_endpoint(mut self, token_endpoint: Url) -> Self {
		self.token_endpoint = token_endpoint;

		self
	}

	/// Checks the invariants the cache and assertion builder rely on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let ttl = self.ttl.whole_seconds();
		let renew = self.renew_margin.whole_seconds();

		if ttl <= 0 {
			return Err(ConfigError::NonPositiveTtl { seconds: ttl });
		}
		if renew < 0 {
			return Err(ConfigError::NegativeRenewMargin { seconds: renew });
		}
		if self.scope.is_empty() {
			return Err(ConfigError::EmptyScope);
		}

		validate_endpoint(&self.token_endpoint)
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			scope: ScopeSet::new([CLOUD_PLATFORM_SCOPE]).unwrap_or_default(),
			ttl: Self::DEFAULT_TTL,
			renew_margin: Self::DEFAULT_RENEW_MARGIN,
			token_endpoint: google_token_url(),
		}
	}
}

/// Parsed form of [`GOOGLE_TOKEN_URL`].
pub fn google_token_url() -> Url {
	Url::parse(GOOGLE_TOKEN_URL).unwrap_or_else(|_| unreachable!("constant URL parses"))
}

fn validate_endpoint(url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ConfigError::InsecureEndpoint { url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.map(|ip| ip.is_loopback())
			.unwrap_or(false),
		None => false,
	}
}
