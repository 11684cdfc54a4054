//! Crate-level error types shared across credentials, assertions, exchanges, and the cache.
//!
//! Every error is [`Clone`] so a single refresh failure can be handed to each caller that was
//! waiting on the same in-flight exchange. Foreign sources are therefore kept behind [`Arc`].

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential supplier failed.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// Assertion construction failed.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Transport failure (DNS, TCP, TLS) surfaced by the HTTP client.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint rejected the assertion with HTTP {status}: {body}")]
	ExchangeRejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Raw response body, kept verbatim for diagnostics.
		body: String,
	},
	/// Token endpoint answered 2xx with a body that is not a token response.
	#[error("Token endpoint returned a malformed response.")]
	MalformedResponse {
		/// Path-aware parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code of the response.
		status: u16,
	},
}
impl Error {
	/// Returns true when the failure came from the token endpoint or the network rather than
	/// from local credentials, signing, or configuration.
	pub fn is_remote(&self) -> bool {
		matches!(
			self,
			Self::ExchangeRejected { .. } | Self::MalformedResponse { .. } | Self::Transport(_)
		)
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// Assertion lifetime must be positive.
	#[error("Assertion ttl must be positive, got {seconds}s.")]
	NonPositiveTtl {
		/// Offending ttl in seconds.
		seconds: i64,
	},
	/// Renewal margin is subtracted from the reported token lifetime and cannot be negative.
	#[error("Renewal margin must not be negative, got {seconds}s.")]
	NegativeRenewMargin {
		/// Offending margin in seconds.
		seconds: i64,
	},
	/// Token endpoints must use HTTPS unless they point at a loopback host.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// At least one scope must be requested.
	#[error("At least one scope must be requested.")]
	EmptyScope,
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// HTTP request construction failed.
	#[error("Token request could not be built: {message}")]
	HttpRequest {
		/// Rendered `http` builder failure.
		message: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed: {message}")]
	HttpClientBuild {
		/// Rendered builder failure.
		message: String,
	},
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest { message: e.to_string() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::HttpClientBuild { message: e.to_string() }
	}
}

/// Credential supplier failures.
#[derive(Clone, Debug, ThisError)]
pub enum CredentialError {
	/// Environment variable pointing at a key file is not set.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Key file could not be read.
	#[error("Failed to read credentials from {path}.")]
	Read {
		/// Path that failed to load.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: Arc<std::io::Error>,
	},
	/// Key file is not valid service-account JSON.
	#[error("Credentials at {origin} are malformed.")]
	Parse {
		/// Where the JSON came from (a path or `<inline>`).
		origin: String,
		/// Path-aware parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// Key file describes something other than a service account.
	#[error("Expected a `service_account` key, found `{kind}`.")]
	UnsupportedKind {
		/// The `type` field found in the key file.
		kind: String,
	},
	/// Custom supplier failure.
	#[error("Credential provider failed.")]
	Provider {
		/// Provider-specific failure.
		#[source]
		source: SharedError,
	},
}
impl CredentialError {
	/// Wraps a custom provider failure inside [`CredentialError`].
	pub fn provider(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Provider { source: Arc::new(src) }
	}
}

/// Assertion signing failures.
#[derive(Clone, Debug, ThisError)]
pub enum SigningError {
	/// Key material could not be loaded for the chosen algorithm.
	#[error("Signing key is invalid for {algorithm:?}.")]
	InvalidKey {
		/// Algorithm the key was loaded for.
		algorithm: jsonwebtoken::Algorithm,
		/// Underlying key parsing failure.
		#[source]
		source: Arc<jsonwebtoken::errors::Error>,
	},
	/// Claims could not be encoded or signed.
	#[error("Assertion could not be encoded.")]
	Encode {
		/// Underlying encoding failure.
		#[source]
		source: SharedError,
	},
}
impl SigningError {
	/// Wraps an encoding or signing failure inside [`SigningError`].
	pub fn encode(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Encode { source: Arc::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Request timed out before the token endpoint answered.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[source] Arc<std::io::Error>),
	/// Transport failed without a structured error.
	#[error("HTTP client error occurred while calling the token endpoint: {message}")]
	Other {
		/// Transport-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Wraps a transport-specific timeout.
	pub fn timeout(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Timeout { source: Arc::new(src) }
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exchange_rejected_keeps_raw_body() {
		let err = Error::ExchangeRejected { status: 400, body: "{\"error\":\"invalid_grant\"}".into() };

		assert_eq!(
			err.to_string(),
			"Token endpoint rejected the assertion with HTTP 400: {\"error\":\"invalid_grant\"}"
		);
		assert!(err.is_remote());
	}

	#[test]
	fn cloned_errors_share_sources() {
		let err = Error::from(TransportError::from(std::io::Error::other("reset")));
		let cloned = err.clone();

		assert_eq!(err.to_string(), cloned.to_string());
		assert!(cloned.source().is_some(), "IO source should survive cloning.");
		assert!(!Error::from(ConfigError::EmptyScope).is_remote());
	}
}
