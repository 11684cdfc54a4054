//! Signed JWT-bearer assertions (RFC 7523) proving the service account's identity.
//!
//! Each refresh attempt builds a fresh assertion: credentials are loaded from the
//! [`CredentialProvider`], `iat` is taken from the clock, `exp` is `iat + ttl`, and the claim set
//! is signed by an [`AssertionSigner`]. Assertions are single use and never cached.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	clock::{Clock, SystemClock},
	config::ClientConfig,
	credentials::{CredentialProvider, Credentials, SigningKey},
	error::SigningError,
	obs::{self, Operation, OperationSpan, Outcome},
};

/// Claim set carried by an assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer, the service-account email.
	pub iss: String,
	/// Audience, the token endpoint URL.
	pub aud: String,
	/// Expiry as Unix seconds.
	pub exp: i64,
	/// Issued-at as Unix seconds.
	pub iat: i64,
	/// Space-delimited scopes requested for the access token.
	pub scope: ScopeSet,
	/// User to impersonate through domain-wide delegation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
}

/// Signs a claim set with the supplied credentials.
pub trait AssertionSigner
where
	Self: Send + Sync,
{
	/// Produces the compact serialized assertion.
	fn sign(
		&self,
		claims: &AssertionClaims,
		credentials: &Credentials,
	) -> Result<String, SigningError>;
}

/// [`AssertionSigner`] backed by `jsonwebtoken`.
///
/// RSA keys sign with `rsa_algorithm` (RS256 unless overridden); HMAC secrets sign with
/// `hmac_algorithm` (HS256 unless overridden). The credential key id, when present, is copied
/// into the `kid` header.
#[derive(Clone, Copy, Debug)]
pub struct JwtSigner {
	/// Algorithm used with [`SigningKey::RsaPem`].
	pub rsa_algorithm: Algorithm,
	/// Algorithm used with [`SigningKey::Hmac`].
	pub hmac_algorithm: Algorithm,
}
impl JwtSigner {
	fn encoding_key(&self, key: &SigningKey) -> Result<(Algorithm, EncodingKey), SigningError> {
		match key {
			SigningKey::RsaPem(pem) => {
				let algorithm = self.rsa_algorithm;
				let key = EncodingKey::from_rsa_pem(pem.expose().as_bytes()).map_err(|e| {
					SigningError::InvalidKey { algorithm, source: Arc::new(e) }
				})?;

				Ok((algorithm, key))
			},
			SigningKey::Hmac(secret) => Ok((self.hmac_algorithm, EncodingKey::from_secret(secret))),
		}
	}
}
impl Default for JwtSigner {
	fn default() -> Self {
		Self { rsa_algorithm: Algorithm::RS256, hmac_algorithm: Algorithm::HS256 }
	}
}
impl AssertionSigner for JwtSigner {
	fn sign(
		&self,
		claims: &AssertionClaims,
		credentials: &Credentials,
	) -> Result<String, SigningError> {
		let (algorithm, key) = self.encoding_key(&credentials.signing_key)?;
		let mut header = Header::new(algorithm);

		header.kid = credentials.key_id.clone();

		jsonwebtoken::encode(&header, claims, &key).map_err(SigningError::encode)
	}
}

/// Signed, single-use assertion.
#[derive(Clone, Debug)]
pub struct Assertion {
	/// Compact serialized JWT.
	pub token: TokenSecret,
	/// Claims that were signed.
	pub claims: AssertionClaims,
}

/// Builds a fresh signed assertion for every refresh attempt.
#[derive(Clone)]
pub struct AssertionBuilder {
	credentials: Arc<dyn CredentialProvider>,
	signer: Arc<dyn AssertionSigner>,
	clock: Arc<dyn Clock>,
	audience: String,
	scope: ScopeSet,
	ttl: Duration,
	subject: Option<String>,
}
impl AssertionBuilder {
	/// Creates a builder using the scope, ttl, and token endpoint from `config`.
	pub fn new(
		credentials: Arc<dyn CredentialProvider>,
		signer: Arc<dyn AssertionSigner>,
		config: &ClientConfig,
	) -> Self {
		Self {
			credentials,
			signer,
			clock: Arc::new(SystemClock),
			audience: config.token_endpoint.to_string(),
			scope: config.scope.clone(),
			ttl: config.ttl,
			subject: None,
		}
	}

	/// Replaces the clock used for `iat`.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Impersonates `subject` through domain-wide delegation.
	pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = Some(subject.into());

		self
	}

	/// Loads credentials, stamps the claims with the current time, and signs them.
	pub async fn create_assertion(&self) -> Result<Assertion> {
		const OPERATION: Operation = Operation::Assertion;

		let span = OperationSpan::new(OPERATION, "create_assertion");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result: Result<Assertion> = span
			.instrument(async move {
				let iat = self.clock.now_unix();
				let credentials = self.credentials.credentials().await?;
				let claims = self.claims_for(&credentials, iat);
				let token = self.signer.sign(&claims, &credentials)?;

				Ok(Assertion { token: TokenSecret::new(token), claims })
			})
			.await;

		obs::record_result(OPERATION, &result);

		result
	}

	fn claims_for(&self, credentials: &Credentials, iat: i64) -> AssertionClaims {
		AssertionClaims {
			iss: credentials.issuer.clone(),
			aud: self.audience.clone(),
			exp: iat.saturating_add(self.ttl.whole_seconds()),
			iat,
			scope: self.scope.clone(),
			sub: self.subject.clone(),
		}
	}
}
impl Debug for AssertionBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AssertionBuilder")
			.field("audience", &self.audience)
			.field("scope", &self.scope)
			.field("ttl", &self.ttl)
			.field("subject", &self.subject)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use jsonwebtoken::{DecodingKey, Validation};
	// self
	use super::*;
	use crate::{
		clock::ManualClock,
		config::{CLOUD_PLATFORM_SCOPE, GOOGLE_TOKEN_URL},
		credentials::StaticCredentials,
	};

	const SECRET: &[u8] = b"assertion-test-secret";

	fn builder(at: i64) -> AssertionBuilder {
		let credentials = Credentials::new("svc@x.iam", SigningKey::hmac(SECRET.to_vec()))
			.with_key_id("kid-7");

		AssertionBuilder::new(
			Arc::new(StaticCredentials::new(credentials)),
			Arc::new(JwtSigner::default()),
			&ClientConfig::default(),
		)
		.with_clock(Arc::new(ManualClock::new(at)))
	}

	fn decode(token: &str) -> (Header, AssertionClaims) {
		let mut validation = Validation::new(Algorithm::HS256);

		validation.validate_exp = false;
		validation.set_audience(&[GOOGLE_TOKEN_URL]);

		let data = jsonwebtoken::decode::<AssertionClaims>(
			token,
			&DecodingKey::from_secret(SECRET),
			&validation,
		)
		.expect("Assertion should verify with the signing secret.");

		(data.header, data.claims)
	}

	#[tokio::test]
	async fn assertion_carries_google_claims() {
		let assertion = builder(1_000).create_assertion().await.expect("Assertion should sign.");
		let (header, claims) = decode(assertion.token.expose());

		assert_eq!(header.alg, Algorithm::HS256);
		assert_eq!(header.kid.as_deref(), Some("kid-7"));
		assert_eq!(claims, assertion.claims);
		assert_eq!(claims.iss, "svc@x.iam");
		assert_eq!(claims.aud, GOOGLE_TOKEN_URL);
		assert_eq!(claims.iat, 1_000);
		assert_eq!(claims.exp, 4_600);
		assert_eq!(claims.scope.normalized(), CLOUD_PLATFORM_SCOPE);
		assert_eq!(claims.sub, None);
	}

	#[tokio::test]
	async fn subject_is_only_serialized_when_set() {
		let assertion = builder(10)
			.with_subject("admin@example.com")
			.create_assertion()
			.await
			.expect("Assertion should sign.");
		let (_, claims) = decode(assertion.token.expose());

		assert_eq!(claims.sub.as_deref(), Some("admin@example.com"));

		let json = serde_json::to_value(&builder(10).claims_for(
			&Credentials::new("svc@x.iam", SigningKey::hmac(SECRET.to_vec())),
			10,
		))
		.expect("Claims should serialize.");

		assert!(json.get("sub").is_none());
		assert_eq!(json["scope"], CLOUD_PLATFORM_SCOPE);
	}

	#[tokio::test]
	async fn invalid_rsa_pem_is_a_signing_error() {
		let builder = AssertionBuilder::new(
			Arc::new(StaticCredentials::new(Credentials::new(
				"svc@x.iam",
				SigningKey::rsa_pem("not a pem"),
			))),
			Arc::new(JwtSigner::default()),
			&ClientConfig::default(),
		);
		let err = builder.create_assertion().await.expect_err("Garbage PEM must not sign.");

		assert!(matches!(
			err,
			Error::Signing(SigningError::InvalidKey { algorithm: Algorithm::RS256, .. })
		));
	}
}
