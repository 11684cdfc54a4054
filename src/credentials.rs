//! Credential suppliers feeding the assertion builder.
//!
//! A [`CredentialProvider`] is consulted on every refresh attempt, so key rotation on disk is
//! picked up without rebuilding the cache. Providers may perform I/O; the assertion builder
//! awaits them and propagates their failures untouched.

// std
use std::path::{Path, PathBuf};
// self
use crate::{_prelude::*, auth::TokenSecret, error::CredentialError};

/// Environment variable Google tooling uses to locate a service-account key file.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Boxed future returned by [`CredentialProvider::credentials`].
pub type CredentialFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Credentials, CredentialError>> + 'a + Send>>;

/// Supplies the identity and key used to sign each assertion.
pub trait CredentialProvider
where
	Self: Send + Sync,
{
	/// Loads the current credentials.
	fn credentials(&self) -> CredentialFuture<'_>;
}

/// Key material handed to the signer.
#[derive(Clone, PartialEq, Eq)]
pub enum SigningKey {
	/// PEM-encoded RSA private key (PKCS#1 or PKCS#8), as found in service-account key files.
	RsaPem(TokenSecret),
	/// Shared secret for HMAC-signed assertions accepted by some non-Google JWT-bearer
	/// endpoints.
	Hmac(Arc<[u8]>),
}
impl SigningKey {
	/// Wraps a PEM-encoded RSA private key.
	pub fn rsa_pem(pem: impl Into<String>) -> Self {
		Self::RsaPem(TokenSecret::new(pem))
	}

	/// Wraps an HMAC secret.
	pub fn hmac(secret: impl Into<Vec<u8>>) -> Self {
		Self::Hmac(Arc::from(secret.into()))
	}
}
impl Debug for SigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::RsaPem(_) => f.write_str("SigningKey::RsaPem(<redacted>)"),
			Self::Hmac(_) => f.write_str("SigningKey::Hmac(<redacted>)"),
		}
	}
}

/// Identity material: who the assertion is issued by and what signs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
	/// Value of the `iss` claim, usually the service-account email.
	pub issuer: String,
	/// Key used to sign the assertion.
	pub signing_key: SigningKey,
	/// Optional key identifier placed in the JWT `kid` header.
	pub key_id: Option<String>,
}
impl Credentials {
	/// Creates credentials without a key identifier.
	pub fn new(issuer: impl Into<String>, signing_key: SigningKey) -> Self {
		Self { issuer: issuer.into(), signing_key, key_id: None }
	}

	/// Attaches a key identifier.
	pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
		self.key_id = Some(key_id.into());

		self
	}
}

/// Provider returning the same in-memory credentials every time.
#[derive(Clone, Debug)]
pub struct StaticCredentials(Credentials);
impl StaticCredentials {
	/// Wraps fixed credentials.
	pub fn new(credentials: Credentials) -> Self {
		Self(credentials)
	}
}
impl CredentialProvider for StaticCredentials {
	fn credentials(&self) -> CredentialFuture<'_> {
		Box::pin(async move { Ok(self.0.clone()) })
	}
}

/// Subset of a Google service-account JSON key the assertion flow needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
	/// Key kind; must be `service_account`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Service-account email used as the issuer.
	pub client_email: String,
	/// PEM-encoded private key.
	pub private_key: TokenSecret,
	/// Identifier of the private key, forwarded as `kid`.
	#[serde(default)]
	pub private_key_id: Option<String>,
}
impl ServiceAccountKey {
	/// Parses a key from JSON bytes; `origin` names the source in error messages.
	pub fn from_slice(bytes: &[u8], origin: &str) -> Result<Self, CredentialError> {
		let de = &mut serde_json::Deserializer::from_slice(bytes);
		let key: Self = serde_path_to_error::deserialize(de).map_err(|e| {
			CredentialError::Parse { origin: origin.to_owned(), source: Arc::new(e) }
		})?;

		if key.kind != "service_account" {
			return Err(CredentialError::UnsupportedKind { kind: key.kind });
		}

		Ok(key)
	}

	/// Reads and parses a key file.
	pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
		let bytes = std::fs::read(path).map_err(|e| CredentialError::Read {
			path: path.display().to_string(),
			source: Arc::new(e),
		})?;

		Self::from_slice(&bytes, &path.display().to_string())
	}

	/// Converts the key into signer-ready credentials.
	pub fn into_credentials(self) -> Credentials {
		Credentials {
			issuer: self.client_email,
			signing_key: SigningKey::RsaPem(self.private_key),
			key_id: self.private_key_id,
		}
	}
}
impl Debug for ServiceAccountKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountKey")
			.field("kind", &self.kind)
			.field("client_email", &self.client_email)
			.field("private_key_id", &self.private_key_id)
			.finish()
	}
}

/// Provider that re-reads a service-account key file on every refresh.
#[derive(Clone, Debug)]
pub struct KeyFileCredentials {
	path: PathBuf,
}
impl KeyFileCredentials {
	/// Reads credentials from `path`.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Reads credentials from the file named by `GOOGLE_APPLICATION_CREDENTIALS`.
	pub fn from_env() -> Result<Self, CredentialError> {
		std::env::var_os(CREDENTIALS_ENV)
			.filter(|value| !value.is_empty())
			.map(Self::new)
			.ok_or(CredentialError::MissingEnv { name: CREDENTIALS_ENV })
	}

	/// Path the provider reads from.
	pub fn path(&self) -> &Path {
		&self.path
	}
}
impl CredentialProvider for KeyFileCredentials {
	fn credentials(&self) -> CredentialFuture<'_> {
		Box::pin(async move {
			ServiceAccountKey::from_file(&self.path).map(ServiceAccountKey::into_credentials)
		})
	}
}
