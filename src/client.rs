//! Wiring that turns a [`ClientConfig`] and a credential supplier into a ready cache.
//!
//! [`create_client`] is the one-call entry point for the reqwest stack. [`AuthClientBuilder`]
//! exposes the individual seams (signer, clock, exchange) for custom transports and tests.

// self
use crate::{
	_prelude::*,
	assertion::{AssertionBuilder, AssertionSigner, JwtSigner},
	auth::AuthHeader,
	cache::{Spawner, TokenCache},
	clock::{Clock, SystemClock},
	config::ClientConfig,
	credentials::CredentialProvider,
	exchange::TokenExchange,
	ext::RequestSigner,
};
#[cfg(feature = "reqwest")] use crate::exchange::ReqwestExchanger;

/// Builds an [`AuthClient`] on the default reqwest transport and `jsonwebtoken` signer.
#[cfg(feature = "reqwest")]
pub fn create_client(
	config: ClientConfig,
	credentials: Arc<dyn CredentialProvider>,
) -> Result<AuthClient> {
	AuthClient::builder(config, credentials).build_reqwest()
}

/// Token cache bound to one credential/scope pair, plus helpers for authorizing requests.
#[derive(Clone, Debug)]
pub struct AuthClient {
	cache: TokenCache,
	config: ClientConfig,
}
impl AuthClient {
	/// Starts a builder for `config` and `credentials`.
	pub fn builder(
		config: ClientConfig,
		credentials: Arc<dyn CredentialProvider>,
	) -> AuthClientBuilder {
		AuthClientBuilder {
			config,
			credentials,
			signer: Arc::new(JwtSigner::default()),
			clock: Arc::new(SystemClock),
			subject: None,
			spawner: None,
		}
	}

	/// Returns the current `Authorization` header value.
	pub async fn authorization(&self) -> Result<AuthHeader> {
		self.cache.refresh().await
	}

	/// Attaches the current header to `request` through `signer`.
	pub async fn authorize<R, E, S>(&self, request: R, signer: &S) -> Result<R, E>
	where
		S: ?Sized + RequestSigner<R, E>,
		E: From<Error>,
	{
		let header = self.authorization().await?;

		signer.attach_header(request, &header)
	}

	/// Underlying cache.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}
}

/// Builder for [`AuthClient`].
pub struct AuthClientBuilder {
	config: ClientConfig,
	credentials: Arc<dyn CredentialProvider>,
	signer: Arc<dyn AssertionSigner>,
	clock: Arc<dyn Clock>,
	subject: Option<String>,
	spawner: Option<Spawner>,
}
impl AuthClientBuilder {
	/// Replaces the assertion signer.
	pub fn signer(mut self, signer: Arc<dyn AssertionSigner>) -> Self {
		self.signer = signer;

		self
	}

	/// Replaces the clock used for assertions and expiry bookkeeping.
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Impersonates `subject` through domain-wide delegation.
	pub fn subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = Some(subject.into());

		self
	}

	/// Drives started refreshes on `spawner` instead of the default runtime hook.
	pub fn spawner(mut self, spawner: Spawner) -> Self {
		self.spawner = Some(spawner);

		self
	}

	/// Validates the configuration and wires the cache around `exchange`.
	pub fn build(self, exchange: Arc<dyn TokenExchange>) -> Result<AuthClient> {
		self.config.validate()?;

		let mut assertions = AssertionBuilder::new(self.credentials, self.signer, &self.config)
			.with_clock(self.clock.clone());

		if let Some(subject) = self.subject {
			assertions = assertions.with_subject(subject);
		}

		let mut cache = TokenCache::new(assertions, exchange, self.config.renew_margin)
			.with_clock(self.clock);

		if let Some(spawner) = self.spawner {
			cache = cache.with_spawner(spawner);
		}

		Ok(AuthClient { cache, config: self.config })
	}

	/// Validates the configuration and wires the cache around the default reqwest exchanger.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest(self) -> Result<AuthClient> {
		let exchanger = ReqwestExchanger::new(self.config.token_endpoint.clone())?;

		self.build(Arc::new(exchanger))
	}
}
impl Debug for AuthClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClientBuilder")
			.field("config", &self.config)
			.field("subject", &self.subject)
			.finish_non_exhaustive()
	}
}
