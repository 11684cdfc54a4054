//! Materialized `Authorization` header values handed out by the cache.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// `"<token_type> <access_token>"` value ready to be sent as an `Authorization` header.
///
/// Cloning is cheap; every caller joining the same refresh receives a clone of one value.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader(Arc<TokenSecret>);
impl AuthHeader {
	/// Joins the token type and access token the way token endpoints expect them echoed back.
	pub fn new(token_type: &str, access_token: &TokenSecret) -> Self {
		Self(Arc::new(TokenSecret::new(format!("{token_type} {}", access_token.expose()))))
	}

	/// Returns the full header value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Returns the scheme half of the header (`Bearer` for Google).
	pub fn token_type(&self) -> &str {
		self.expose().split_once(' ').map_or(self.expose(), |(scheme, _)| scheme)
	}
}
impl Debug for AuthHeader {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AuthHeader").field(&format_args!("{} <redacted>", self.token_type())).finish()
	}
}

/// Header plus the instant (Unix seconds) after which the cache stops handing it out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedAuth {
	/// Header returned to callers.
	pub header: AuthHeader,
	/// Unix second at which the header was cached.
	pub issued_at: i64,
	/// Unix second from which a new exchange is required: reported expiry minus the renewal
	/// margin.
	pub expires_at: i64,
}
impl CachedAuth {
	/// Returns true while `now` lies inside `[issued_at, expires_at)`.
	pub fn is_fresh_at(&self, now: i64) -> bool {
		now < self.expires_at
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn header_joins_type_and_token() {
		let header = AuthHeader::new("Bearer", &TokenSecret::new("abc"));

		assert_eq!(header.expose(), "Bearer abc");
		assert_eq!(header.token_type(), "Bearer");
		assert_eq!(format!("{header:?}"), "AuthHeader(Bearer <redacted>)");
	}

	#[test]
	fn cached_auth_window_is_half_open() {
		let auth = CachedAuth {
			header: AuthHeader::new("Bearer", &TokenSecret::new("abc")),
			issued_at: 1_000,
			expires_at: 4_300,
		};

		assert!(auth.is_fresh_at(4_299));
		assert!(!auth.is_fresh_at(4_300));
	}
}
