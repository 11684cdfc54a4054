//! Request signing contracts that attach cached `Authorization` headers to outbound requests.

// crates.io
use oauth2::http::{HeaderValue, Request, header::AUTHORIZATION};
// self
use crate::{_prelude::*, auth::AuthHeader, error::ConfigError};

/// Describes how to attach an [`AuthHeader`] to an outbound request without constraining the
/// HTTP client type.
pub trait RequestSigner<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and returns it carrying `header`.
	fn attach_header(&self, request: Request, header: &AuthHeader) -> Result<Request, Error>;
}

/// Sets the standard `Authorization` header, replacing any existing value.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthorizationHeader;
impl<B> RequestSigner<Request<B>, Error> for AuthorizationHeader {
	fn attach_header(&self, mut request: Request<B>, header: &AuthHeader) -> Result<Request<B>> {
		request.headers_mut().insert(AUTHORIZATION, header_value(header)?);

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl RequestSigner<reqwest::RequestBuilder, Error> for AuthorizationHeader {
	fn attach_header(
		&self,
		request: reqwest::RequestBuilder,
		header: &AuthHeader,
	) -> Result<reqwest::RequestBuilder> {
		Ok(request.header(AUTHORIZATION, header_value(header)?))
	}
}

fn header_value(header: &AuthHeader) -> Result<HeaderValue> {
	let mut value = HeaderValue::from_str(header.expose()).map_err(|e| ConfigError::HttpRequest {
		message: format!("Authorization header is not a valid header value: {e}"),
	})?;

	value.set_sensitive(true);

	Ok(value)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::TokenSecret;

	#[test]
	fn http_requests_receive_sensitive_header() {
		let request = Request::builder()
			.uri("https://storage.googleapis.com/storage/v1/b")
			.header(AUTHORIZATION, "Basic old")
			.body(Vec::<u8>::new())
			.expect("Request fixture should build.");
		let header = AuthHeader::new("Bearer", &TokenSecret::new("abc"));
		let signed = AuthorizationHeader
			.attach_header(request, &header)
			.expect("Valid headers should attach.");
		let value = signed.headers().get(AUTHORIZATION).expect("Header should be present.");

		assert_eq!(value, "Bearer abc");
		assert!(value.is_sensitive());
		assert_eq!(signed.headers().get_all(AUTHORIZATION).iter().count(), 1);
	}

	#[test]
	fn control_characters_are_rejected() {
		let header = AuthHeader::new("Bearer", &TokenSecret::new("abc\ndef"));
		let err = AuthorizationHeader
			.attach_header(Request::new(()), &header)
			.expect_err("Newlines cannot be sent in headers.");

		assert!(matches!(err, Error::Config(ConfigError::HttpRequest { .. })));
	}
}
