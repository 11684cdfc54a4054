//! Single-flight bearer token cache for Google service accounts.
//!
//! Signs JWT-bearer assertions, exchanges them once per expiry window, and hands every concurrent
//! caller the same `Authorization` header.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod assertion;
pub mod auth;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod ext;
pub mod http;
pub mod obs;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use client::AuthClient;
#[cfg(feature = "reqwest")] pub use client::create_client;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use oauth2;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _};
