//! Auth-domain values: scope sets, redacted secrets, and cached authorization headers.

pub mod header;
pub mod scope;
pub mod secret;

pub use header::*;
pub use scope::*;
pub use secret::*;
