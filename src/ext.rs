//! Extension contracts for handing cached headers to arbitrary HTTP clients.

pub mod request_signer;

pub use request_signer::*;
