//! Tuya cloud integration module
//!
//! - `signer`: HMAC-SHA256 request signatures
//! - `client`: Signed HTTP requests against the cloud API
//! - `credentials`: Access-token lifecycle (grant, blind renewal, retry)
//! - `models`: Response envelopes and status projection

pub mod client;
pub mod credentials;
pub mod models;
pub mod signer;

pub use client::TuyaClient;
pub use credentials::{CredentialManager, Credentials};
