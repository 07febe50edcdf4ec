//! A token-based identity provider.
//!
//! [`TokenIdentity`] mints and validates HS256 bearer tokens. Per-subject
//! attributes live server-side in the `identities` collection of any
//! [`DocumentStore`](campus_core::store::DocumentStore) and are copied into
//! each token at issue time, so a token only reflects the attributes that
//! were current when it was minted.

mod claims;
mod config;
mod provider;

pub mod error;

pub use claims::TokenClaims;
pub use config::TokenConfig;
pub use error::{Error, Result};
pub use provider::TokenIdentity;

#[cfg(test)]
mod tests;
