//! Core types and trait definitions for the campus enrollment backend.
//!
//! This crate is deliberately free of database and token-format
//! dependencies. Storage backends implement [`store::DocumentStore`],
//! identity providers implement [`identity::IdentityVerifier`], and the
//! engine crate drives both.

pub mod course;
pub mod enrollment;
pub mod error;
pub mod identity;
pub mod lenient;
pub mod principal;
pub mod store;
pub mod user;
pub mod workflow;

pub use error::{Entity, Error, Result};
