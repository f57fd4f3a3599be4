//! Core domain entities.
//!
//! - [`ResolvedClient`] - per-request client identity used for rate limiting
//! - [`Principal`] / [`TokenClaims`] - credentials a request was admitted with
//! - [`ArchiveRecord`] - a stored civic record

pub mod client_identity;
pub mod principal;
pub mod record;

pub use client_identity::{ClientProvenance, ResolvedClient};
pub use principal::{Principal, TokenClaims};
pub use record::{ArchiveRecord, Collection, UpsertOutcome};
