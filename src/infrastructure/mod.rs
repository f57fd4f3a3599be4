//! Infrastructure layer for external integrations.
//!
//! This layer implements ports defined elsewhere in the crate, providing
//! concrete counter stores and record storage.
//!
//! # Modules
//!
//! - [`rate_limit`] - Rate limit counter backends (in-process and Redis)
//! - [`persistence`] - In-memory archive repository

pub mod persistence;
pub mod rate_limit;
