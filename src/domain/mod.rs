//! Domain layer: entities and repository contracts.
//!
//! - [`entities`] - client identity, verified principal, archive records
//! - [`repositories`] - storage trait consumed by the archive handlers
//!
//! The domain layer has no dependencies on infrastructure or HTTP concerns.

pub mod entities;
pub mod repositories;
