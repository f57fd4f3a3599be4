//! Repository trait definitions for the domain layer.
//!
//! Implementations live in `crate::infrastructure::persistence`; mocks are
//! generated with `mockall` for tests.

pub mod archive_repository;

pub use archive_repository::ArchiveRepository;

#[cfg(test)]
pub use archive_repository::MockArchiveRepository;
