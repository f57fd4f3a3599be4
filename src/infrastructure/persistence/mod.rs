//! Archive storage implementations.
//!
//! The SQL data layer is a separate collaborator; this crate ships the
//! in-process [`MemoryArchiveRepository`].

pub mod memory_archive_repository;

pub use memory_archive_repository::MemoryArchiveRepository;
