//! Data Transfer Objects for API requests and responses.

pub mod archive;
pub mod health;
