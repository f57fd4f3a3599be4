//! DTOs for the archive collection endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{ArchiveRecord, UpsertOutcome};

pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Query parameters for `GET /api/{collection}`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListQuery {
    #[validate(range(min = 1, max = 500, message = "limit must be between 1 and 500"))]
    pub limit: Option<usize>,

    pub offset: Option<usize>,
}

impl ListQuery {
    /// `(limit, offset)` with defaults applied.
    pub fn limit_offset(&self) -> (usize, usize) {
        (
            self.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            self.offset.unwrap_or(0),
        )
    }
}

/// One page of records.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<ArchiveRecord>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Upsert counts for `POST /api/{collection}`.
#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub inserted: usize,
    pub updated: usize,
}

impl From<UpsertOutcome> for UpsertResponse {
    fn from(outcome: UpsertOutcome) -> Self {
        Self {
            inserted: outcome.inserted,
            updated: outcome.updated,
        }
    }
}
