//! Archive record entity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Record collections served under `/api/{collection}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    News,
    Minutes,
    Segments,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Minutes => "minutes",
            Self::Segments => "segments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "news" => Ok(Self::News),
            "minutes" => Ok(Self::Minutes),
            "segments" => Ok(Self::Segments),
            other => Err(format!("Unknown collection '{}'", other)),
        }
    }
}

/// A stored record. The payload is kept as submitted.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveRecord {
    pub id: u64,
    pub collection: Collection,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArchiveRecord {
    /// Natural key used for upserts: the `url` field, else `id`.
    ///
    /// Records without either are always inserted.
    pub fn natural_key(data: &Value) -> Option<String> {
        ["url", "id"].iter().find_map(|field| match data.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}

/// Result of a batch upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
}
