use super::error::{Result, StoreError};
use super::region::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored content record.
///
/// Ids are assigned by the master on insert and are never reused; the only
/// mutation after creation is deletion. Replicas receive full-row copies of
/// this type, keyed by id with overwrite semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub author: String,
    /// Region the write originated from (always the master's region).
    pub region: Region,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a record on the master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    pub title: String,
    pub summary: String,
    pub body: String,
    pub author: String,
}

impl NewRecord {
    /// Reject malformed input before it reaches the master store.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Constraint("title must not be empty".into()));
        }
        if self.author.trim().is_empty() {
            return Err(StoreError::Constraint("author must not be empty".into()));
        }
        Ok(())
    }
}
