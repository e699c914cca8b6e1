use crate::constants;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// A message row as held by the relational store.
///
/// `synced` is true iff `git_commit_hash` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub created_at: String,
    pub git_commit_hash: Option<String>,
    pub synced: bool,
}

impl Message {
    pub fn is_consistent(&self) -> bool {
        self.synced == self.git_commit_hash.is_some()
    }
}

/// A message as projected into the working tree: `{ id, content, timestamp }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub content: String,
    pub timestamp: String,
}

/// Validated `limit`/`offset` pair for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: constants::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Parse raw caller input (query strings, CLI args). Missing values take defaults;
    /// anything that is not a non-negative integer is rejected.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, ValidationError> {
        let defaults = Self::default();
        Ok(Self {
            limit: parse_non_negative("limit", limit, defaults.limit)?,
            offset: parse_non_negative("offset", offset, defaults.offset)?,
        })
    }
}

fn parse_non_negative(
    field: &str,
    raw: Option<&str>,
    default: u32,
) -> Result<u32, ValidationError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    if trimmed.starts_with('-') && trimmed[1..].parse::<u64>().is_ok() {
        return Err(ValidationError::invalid_argument(
            field,
            raw,
            "must not be negative",
        ));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| ValidationError::invalid_argument(field, raw, "expected a non-negative integer"))
}

/// Content accepted by `create`: anything with at least one non-whitespace character.
pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}
