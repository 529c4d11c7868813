//! Common types used across the storefront API

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Offset pagination parameters (`?skip=0&limit=50`)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        i64::from(self.skip.unwrap_or(0))
    }

    /// Row limit, defaulted and capped at `MAX_PAGE_LIMIT`
    pub fn limit(&self) -> i64 {
        i64::from(self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT))
    }
}

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::default();
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 50);
    }

    #[test]
    fn test_pagination_limit_is_capped() {
        let p = Pagination {
            skip: Some(10),
            limit: Some(10_000),
        };
        assert_eq!(p.offset(), 10);
        assert_eq!(p.limit(), i64::from(MAX_PAGE_LIMIT));
    }
}
