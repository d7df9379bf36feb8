//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Upper bound on the number of rows a single list request may return.
pub const MAX_LIMIT: u64 = 500;

/// Offset-based request parameters (`?skip=0&limit=100`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of rows to skip.
    #[serde(default)]
    pub skip: u64,
    /// Maximum number of rows to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    100
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    /// Calculates the offset for database queries.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.skip
    }

    /// Returns the limit for database queries, clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageRequest::default();
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 100);
    }

    #[test]
    fn test_limit_is_clamped() {
        let page = PageRequest { skip: 5, limit: 0 };
        assert_eq!(page.limit(), 1);
        let page = PageRequest {
            skip: 5,
            limit: 10_000,
        };
        assert_eq!(page.limit(), MAX_LIMIT);
        assert_eq!(page.offset(), 5);
    }

    #[test]
    fn test_deserialize_partial_query() {
        let page: PageRequest = serde_json::from_str(r#"{"skip": 20}"#).unwrap();
        assert_eq!(page.skip, 20);
        assert_eq!(page.limit, 100);
    }
}
