//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::config::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};
use crate::domain::Document;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One sort key: `field,asc` or `field,desc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub direction: Direction,
}

impl SortOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse `field[,asc|desc]`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut parts = raw.split(',').map(str::trim);
        let field = parts
            .next()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| "empty sort field".to_string())?;
        let direction = match parts.next() {
            None | Some("") => Direction::Asc,
            Some(d) if d.eq_ignore_ascii_case("asc") => Direction::Asc,
            Some(d) if d.eq_ignore_ascii_case("desc") => Direction::Desc,
            Some(d) => return Err(format!("unknown sort direction '{}'", d)),
        };
        if parts.next().is_some() {
            return Err(format!("sort '{}' has too many parts", raw));
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Asc => write!(f, "{},asc", self.field),
            Direction::Desc => write!(f, "{},desc", self.field),
        }
    }
}

/// Page selection (zero-based page number, DRY - reusable across all list endpoints)
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct PageRequest {
    pub page: u64,
    // Upper bound mirrors MAX_PAGE_SIZE
    #[validate(range(min = 1, max = 100, message = "size must be between 1 and 100"))]
    pub size: u64,
    pub sort: Vec<SortOrder>,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: Vec::new(),
        }
    }

    pub fn sorted_by(mut self, order: SortOrder) -> Self {
        self.sort.push(order);
        self
    }

    /// Calculate offset for the store query
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    /// Same request, another page
    pub fn with_page(&self, page: u64) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE)
    }
}

/// Query-string parameters recognised on list and finder endpoints.
///
/// Only used for the OpenAPI document; the gateway parses the raw pairs
/// itself so field filters can be mixed in.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[allow(dead_code)]
pub struct PageParams {
    /// Zero-based page number
    #[param(example = 0)]
    pub page: Option<u64>,
    /// Items per page (1-100)
    #[param(example = 20)]
    pub size: Option<u64>,
    /// Sort key, `field[,asc|desc]`, repeatable
    #[param(example = "name,desc")]
    pub sort: Option<String>,
}

/// Filter plus page selection for a repository listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Field equality constraints, values already coerced to field types
    pub filter: Document,
    pub page: PageRequest,
}

impl ListQuery {
    pub fn new(filter: Document, page: PageRequest) -> Self {
        Self { filter, page }
    }
}

/// One page of results with its position in the whole sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub size: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, number: u64, size: u64, total: u64) -> Self {
        Self {
            items,
            number,
            size,
            total,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size > 0 {
            (self.total + self.size - 1) / self.size
        } else {
            0
        }
    }

    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1) < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.number > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(SortOrder::parse("qty").unwrap(), SortOrder::asc("qty"));
        assert_eq!(SortOrder::parse("qty,DESC").unwrap(), SortOrder::desc("qty"));
        assert!(SortOrder::parse("").is_err());
        assert!(SortOrder::parse("qty,sideways").is_err());
        assert!(SortOrder::parse("qty,asc,again").is_err());
    }

    #[test]
    fn test_page_request_validation() {
        assert!(PageRequest::new(0, 20).validate().is_ok());
        assert!(PageRequest::new(0, 0).validate().is_err());
        assert!(PageRequest::new(0, 101).validate().is_err());
        assert_eq!(PageRequest::new(3, 10).offset(), 30);
    }

    #[test]
    fn test_page_navigation() {
        let page = Page::new(vec![1, 2], 0, 2, 5);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(!page.has_prev());

        let last = Page::new(vec![5], 2, 2, 5);
        assert!(!last.has_next());
        assert!(last.has_prev());

        let empty: Page<i32> = Page::new(vec![], 0, 20, 0);
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());

        let beyond: Page<i32> = Page::new(vec![], u64::MAX, 20, 5);
        assert!(!beyond.has_next());
        assert!(beyond.has_prev());
    }

    #[test]
    fn test_max_page_size_matches_validation_bound() {
        assert_eq!(crate::config::MAX_PAGE_SIZE, 100);
    }
}
