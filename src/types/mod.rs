//! Shared types for DRY compliance.

mod pagination;
mod response;

pub use pagination::{Direction, ListQuery, Page, PageParams, PageRequest, SortOrder};
pub use response::{Created, NoContent, Paged, HEADER_PAGE, HEADER_PAGE_SIZE, HEADER_TOTAL_COUNT};
