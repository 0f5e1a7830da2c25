//! Application services layer - Entity repositories.
//!
//! Repositories implement the per-type operations (create, read, list,
//! update, delete, finders, relations) on top of the store adapter. They
//! depend on abstractions (traits) so the HTTP layer can be tested in
//! isolation.

pub mod container;
mod pager;
mod repository;

// Repository Container
pub use container::{Repositories, RepositoryContainer};

// Repository trait and implementation
pub use pager::EntityPager;
pub use repository::{DocumentRepository, EntityRepository, Related};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockRepositoryContainer;
