//! Repository operations a request can resolve to.

use axum::http::Method;

use crate::domain::Capability;

/// What a matched route asks the repository to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    GetById,
    Replace,
    Patch,
    Delete,
    FollowRelation,
    SearchIndex,
    Find,
}

impl Operation {
    /// Capability that must be enabled on the entity type
    pub fn capability(self) -> Capability {
        match self {
            Operation::List | Operation::SearchIndex | Operation::Find => Capability::List,
            Operation::Create => Capability::Create,
            Operation::GetById | Operation::FollowRelation => Capability::Read,
            Operation::Replace | Operation::Patch => Capability::Update,
            Operation::Delete => Capability::Delete,
        }
    }

    pub fn method(self) -> Method {
        match self {
            Operation::Create => Method::POST,
            Operation::Replace => Method::PUT,
            Operation::Patch => Method::PATCH,
            Operation::Delete => Method::DELETE,
            _ => Method::GET,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::GetById => "getById",
            Operation::Replace => "replace",
            Operation::Patch => "patch",
            Operation::Delete => "delete",
            Operation::FollowRelation => "follow",
            Operation::SearchIndex => "searchIndex",
            Operation::Find => "find",
        }
    }
}
