//! Lazy, restartable paging over a repository listing.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::domain::{Entity, EntitySchema};
use crate::errors::{AppError, AppResult};
use crate::infra::StoreAdapter;
use crate::types::{ListQuery, Page};

/// A listing that has not touched the store yet.
///
/// Nothing is read until `fetch`, `fetch_page` or `stream` is called, and
/// every call starts over from the store, so a pager can be reused.
#[derive(Clone)]
pub struct EntityPager {
    adapter: Arc<StoreAdapter>,
    schema: Arc<EntitySchema>,
    query: ListQuery,
}

impl EntityPager {
    pub(crate) fn new(adapter: Arc<StoreAdapter>, schema: Arc<EntitySchema>, query: ListQuery) -> Self {
        Self {
            adapter,
            schema,
            query,
        }
    }

    /// The page named by the query
    pub async fn fetch(&self) -> AppResult<Page<Entity>> {
        self.fetch_page(self.query.page.page).await
    }

    /// Any page of the same listing, with the total match count
    pub async fn fetch_page(&self, number: u64) -> AppResult<Page<Entity>> {
        let query = ListQuery::new(self.query.filter.clone(), self.query.page.with_page(number));

        let (items, total) = tokio::try_join!(
            self.adapter.find(&self.schema, &query),
            self.adapter.count(&self.schema, &query.filter),
        )?;

        tracing::debug!(
            collection = %self.schema.collection,
            page = number,
            returned = items.len(),
            total,
            "Fetched page"
        );
        Ok(Page::new(items, number, query.page.size, total))
    }

    /// Every entity from the query's page onwards, one store read per page.
    pub fn stream(&self) -> BoxStream<'static, AppResult<Entity>> {
        let pager = self.clone();
        let first = self.query.page.page;

        stream::try_unfold(Some(first), move |next| {
            let pager = pager.clone();
            async move {
                let Some(number) = next else {
                    return Ok::<_, AppError>(None);
                };

                let query =
                    ListQuery::new(pager.query.filter.clone(), pager.query.page.with_page(number));
                let items = pager.adapter.find(&pager.schema, &query).await?;
                if items.is_empty() {
                    return Ok(None);
                }

                let following = if (items.len() as u64) < query.page.size {
                    None
                } else {
                    number.checked_add(1)
                };
                let page = stream::iter(items.into_iter().map(Ok::<_, AppError>));
                Ok(Some((page, following)))
            }
        })
        .try_flatten()
        .boxed()
    }
}
