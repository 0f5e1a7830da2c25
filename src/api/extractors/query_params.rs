//! Raw query-string pairs plus the paging/filter grammar shared by list
//! and finder endpoints.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use validator::Validate;

use crate::config::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, PARAM_PAGE, PARAM_SIZE, PARAM_SORT};
use crate::domain::{Document, EntitySchema};
use crate::errors::{AppError, AppResult};
use crate::types::{ListQuery, PageRequest, SortOrder};

/// Query parameters in request order, repeated keys preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(pub Vec<(String, String)>);

#[async_trait]
impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::malformed(e.body_text()))?;
        Ok(QueryParams(pairs))
    }
}

impl QueryParams {
    /// Remove a single-valued parameter, returning its value.
    pub fn take(&mut self, name: &str) -> AppResult<Option<String>> {
        let mut values = Vec::new();
        self.0.retain(|(key, value)| {
            if key == name {
                values.push(value.clone());
                false
            } else {
                true
            }
        });

        if values.len() > 1 {
            return Err(AppError::malformed(format!(
                "parameter '{}' given more than once",
                name
            )));
        }
        Ok(values.pop())
    }

    /// Paging plus field equality filters, for collection listings.
    pub fn list_query(&self, schema: &EntitySchema) -> AppResult<ListQuery> {
        self.parse(schema, true)
    }

    /// Paging only; any other parameter is rejected.
    pub fn page_request(&self, schema: &EntitySchema) -> AppResult<PageRequest> {
        self.parse(schema, false).map(|query| query.page)
    }

    /// Every pair except the page number, for building navigation links.
    pub fn without_page(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter().filter(|(key, _)| key != PARAM_PAGE)
    }

    fn parse(&self, schema: &EntitySchema, allow_filters: bool) -> AppResult<ListQuery> {
        let mut page = None;
        let mut size = None;
        let mut sort = Vec::new();
        let mut filter = Document::new();

        for (key, value) in &self.0 {
            match key.as_str() {
                PARAM_PAGE => set_once(&mut page, key, parse_number(key, value)?)?,
                PARAM_SIZE => set_once(&mut size, key, parse_number(key, value)?)?,
                PARAM_SORT => sort.push(parse_sort(schema, value)?),
                field if allow_filters => {
                    let coerced = schema.coerce_filter(field, value)?;
                    if filter.insert(field.to_string(), coerced).is_some() {
                        return Err(AppError::malformed(format!(
                            "parameter '{}' given more than once",
                            field
                        )));
                    }
                }
                other => {
                    return Err(AppError::malformed(format!("unknown parameter '{}'", other)))
                }
            }
        }

        let request = PageRequest {
            page: page.unwrap_or(DEFAULT_PAGE_NUMBER),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE),
            sort,
        };
        request
            .validate()
            .map_err(|e| AppError::malformed(format_validation_errors(&e)))?;
        let offset = request.page.checked_mul(request.size);
        if offset.map_or(true, |offset| offset > i64::MAX as u64) {
            return Err(AppError::malformed(format!(
                "page {} is out of range for size {}",
                request.page, request.size
            )));
        }

        Ok(ListQuery::new(filter, request))
    }
}

fn set_once(slot: &mut Option<u64>, name: &str, value: u64) -> AppResult<()> {
    if slot.replace(value).is_some() {
        return Err(AppError::malformed(format!(
            "parameter '{}' given more than once",
            name
        )));
    }
    Ok(())
}

fn parse_number(name: &str, raw: &str) -> AppResult<u64> {
    raw.trim().parse().map_err(|_| {
        AppError::malformed(format!(
            "parameter '{}' must be a non-negative integer, got '{}'",
            name, raw
        ))
    })
}

fn parse_sort(schema: &EntitySchema, raw: &str) -> AppResult<SortOrder> {
    let order = SortOrder::parse(raw).map_err(AppError::malformed)?;
    match schema.field_def(&order.field) {
        Some(def) if def.field_type.is_sortable() => Ok(order),
        _ => Err(AppError::malformed(format!(
            "cannot sort {} by '{}'",
            schema.name, order.field
        ))),
    }
}

/// Format validation errors into a user-friendly string
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog;
    use crate::types::Direction;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let query = params(&[]).list_query(&catalog::widget()).unwrap();
        assert_eq!(query.page, PageRequest::default());
        assert!(query.filter.is_empty());
    }

    #[test]
    fn test_paging_sorting_and_filters() {
        let query = params(&[
            ("page", "2"),
            ("size", "5"),
            ("sort", "qty,desc"),
            ("sort", "name"),
            ("qty", "7"),
        ])
        .list_query(&catalog::widget())
        .unwrap();

        assert_eq!(query.page.page, 2);
        assert_eq!(query.page.size, 5);
        assert_eq!(query.page.sort.len(), 2);
        assert_eq!(query.page.sort[0].direction, Direction::Desc);
        assert_eq!(query.filter.get("qty"), Some(&json!(7)));
    }

    #[test]
    fn test_malformed_parameters() {
        let schema = catalog::widget();
        for pairs in [
            vec![("page", "-1")],
            vec![("size", "0")],
            vec![("size", "500")],
            vec![("page", "1"), ("page", "2")],
            vec![("sort", "colour")],
            vec![("sort", "qty,up")],
            vec![("colour", "red")],
            vec![("qty", "lots")],
            vec![("page", "18446744073709551615")],
            vec![("page", "461168601842738791"), ("size", "20")],
        ] {
            let err = params(&pairs).list_query(&schema).unwrap_err();
            assert!(matches!(err, AppError::MalformedRequest(_)), "{:?}", pairs);
        }
    }

    #[test]
    fn test_reference_fields_are_not_filters() {
        let err = params(&[("manager", "1")])
            .list_query(&catalog::person())
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedRequest(_)));
    }

    #[test]
    fn test_largest_addressable_page() {
        let query = params(&[("page", "9223372036854775807"), ("size", "1")])
            .list_query(&catalog::widget())
            .unwrap();
        assert_eq!(query.page.offset(), i64::MAX as u64);
    }

    #[test]
    fn test_page_request_rejects_filters() {
        let schema = catalog::widget();
        assert!(params(&[("size", "3")]).page_request(&schema).is_ok());
        assert!(params(&[("qty", "3")]).page_request(&schema).is_err());
    }

    #[test]
    fn test_take_removes_parameter() {
        let mut query = params(&[("name", "Baggins"), ("size", "2")]);
        assert_eq!(query.take("name").unwrap(), Some("Baggins".to_string()));
        assert_eq!(query.take("name").unwrap(), None);
        assert_eq!(query.0.len(), 1);

        let mut twice = params(&[("name", "a"), ("name", "b")]);
        assert!(twice.take("name").is_err());
    }

    #[test]
    fn test_without_page() {
        let query = params(&[("page", "1"), ("sort", "qty"), ("size", "2")]);
        let kept: Vec<_> = query.without_page().map(|(k, _)| k.as_str()).collect();
        assert_eq!(kept, vec!["sort", "size"]);
    }
}
