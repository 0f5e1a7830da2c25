//! PostgreSQL document store.
//!
//! Every collection shares one `documents` table keyed by
//! `(collection, id)`, bodies live in a JSONB column. Equality filters
//! use JSONB containment so the GIN index on `body` applies.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    Statement, Value as DbValue,
};
use serde_json::Value;

use super::entities::document::{self, ActiveModel, Entity as DocumentEntity};
use super::{DocumentQuery, DocumentStore, StoreError, StoreResult, StoredDocument};
use crate::domain::Document;
use crate::types::Direction;

const NEXT_SEQUENCE_SQL: &str = r#"
INSERT INTO collection_sequences (collection, last_value)
VALUES ($1, 1)
ON CONFLICT (collection)
DO UPDATE SET last_value = collection_sequences.last_value + 1
RETURNING last_value
"#;

/// Document store over a SeaORM connection
#[derive(Clone)]
pub struct PgDocumentStore {
    db: DatabaseConnection,
}

impl PgDocumentStore {
    /// Create new store instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn key(collection: &str, id: &str) -> SimpleExpr {
        document::Column::Collection
            .eq(collection)
            .and(document::Column::Id.eq(id))
    }

    /// `body @> filter`; the empty object contains nothing extra
    fn containment(filter: &Document) -> SimpleExpr {
        Expr::cust_with_values(
            r#""body" @> $1"#,
            [DbValue::Json(Some(Box::new(Value::Object(filter.clone()))))],
        )
    }
}

/// Translate SeaORM failures into driver errors.
fn store_error(err: DbErr, collection: &str, id: Option<&str>) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return match id {
            Some(id) => StoreError::DuplicateId {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            None => StoreError::Constraint(detail),
        };
    }

    match err {
        DbErr::Conn(e) => StoreError::Unavailable(e.to_string()),
        DbErr::ConnectionAcquire(e) => StoreError::Unavailable(e.to_string()),
        other => StoreError::Internal(other.to_string()),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> StoreResult<StoredDocument> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.to_string()),
            body: Set(Value::Object(body)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| store_error(e, collection, Some(id)))?;
        Ok(StoredDocument::from(model))
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredDocument>> {
        let result = DocumentEntity::find()
            .filter(Self::key(collection, id))
            .one(&self.db)
            .await
            .map_err(|e| store_error(e, collection, None))?;

        Ok(result.map(StoredDocument::from))
    }

    async fn find(&self, query: &DocumentQuery) -> StoreResult<Vec<StoredDocument>> {
        let mut select =
            DocumentEntity::find().filter(document::Column::Collection.eq(query.collection.as_str()));
        if !query.filter.is_empty() {
            select = select.filter(Self::containment(&query.filter));
        }

        // Sort fields are schema-declared identifiers, safe to inline
        for order in &query.sort {
            let key = Expr::cust(format!(r#""body" -> '{}'"#, order.field));
            let direction = match order.direction {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            select = select.order_by(key, direction);
        }
        select = select.order_by_asc(document::Column::Seq);

        let models = select
            .offset(query.offset)
            .limit(query.limit)
            .all(&self.db)
            .await
            .map_err(|e| store_error(e, &query.collection, None))?;

        Ok(models.into_iter().map(StoredDocument::from).collect())
    }

    async fn count(&self, collection: &str, filter: &Document) -> StoreResult<u64> {
        let mut select = DocumentEntity::find().filter(document::Column::Collection.eq(collection));
        if !filter.is_empty() {
            select = select.filter(Self::containment(filter));
        }

        select
            .count(&self.db)
            .await
            .map_err(|e| store_error(e, collection, None))
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> StoreResult<Option<StoredDocument>> {
        let updated = DocumentEntity::update_many()
            .col_expr(
                document::Column::Body,
                Expr::value(DbValue::Json(Some(Box::new(Value::Object(body))))),
            )
            .col_expr(document::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(Self::key(collection, id))
            .exec_with_returning(&self.db)
            .await
            .map_err(|e| store_error(e, collection, None))?;

        Ok(updated.into_iter().next().map(StoredDocument::from))
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let result = DocumentEntity::delete_many()
            .filter(Self::key(collection, id))
            .exec(&self.db)
            .await
            .map_err(|e| store_error(e, collection, None))?;

        Ok(result.rows_affected > 0)
    }

    async fn next_sequence(&self, collection: &str) -> StoreResult<u64> {
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                NEXT_SEQUENCE_SQL,
                [collection.into()],
            ))
            .await
            .map_err(|e| store_error(e, collection, None))?
            .ok_or_else(|| StoreError::Internal("sequence upsert returned no row".into()))?;

        let value: i64 = row
            .try_get("", "last_value")
            .map_err(|e| store_error(e, collection, None))?;
        u64::try_from(value).map_err(|_| StoreError::Internal(format!("negative sequence {}", value)))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await
            .map_err(|e| store_error(e, "", None))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
