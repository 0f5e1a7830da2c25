//! Document row for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::Document;
use crate::infra::store::StoredDocument;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub collection: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub body: Json,
    /// Insertion order, assigned by the database
    pub seq: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database row to a stored document
impl From<Model> for StoredDocument {
    fn from(model: Model) -> Self {
        let body = match model.body {
            Json::Object(map) => map,
            other => {
                tracing::warn!(
                    collection = %model.collection,
                    id = %model.id,
                    "Stored body is not an object: {}",
                    other
                );
                Document::new()
            }
        };

        StoredDocument {
            id: model.id,
            body,
            seq: model.seq,
        }
    }
}
