//! Built-in entity declarations, used when no schema file is configured.

use super::schema::{EntitySchema, FieldDef, FieldType, Finder};

/// `Person` at `/people`, searchable by last name, with an optional manager.
pub fn person() -> EntitySchema {
    EntitySchema::new("Person")
        .collection("people")
        .field(FieldDef::new("firstName", FieldType::String))
        .field(FieldDef::new("lastName", FieldType::String))
        .field(FieldDef::new(
            "manager",
            FieldType::Reference {
                target: "Person".to_string(),
            },
        ))
        .finder(Finder::new("findByLastName", "lastName").with_param("name"))
}

/// `Widget` at `/widgets`.
pub fn widget() -> EntitySchema {
    EntitySchema::new("Widget")
        .field(FieldDef::new("name", FieldType::String).required())
        .field(FieldDef::new("qty", FieldType::Integer))
        .finder(Finder::new("findByName", "name"))
}

/// All built-in declarations.
pub fn builtin() -> Vec<EntitySchema> {
    vec![person(), widget()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SchemaRegistry;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let registry = SchemaRegistry::new(builtin()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.by_collection("people").is_some());
        assert!(registry.by_collection("widgets").is_some());
    }
}
