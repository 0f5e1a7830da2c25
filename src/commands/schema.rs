//! Schema command - Prints the declared entity types and the routes they get.

use std::fmt::Write;

use crate::cli::args::SchemaArgs;
use crate::config::Config;
use crate::domain::{Capability, EntitySchema, FieldType, SchemaRegistry};
use crate::errors::AppResult;

/// Execute the schema command
pub async fn execute(args: SchemaArgs, mut config: Config) -> AppResult<()> {
    if let Some(path) = args.schema {
        config.schema_path = Some(path);
    }

    let registry = super::load_registry(&config)?;
    print!("{}", describe(&registry, &config.base_path));
    Ok(())
}

/// Human-readable summary of every entity type, sorted by collection.
pub fn describe(registry: &SchemaRegistry, base_path: &str) -> String {
    let mut schemas: Vec<_> = registry.iter().collect();
    schemas.sort_by(|a, b| a.collection.cmp(&b.collection));

    let mut out = String::new();
    for schema in schemas {
        describe_one(&mut out, schema, base_path);
    }
    out
}

fn describe_one(out: &mut String, schema: &EntitySchema, base_path: &str) {
    let root = format!("{}/{}", base_path, schema.collection);
    let _ = writeln!(
        out,
        "{} ({}, ids: {:?}{})",
        schema.name,
        root,
        schema.id_strategy,
        if schema.expose_id { ", exposed" } else { "" }
    );

    for field in &schema.fields {
        let _ = writeln!(
            out,
            "  {:<16} {}{}",
            field.name,
            type_label(&field.field_type),
            if field.required { " (required)" } else { "" }
        );
    }

    let caps = &schema.capabilities;
    let allowed = |capability| caps.allows(capability);
    if allowed(Capability::List) {
        let _ = writeln!(out, "  GET    {}", root);
        let _ = writeln!(out, "  GET    {}/search", root);
        for finder in &schema.finders {
            let _ = writeln!(
                out,
                "  GET    {}/search/{}?{}=",
                root,
                finder.name,
                finder.param()
            );
        }
    }
    if allowed(Capability::Create) {
        let _ = writeln!(out, "  POST   {}", root);
    }
    if allowed(Capability::Read) {
        let _ = writeln!(out, "  GET    {}/{{id}}", root);
        for reference in schema.references() {
            let _ = writeln!(out, "  GET    {}/{{id}}/{}", root, reference.name);
        }
    }
    if allowed(Capability::Update) {
        let _ = writeln!(out, "  PUT    {}/{{id}}", root);
        let _ = writeln!(out, "  PATCH  {}/{{id}}", root);
    }
    if allowed(Capability::Delete) {
        let _ = writeln!(out, "  DELETE {}/{{id}}", root);
    }
    out.push('\n');
}

fn type_label(field_type: &FieldType) -> String {
    match field_type {
        FieldType::String => "string".to_string(),
        FieldType::Integer => "integer".to_string(),
        FieldType::Number => "number".to_string(),
        FieldType::Boolean => "boolean".to_string(),
        FieldType::Timestamp => "timestamp".to_string(),
        FieldType::Object => "object".to_string(),
        FieldType::Array => "array".to_string(),
        FieldType::Reference { target } => format!("-> {}", target),
        FieldType::References { target } => format!("->* {}", target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{catalog, Capabilities};

    #[test]
    fn test_describe_builtin_catalog() {
        let registry = SchemaRegistry::new(catalog::builtin()).unwrap();
        let text = describe(&registry, "/api");

        assert!(text.contains("Person (/api/people"));
        assert!(text.contains("GET    /api/people/search/findByLastName?name="));
        assert!(text.contains("GET    /api/people/{id}/manager"));
        assert!(text.contains("name             string (required)"));
        // sorted by collection
        assert!(text.find("Person").unwrap() < text.find("Widget").unwrap());
    }

    #[test]
    fn test_execute_falls_back_to_builtin_catalog() {
        tokio_test::assert_ok!(tokio_test::block_on(execute(
            SchemaArgs::default(),
            Config::default()
        )));
    }

    #[test]
    fn test_execute_reports_missing_schema_file() {
        let args = SchemaArgs {
            schema: Some("/nonexistent/entities.json".to_string()),
        };
        assert!(tokio_test::block_on(execute(args, Config::default())).is_err());
    }

    #[test]
    fn test_describe_omits_disabled_routes() {
        let schema = catalog::widget().capabilities(Capabilities::read_only());
        let registry = SchemaRegistry::new(vec![schema]).unwrap();
        let text = describe(&registry, "");

        assert!(text.contains("GET    /widgets/{id}"));
        assert!(!text.contains("POST"));
        assert!(!text.contains("DELETE"));
    }
}
