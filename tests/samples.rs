use dbsketch::ast::{RelationshipKind, Schema};
use dbsketch::diagnostic::Construct;
use dbsketch::{SourceFormat, parse_source, parser, serializer, sql};
use pretty_assertions::assert_eq;

const ECOMMERCE_DBML: &str = include_str!("fixtures/ecommerce.dbml");
const BLOG_DBML: &str = include_str!("fixtures/blog.dbml");
const ECOMMERCE_SQL: &str = include_str!("fixtures/ecommerce.sql");
const BLOG_SQL: &str = include_str!("fixtures/blog.sql");

fn table_names(schema: &Schema) -> Vec<&str> {
    schema.tables.iter().map(|t| t.name.as_str()).collect()
}

#[test]
fn dsl_samples_parse_cleanly() {
    let ecommerce = parser::parse_with_diagnostics(ECOMMERCE_DBML);
    assert!(ecommerce.is_clean(), "{:?}", ecommerce.diagnostics);
    assert_eq!(
        table_names(&ecommerce.schema),
        vec!["users", "products", "categories", "orders", "order_items", "reviews"]
    );
    assert_eq!(ecommerce.schema.relationships.len(), 7);
    assert!(ecommerce
        .schema
        .relationships
        .iter()
        .all(|r| r.kind == RelationshipKind::OneToMany));

    let users = &ecommerce.schema.tables[0];
    assert_eq!(users.note.as_deref(), Some("User accounts and authentication"));
    assert_eq!(users.columns[5].default.as_deref(), Some("now()"));

    let blog = parser::parse_with_diagnostics(BLOG_DBML);
    assert!(blog.is_clean());
    assert_eq!(blog.schema.tables.len(), 5);
    assert_eq!(blog.schema.relationships.len(), 6);
}

#[test]
fn sql_samples_extract() {
    let ecommerce = sql::parse_sql_with_diagnostics(ECOMMERCE_SQL);
    assert_eq!(
        table_names(&ecommerce.schema),
        vec!["users", "categories", "products", "orders", "order_items", "reviews"]
    );
    assert_eq!(ecommerce.schema.relationships.len(), 7);

    // the table-level COMMENT clause is the only thing dropped
    assert_eq!(ecommerce.diagnostics.len(), 1);
    assert_eq!(ecommerce.diagnostics[0].construct, Construct::Column);
    assert_eq!(
        ecommerce.diagnostics[0].offset,
        ECOMMERCE_SQL.find("COMMENT").unwrap()
    );

    let blog = sql::parse_sql_with_diagnostics(BLOG_SQL);
    assert!(blog.is_clean());
    assert_eq!(blog.schema.tables.len(), 5);
    assert_eq!(blog.schema.relationships.len(), 6);
    assert_eq!(blog.schema.tables[3].indexes[0].columns, vec!["post_id", "tag_id"]);
}

#[test]
fn sql_to_dsl_is_lossless() {
    for sample in [ECOMMERCE_SQL, BLOG_SQL] {
        let schema = sql::parse_sql(sample);
        let dsl = serializer::to_source(&schema);
        let reparsed = parser::parse_with_diagnostics(&dsl);
        assert!(reparsed.is_clean(), "{:?}", reparsed.diagnostics);
        assert_eq!(reparsed.schema, schema);
    }
}

#[test]
fn dsl_reserialize_is_stable() {
    for sample in [ECOMMERCE_DBML, BLOG_DBML] {
        let schema = parser::parse(sample);
        let once = serializer::to_source(&schema);
        assert_eq!(parser::parse(&once), schema);
        assert_eq!(serializer::to_source(&parser::parse(&once)), once);
    }
}

#[test]
fn blog_dialects_describe_the_same_model() {
    let from_dsl = parser::parse(BLOG_DBML);
    let from_sql = sql::parse_sql(BLOG_SQL);

    let columns = |schema: &Schema| {
        schema
            .tables
            .iter()
            .flat_map(|t| {
                t.columns.iter().map(move |c| {
                    (
                        t.name.clone(),
                        c.name.clone(),
                        c.typ.clone(),
                        c.primary_key,
                        c.not_null,
                        c.unique,
                    )
                })
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(columns(&from_dsl), columns(&from_sql));

    let endpoints = |schema: &Schema| {
        schema
            .relationships
            .iter()
            .map(|r| {
                format!(
                    "{}.{} -> {}.{}",
                    r.from_table, r.from_column, r.to_table, r.to_column
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(endpoints(&from_dsl), endpoints(&from_sql));
}

#[test]
fn auto_detection_picks_the_right_front_end() {
    for (text, tables) in [
        (ECOMMERCE_DBML, 6),
        (ECOMMERCE_SQL, 6),
        (BLOG_DBML, 5),
        (BLOG_SQL, 5),
    ] {
        let parsed = parse_source(text, SourceFormat::Auto);
        assert_eq!(parsed.schema.tables.len(), tables);
    }
    assert_eq!(SourceFormat::detect(BLOG_SQL), SourceFormat::Sql);
    assert_eq!(SourceFormat::detect(BLOG_DBML), SourceFormat::Dsl);
}

#[test]
fn schema_json_round_trips() {
    let schema = parser::parse(ECOMMERCE_DBML);
    let json = serde_json::to_string(&schema).unwrap();
    let back: Schema = serde_json::from_str(&json).unwrap();
    assert_eq!(back, schema);
}
