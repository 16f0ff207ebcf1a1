//! Serializer for converting a Schema back to DSL source.

use crate::ast::{Column, Enum, Index, Relationship, Schema, Table};
use crate::scanner::is_ident_char;

/// Serialize a Schema to DSL source with default settings.
pub fn to_source(schema: &Schema) -> String {
    Serializer::default().serialize(schema)
}

pub struct Serializer {
    /// Indentation for block contents.
    pub indent: String,
}

impl Default for Serializer {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
        }
    }
}

impl Serializer {
    pub fn serialize(&self, schema: &Schema) -> String {
        let mut output = String::new();

        for table in &schema.tables {
            self.serialize_table(&mut output, table);
            output.push('\n');
        }

        for e in &schema.enums {
            self.serialize_enum(&mut output, e);
            output.push('\n');
        }

        for rel in &schema.relationships {
            serialize_relationship(&mut output, rel);
        }

        output
    }

    fn serialize_table(&self, output: &mut String, table: &Table) {
        let qualified = match &table.schema {
            Some(schema) => format!("{schema}.{}", table.name),
            None => table.name.clone(),
        };
        output.push_str(&format!("Table {}", ident(&qualified)));
        if let Some(color) = &table.color {
            output.push_str(&format!(" [headercolor: {}]", value(color)));
        }
        output.push_str(" {\n");

        for column in &table.columns {
            output.push_str(&self.indent);
            serialize_column(output, column);
        }

        if !table.indexes.is_empty() {
            output.push_str(&format!("{}indexes {{\n", self.indent));
            for index in &table.indexes {
                output.push_str(&self.indent);
                output.push_str(&self.indent);
                serialize_index(output, index);
            }
            output.push_str(&format!("{}}}\n", self.indent));
        }

        if let Some(note) = &table.note {
            output.push_str(&format!("{}Note: {}\n", self.indent, quote(note)));
        }

        output.push_str("}\n");
    }

    fn serialize_enum(&self, output: &mut String, e: &Enum) {
        output.push_str(&format!("Enum {} {{\n", ident(&e.name)));
        for v in &e.values {
            output.push_str(&format!("{}{}\n", self.indent, ident(v)));
        }
        output.push_str("}\n");
    }
}

fn serialize_column(output: &mut String, column: &Column) {
    output.push_str(&format!("{} {}", ident(&column.name), type_name(&column.typ)));

    let mut attrs = Vec::new();
    if column.primary_key {
        attrs.push("pk".to_string());
    }
    if column.not_null {
        attrs.push("not null".to_string());
    }
    if column.unique {
        attrs.push("unique".to_string());
    }
    if column.auto_increment {
        attrs.push("increment".to_string());
    }
    if let Some(default) = &column.default {
        attrs.push(format!("default: {}", value(default)));
    }
    if let Some(note) = &column.note {
        attrs.push(format!("note: {}", quote(note)));
    }

    if !attrs.is_empty() {
        output.push_str(&format!(" [{}]", attrs.join(", ")));
    }
    output.push('\n');
}

fn serialize_index(output: &mut String, index: &Index) {
    match index.columns.as_slice() {
        [single] => output.push_str(&ident(single)),
        columns => {
            let columns: Vec<_> = columns.iter().map(|c| ident(c)).collect();
            output.push_str(&format!("({})", columns.join(", ")));
        }
    }

    let mut settings = Vec::new();
    if index.primary_key {
        settings.push("pk".to_string());
    }
    if index.unique {
        settings.push("unique".to_string());
    }
    if let Some(name) = &index.name {
        settings.push(format!("name: {}", quote(name)));
    }
    if !settings.is_empty() {
        output.push_str(&format!(" [{}]", settings.join(", ")));
    }
    output.push('\n');
}

fn serialize_relationship(output: &mut String, rel: &Relationship) {
    output.push_str(&format!(
        "Ref: {} {} {}\n",
        ident(&format!("{}.{}", rel.from_table, rel.from_column)),
        rel.kind.operator(),
        ident(&format!("{}.{}", rel.to_table, rel.to_column)),
    ));
}

fn is_plain_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_ident_char)
}

/// Identifier as written, or quoted when the parser would read it differently.
fn ident(s: &str) -> String {
    if is_plain_ident(s) {
        s.to_string()
    } else {
        quote(s)
    }
}

/// Type name: a plain identifier optionally followed by one balanced,
/// quote-free argument group, as in `decimal(10, 2)`.
fn type_name(s: &str) -> String {
    let plain = match s.split_once('(') {
        None => is_plain_ident(s),
        Some((base, args)) => {
            is_plain_ident(base)
                && args.ends_with(')')
                && !args.contains(['"', '\'', '`', '\n', '('])
                && args.matches(')').count() == 1
        }
    };
    if plain { s.to_string() } else { quote(s) }
}

/// Unquoted values are cut at `,` `]` `}` and newlines and trimmed, so anything
/// else needs quotes.
fn value(s: &str) -> String {
    let safe = !s.is_empty()
        && s.trim() == s
        && !s.contains([',', ']', '}', '\n', '"', '\'', '`']);
    if safe { s.to_string() } else { quote(s) }
}

/// Quote with the first quote character the text does not contain. Quoted text
/// is read raw, so a string containing all three cannot round-trip exactly.
fn quote(s: &str) -> String {
    let q = ['"', '\'', '`']
        .into_iter()
        .find(|q| !s.contains(*q))
        .unwrap_or('"');
    format!("{q}{s}{q}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Column, RelationshipKind, Table};
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn users() -> Table {
        Table {
            columns: vec![
                Column {
                    primary_key: true,
                    auto_increment: true,
                    ..Column::new("id", "int")
                },
                Column {
                    not_null: true,
                    unique: true,
                    default: Some("guest".into()),
                    note: Some("login name".into()),
                    ..Column::new("username", "varchar(50)")
                },
            ],
            ..Table::new("users")
        }
    }

    #[test]
    fn test_serialize_table() {
        let schema = Schema {
            tables: vec![users()],
            ..Schema::default()
        };
        assert_eq!(
            to_source(&schema),
            "Table users {\n  id int [pk, increment]\n  username varchar(50) [not null, unique, default: guest, note: \"login name\"]\n}\n\n"
        );
    }

    #[test]
    fn test_serialize_relationship_operators() {
        let schema = Schema {
            relationships: vec![
                Relationship::new("a", "x", "b", "y", RelationshipKind::OneToMany),
                Relationship::new("a", "x", "b", "y", RelationshipKind::ManyToOne),
                Relationship::new("a", "x", "b", "y", RelationshipKind::ManyToMany),
                Relationship::new("a", "x", "b", "y", RelationshipKind::OneToOne),
            ],
            ..Schema::default()
        };
        assert_eq!(
            to_source(&schema),
            "Ref: a.x > b.y\nRef: a.x < b.y\nRef: a.x <> b.y\nRef: a.x -- b.y\n"
        );
    }

    #[test]
    fn test_qualified_table_name() {
        let schema = Schema {
            tables: vec![Table {
                columns: vec![Column::new("id", "int")],
                ..Table::new("public.users")
            }],
            ..Schema::default()
        };
        assert!(to_source(&schema).starts_with("Table public.users {\n"));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(ident("user id"), "\"user id\"");
        assert_eq!(ident("say \"hi\""), "'say \"hi\"'");
        assert_eq!(type_name("decimal(10, 2)"), "decimal(10, 2)");
        assert_eq!(type_name("double precision"), "\"double precision\"");
        assert_eq!(value("now()"), "now()");
        assert_eq!(value("a, b"), "\"a, b\"");
        assert_eq!(value(""), "\"\"");
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let mut table = users();
        table.note = Some("Accounts, logins".into());
        table.color = Some("#3498DB".into());
        table.indexes = vec![
            Index {
                columns: vec!["id".into(), "username".into()],
                unique: true,
                name: Some("idx_user".into()),
                ..Index::default()
            },
            Index {
                columns: vec!["lower(username)".into()],
                ..Index::default()
            },
        ];
        table.columns.push(Column {
            default: Some(" padded ".into()),
            note: Some("it's \"quoted\"".into()),
            ..Column::new("odd name", "double precision")
        });

        let schema = Schema {
            tables: vec![table, Table {
                columns: vec![Column::new("id", "uuid")],
                ..Table::new("audit.events")
            }],
            relationships: vec![
                Relationship::new("audit.events", "id", "users", "id", RelationshipKind::ManyToOne),
                Relationship::new("users", "id", "users", "id", RelationshipKind::OneToOne),
            ],
            enums: vec![Enum {
                name: "status".into(),
                values: vec!["active".into(), "on hold".into()],
            }],
        };

        let source = to_source(&schema);
        assert_eq!(parse(&source), schema);
    }
}
