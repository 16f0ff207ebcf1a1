//! Unified relational schema model shared by the DSL parser and the SQL extractor.

use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub enums: Vec<Enum>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Cross-reference key. Keeps the full dotted form (`public.users`).
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Table {
    /// Build a table from a possibly schema-qualified identifier.
    pub fn new(ident: &str) -> Self {
        let (schema, name) = match ident.split_once('.') {
            Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
            None => (None, ident.to_string()),
        };
        Self {
            id: ident.to_string(),
            name,
            schema,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// Column names, or raw expressions for expression indexes.
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Relationship {
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
        kind: RelationshipKind,
    ) -> Self {
        let (from_table, from_column) = (from_table.into(), from_column.into());
        let (to_table, to_column) = (to_table.into(), to_column.into());
        Self {
            id: format!("{from_table}_{from_column}_{to_table}_{to_column}"),
            from_table,
            from_column,
            to_table,
            to_column,
            kind,
            label: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    #[serde(rename = "1-1")]
    OneToOne,
    #[serde(rename = "1-n")]
    OneToMany,
    #[serde(rename = "n-1")]
    ManyToOne,
    #[serde(rename = "n-n")]
    ManyToMany,
}

impl RelationshipKind {
    /// DSL operator for this cardinality.
    pub fn operator(self) -> &'static str {
        match self {
            Self::OneToOne => "--",
            Self::OneToMany => ">",
            Self::ManyToOne => "<",
            Self::ManyToMany => "<>",
        }
    }

    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "--" => Some(Self::OneToOne),
            ">" => Some(Self::OneToMany),
            "<" => Some(Self::ManyToOne),
            "<>" => Some(Self::ManyToMany),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    pub values: Vec<String>,
}
