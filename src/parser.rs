//! Permissive recursive-descent parser for the table-definition DSL.
//!
//! Malformed input never fails the parse: the offending construct is dropped,
//! a [`Diagnostic`](crate::diagnostic::Diagnostic) is recorded and scanning resumes.

use crate::ast::*;
use crate::diagnostic::{Construct, Diagnostics, Parsed};
use crate::scanner::Cursor;

/// Parse DSL source, dropping whatever cannot be understood.
pub fn parse(source: &str) -> Schema {
    Parser::new(source).parse().schema
}

pub fn parse_with_diagnostics(source: &str) -> Parsed {
    Parser::new(source).parse()
}

/// Parse DSL source, failing if any construct had to be dropped.
pub fn parse_strict(source: &str) -> crate::Result<Schema> {
    Parser::new(source).parse().into_strict()
}

/// Single-use parser. Scanning state lives in [`Cursor`] values threaded through
/// the grammar rules; the parser itself only owns the diagnostics list.
pub struct Parser<'a> {
    source: &'a str,
    diagnostics: Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn parse(mut self) -> Parsed {
        let mut schema = Schema::default();
        let mut cur = Cursor::new(self.source);
        let mut skipped: Option<usize> = None;

        loop {
            cur = cur.skip_whitespace();
            if cur.is_eof() {
                break;
            }
            if let Some(next) = cur.skip_comment() {
                cur = next;
                continue;
            }

            match cur.keyword() {
                "Table" | "table" => {
                    self.flush_skipped(&mut skipped);
                    let (table, next) = self.parse_table(cur);
                    if let Some(table) = table
                        .as_ref()
                        .filter(|table| schema.tables.iter().any(|t| t.id == table.id))
                    {
                        self.diagnostics.push(
                            Construct::Table,
                            cur.pos(),
                            format!("table `{}` defined more than once", table.id),
                        );
                    }
                    schema.tables.extend(table);
                    cur = next;
                }
                "Ref" | "ref" => {
                    self.flush_skipped(&mut skipped);
                    let (rel, next) = self.parse_relationship(cur);
                    schema.relationships.extend(rel);
                    cur = next;
                }
                "Enum" | "enum" => {
                    self.flush_skipped(&mut skipped);
                    let (e, next) = self.parse_enum(cur);
                    schema.enums.extend(e);
                    cur = next;
                }
                _ => {
                    if let Some((word, next)) = self.unsupported_block(cur) {
                        self.flush_skipped(&mut skipped);
                        self.diagnostics.push(
                            Construct::Input,
                            cur.pos(),
                            format!("unsupported `{word}` block skipped"),
                        );
                        cur = next;
                    } else {
                        skipped.get_or_insert(cur.pos());
                        cur = cur.resync();
                    }
                }
            }
        }
        self.flush_skipped(&mut skipped);

        tracing::debug!(
            tables = schema.tables.len(),
            relationships = schema.relationships.len(),
            enums = schema.enums.len(),
            "parsed DSL source"
        );

        Parsed {
            schema,
            diagnostics: self.diagnostics.into_vec(),
        }
    }

    fn flush_skipped(&mut self, skipped: &mut Option<usize>) {
        if let Some(offset) = skipped.take() {
            self.diagnostics
                .push(Construct::Input, offset, "unrecognized input skipped");
        }
    }

    /// `Project x { ... }`, `TableGroup g { ... }`, `Note n { ... }`: a word, an
    /// optional name and a brace block on the same line.
    fn unsupported_block(&self, cur: Cursor<'a>) -> Option<(&'a str, Cursor<'a>)> {
        let word = cur.keyword();
        if word.is_empty() {
            return None;
        }
        let mut next = cur.skip_keyword().skip_inline_whitespace();
        if next.peek() != Some('{') {
            next = next.identifier().1.skip_inline_whitespace();
        }
        if next.peek() != Some('{') {
            return None;
        }
        Some((word, next.group('{', '}').1))
    }

    fn parse_table(&mut self, cur: Cursor<'a>) -> (Option<Table>, Cursor<'a>) {
        let start = cur.pos();
        let (ident, cur) = cur.skip_keyword().skip_whitespace().identifier();
        if ident.is_empty() {
            self.diagnostics
                .push(Construct::Table, start, "table without a name dropped");
            return (None, cur);
        }
        let mut table = Table::new(ident);

        let mut cur = cur.skip_whitespace();
        if cur.keyword() == "as" {
            let (_alias, next) = cur.skip_keyword().skip_whitespace().identifier();
            cur = next.skip_whitespace();
        }
        if cur.peek() == Some('[') {
            cur = self.parse_table_settings(cur, &mut table).skip_whitespace();
        }

        let Some(mut cur) = cur.eat('{') else {
            self.diagnostics.push(
                Construct::Table,
                start,
                format!("expected `{{` after table `{}`", table.id),
            );
            return (Some(table), cur);
        };

        loop {
            cur = cur.skip_whitespace();
            match cur.peek() {
                None => {
                    self.diagnostics.push(
                        Construct::Table,
                        start,
                        format!("unterminated table `{}`", table.id),
                    );
                    break;
                }
                Some('}') => {
                    cur = cur.bump();
                    break;
                }
                _ => {}
            }
            if let Some(next) = cur.skip_comment() {
                cur = next;
                continue;
            }

            let after_kw = cur.skip_keyword().skip_whitespace();
            match cur.keyword() {
                "Note" | "note" if after_kw.peek() == Some(':') => {
                    let (note, next) = after_kw.bump().skip_whitespace().value();
                    table.note = Some(note.to_string());
                    cur = next;
                }
                "indexes" | "Indexes" if after_kw.peek() == Some('{') => {
                    cur = self.parse_indexes(after_kw.bump(), &mut table.indexes);
                }
                _ => {
                    let (column, next) = self.parse_column(cur);
                    table.columns.extend(column);
                    cur = next;
                }
            }
        }

        (Some(table), cur)
    }

    /// `[headercolor: #3498DB, note: 'text']` between the table name and body.
    fn parse_table_settings(&mut self, cur: Cursor<'a>, table: &mut Table) -> Cursor<'a> {
        self.parse_settings(cur, Construct::Table, |key, value| match key {
            "headercolor" | "color" => {
                table.color = value.map(str::to_string);
                true
            }
            "note" => {
                table.note = value.map(str::to_string);
                true
            }
            _ => false,
        })
    }

    /// Generic `[key, key: value, ...]` list. `apply` returns false for keys it
    /// does not handle. Values are only read when followed by `:`.
    fn parse_settings(
        &mut self,
        cur: Cursor<'a>,
        construct: Construct,
        mut apply: impl FnMut(&str, Option<&'a str>) -> bool,
    ) -> Cursor<'a> {
        let mut cur = cur.bump();
        loop {
            cur = cur.skip_whitespace();
            match cur.peek() {
                None => return cur,
                Some(']') => return cur.bump(),
                _ => {}
            }
            let at = cur.pos();
            let (key, next) = cur.identifier();
            if key.is_empty() {
                cur = cur.bump();
                continue;
            }
            let key = key.to_lowercase();
            let after = next.skip_whitespace();
            let (value, next) = match after.eat(':') {
                Some(colon) => {
                    let (v, n) = colon.skip_whitespace().value();
                    (Some(v), n)
                }
                None => (None, next),
            };
            if !apply(&key, value) {
                self.diagnostics
                    .push(construct, at, format!("unknown setting `{key}` ignored"));
                cur = next.skip_until(&[',', ']']);
            } else {
                cur = next;
            }
            cur = cur.skip_whitespace();
            if let Some(next) = cur.eat(',') {
                cur = next;
            }
        }
    }

    fn parse_column(&mut self, cur: Cursor<'a>) -> (Option<Column>, Cursor<'a>) {
        let start = cur.pos();
        let (name, after_name) = cur.identifier();
        let (typ, after_type) = self.parse_type(after_name.skip_inline_whitespace());
        if name.is_empty() || typ.is_empty() {
            let message = if name.is_empty() {
                "column without a name dropped".to_string()
            } else {
                format!("column `{name}` without a type dropped")
            };
            self.diagnostics.push(Construct::Column, start, message);
            return (None, cur.skip_rest_of_line());
        }

        let mut column = Column::new(name, typ);
        let mut cur = after_type.skip_inline_whitespace();
        if cur.peek() == Some('[') {
            cur = self.parse_attributes(cur, &mut column);
        }
        (Some(column), cur.skip_rest_of_line())
    }

    /// Type name with an optional argument group glued to it: `varchar(50)`.
    fn parse_type(&self, cur: Cursor<'a>) -> (String, Cursor<'a>) {
        let quoted = matches!(cur.peek(), Some('"' | '`' | '\''));
        let (base, cur) = cur.identifier();
        if base.is_empty() || quoted || cur.peek() != Some('(') {
            return (base.to_string(), cur);
        }
        let (args, cur) = cur.group('(', ')');
        (format!("{base}{args}"), cur)
    }

    fn parse_attributes(&mut self, cur: Cursor<'a>, column: &mut Column) -> Cursor<'a> {
        let mut cur = cur.bump();
        loop {
            cur = cur.skip_whitespace();
            match cur.peek() {
                None => return cur,
                Some(']') => return cur.bump(),
                _ => {}
            }

            let at = cur.pos();
            let (raw, next) = cur.identifier();
            if raw.is_empty() {
                cur = cur.bump();
                continue;
            }
            cur = next;

            match raw.to_lowercase().as_str() {
                "pk" | "primary" | "primarykey" => column.primary_key = true,
                "increment" | "auto_increment" => column.auto_increment = true,
                "unique" => column.unique = true,
                "not" => {
                    let (next_word, next) = cur.skip_whitespace().identifier();
                    if next_word.eq_ignore_ascii_case("null") {
                        column.not_null = true;
                    } else {
                        self.diagnostics.push(
                            Construct::Attribute,
                            at,
                            format!("unknown attribute `not {next_word}` ignored"),
                        );
                    }
                    cur = next;
                }
                // nullable is the default
                "null" => {}
                "default" => {
                    let (value, next) = Self::attribute_value(cur);
                    column.default = Some(value.to_string());
                    cur = next;
                }
                "note" => {
                    let (value, next) = Self::attribute_value(cur);
                    column.note = Some(value.to_string());
                    cur = next;
                }
                "ref" => {
                    self.diagnostics.push(
                        Construct::Relationship,
                        at,
                        format!("inline ref on column `{}` ignored", column.name),
                    );
                    cur = cur.skip_until(&[',', ']']);
                }
                other => {
                    self.diagnostics.push(
                        Construct::Attribute,
                        at,
                        format!("unknown attribute `{other}` on column `{}` ignored", column.name),
                    );
                    cur = cur.skip_until(&[',', ']']);
                }
            }

            cur = cur.skip_whitespace();
            if let Some(next) = cur.eat(',') {
                cur = next;
            }
        }
    }

    /// `[:] value` after `default` or `note`.
    fn attribute_value(cur: Cursor<'a>) -> (&'a str, Cursor<'a>) {
        let cur = cur.skip_whitespace();
        let cur = cur.eat(':').unwrap_or(cur);
        cur.skip_whitespace().value()
    }

    /// Body of `indexes { ... }`, cursor just past the `{`.
    fn parse_indexes(&mut self, cur: Cursor<'a>, indexes: &mut Vec<Index>) -> Cursor<'a> {
        let mut cur = cur;
        loop {
            cur = cur.skip_whitespace();
            match cur.peek() {
                None => return cur,
                Some('}') => return cur.bump(),
                _ => {}
            }
            if let Some(next) = cur.skip_comment() {
                cur = next;
                continue;
            }

            let at = cur.pos();
            let (columns, next) = if cur.peek() == Some('(') {
                let (group, next) = cur.group('(', ')');
                let inner = group.trim_start_matches('(').trim_end_matches(')');
                let columns = inner
                    .split(',')
                    .map(|c| c.trim().trim_matches(|q| matches!(q, '"' | '`' | '\'')))
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                (columns, next)
            } else {
                let (ident, next) = cur.identifier();
                let columns = if ident.is_empty() {
                    vec![]
                } else {
                    vec![ident.to_string()]
                };
                (columns, next)
            };

            if columns.is_empty() {
                self.diagnostics
                    .push(Construct::Index, at, "index without columns dropped");
                cur = cur.skip_rest_of_line();
                continue;
            }

            let mut index = Index {
                columns,
                ..Index::default()
            };
            cur = next.skip_inline_whitespace();
            if cur.peek() == Some('[') {
                cur = self.parse_settings(cur, Construct::Index, |key, value| match key {
                    "pk" => {
                        index.primary_key = true;
                        true
                    }
                    "unique" => {
                        index.unique = true;
                        true
                    }
                    "name" => {
                        index.name = value.map(str::to_string);
                        true
                    }
                    // index method and notes carry no model meaning
                    "type" | "note" => true,
                    _ => false,
                });
            }
            indexes.push(index);
            cur = cur.skip_rest_of_line();
        }
    }

    fn parse_relationship(&mut self, cur: Cursor<'a>) -> (Option<Relationship>, Cursor<'a>) {
        let start = cur.pos();
        let mut cur = cur.skip_keyword().skip_whitespace();

        if !matches!(cur.peek(), Some(':') | Some('{')) {
            let (_name, next) = cur.identifier();
            cur = next.skip_whitespace();
        }

        let long_form = cur.peek() == Some('{');
        if let Some(next) = cur.eat(':').or_else(|| cur.eat('{')) {
            cur = next.skip_whitespace();
        }

        let (from, next) = Self::parse_table_column(cur);
        let (kind, next) = Self::parse_operator(next.skip_whitespace());
        let (to, next) = Self::parse_table_column(next.skip_whitespace());
        cur = next;

        let after = cur.skip_inline_whitespace();
        if after.peek() == Some('[') {
            cur = after.group('[', ']').1;
        }
        if long_form {
            cur = cur.skip_until(&['}']);
            cur = cur.eat('}').unwrap_or(cur);
        }

        match (from, to) {
            (Some((from_table, from_column)), Some((to_table, to_column))) => (
                Some(Relationship::new(
                    from_table, from_column, to_table, to_column, kind,
                )),
                cur,
            ),
            _ => {
                self.diagnostics.push(
                    Construct::Relationship,
                    start,
                    "relationship endpoints must be `table.column`",
                );
                (None, cur)
            }
        }
    }

    /// `table.column`, split at the last dot so `schema.table.column` keeps the
    /// qualified table id.
    fn parse_table_column(cur: Cursor<'a>) -> (Option<(&'a str, &'a str)>, Cursor<'a>) {
        let (ident, cur) = cur.identifier();
        let endpoint = ident
            .rsplit_once('.')
            .filter(|(table, column)| !table.is_empty() && !column.is_empty());
        (endpoint, cur)
    }

    fn parse_operator(cur: Cursor<'a>) -> (RelationshipKind, Cursor<'a>) {
        if let Some(next) = cur.eat('<') {
            match next.eat('>') {
                Some(next) => (RelationshipKind::ManyToMany, next),
                None => (RelationshipKind::ManyToOne, next),
            }
        } else if let Some(next) = cur.eat('>') {
            (RelationshipKind::OneToMany, next)
        } else if let Some(next) = cur.eat('-') {
            match next.eat('-') {
                Some(next) => (RelationshipKind::OneToOne, next),
                // a lone `-` is consumed but not recognized
                None => (RelationshipKind::OneToMany, next),
            }
        } else {
            (RelationshipKind::OneToMany, cur)
        }
    }

    fn parse_enum(&mut self, cur: Cursor<'a>) -> (Option<Enum>, Cursor<'a>) {
        let start = cur.pos();
        let (name, cur) = cur.skip_keyword().skip_whitespace().identifier();
        if name.is_empty() {
            self.diagnostics
                .push(Construct::Enum, start, "enum without a name dropped");
            return (None, cur);
        }
        let mut e = Enum {
            name: name.to_string(),
            values: vec![],
        };

        let cur = cur.skip_whitespace();
        let Some(mut cur) = cur.eat('{') else {
            self.diagnostics
                .push(Construct::Enum, start, format!("expected `{{` after enum `{name}`"));
            return (Some(e), cur);
        };

        loop {
            cur = cur.skip_whitespace();
            match cur.peek() {
                None => {
                    self.diagnostics
                        .push(Construct::Enum, start, format!("unterminated enum `{name}`"));
                    break;
                }
                Some('}') => {
                    cur = cur.bump();
                    break;
                }
                _ => {}
            }
            if let Some(next) = cur.skip_comment() {
                cur = next;
                continue;
            }
            let (value, next) = cur.identifier();
            if value.is_empty() {
                self.diagnostics
                    .push(Construct::Enum, cur.pos(), "enum value expected");
                cur = cur.skip_rest_of_line();
            } else {
                e.values.push(value.to_string());
                cur = next.skip_rest_of_line();
            }
        }

        (Some(e), cur)
    }
}
