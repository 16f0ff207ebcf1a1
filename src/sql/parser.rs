//! Pattern-based extractor for CREATE TABLE / ALTER TABLE ... FOREIGN KEY scripts.

use std::ops::Range;

use indexmap::IndexMap;
use indexmap::map::Entry;

use super::rules::{self, Rule, clean_identifier};
use crate::ast::{Column, Index, Relationship, RelationshipKind, Schema, Table};
use crate::diagnostic::{Construct, Diagnostics, Parsed};

/// Extract a Schema from a SQL script, skipping statements it does not understand.
pub fn parse_sql(input: &str) -> Schema {
    Extractor::default().run(input).schema
}

pub fn parse_sql_with_diagnostics(input: &str) -> Parsed {
    Extractor::default().run(input)
}

/// Extract a Schema, failing if any statement or clause had to be dropped.
pub fn parse_sql_strict(input: &str) -> crate::Result<Schema> {
    Extractor::default().run(input).into_strict()
}

/// Convert a SQL script to DSL source.
pub fn sql_to_dsl(input: &str) -> String {
    crate::serializer::to_source(&parse_sql(input))
}

/// Blank out comments and carriage returns with spaces of the same byte length,
/// keeping newlines, so offsets into the result are offsets into `input`.
pub(crate) fn normalize(input: &str) -> String {
    let blank = |caps: &regex::Captures<'_>| -> String {
        caps[0]
            .chars()
            .map(|c| if c == '\n' { "\n".to_string() } else { " ".repeat(c.len_utf8()) })
            .collect()
    };
    rules::COMMENT
        .regex()
        .replace_all(input, blank)
        .replace('\r', " ")
}

#[derive(Default)]
struct Extractor {
    tables: IndexMap<String, Table>,
    relationships: Vec<Relationship>,
    diagnostics: Diagnostics,
    /// Byte ranges of statements a rule accounted for.
    covered: Vec<Range<usize>>,
}

impl Extractor {
    fn run(mut self, input: &str) -> Parsed {
        let sql = normalize(input);
        self.extract_create_tables(&sql);
        self.extract_alter_table_foreign_keys(&sql);
        self.report_uncovered_statements(&sql);

        tracing::debug!(
            tables = self.tables.len(),
            relationships = self.relationships.len(),
            "extracted SQL schema"
        );

        Parsed {
            schema: Schema {
                tables: self.tables.into_values().collect(),
                relationships: self.relationships,
                enums: vec![],
            },
            diagnostics: self.diagnostics.into_vec(),
        }
    }

    fn extract_create_tables(&mut self, sql: &str) {
        for caps in rules::CREATE_TABLE.regex().captures_iter(sql) {
            let (Some(statement), Some(name), Some(body)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            // A missing `;` lets the match swallow the next statement. Leave it
            // uncovered so both starts get reported.
            if rules::TABLE_STATEMENT.is_match(body.as_str()) {
                continue;
            }
            self.covered.push(statement.range());
            let mut table = Table::new(&clean_identifier(name.as_str()));

            for (offset, clause) in split_clauses(body.as_str()) {
                let offset = body.start() + offset;
                if rules::TABLE_CONSTRAINT.is_match(clause) {
                    self.apply_table_constraint(&mut table, clause, offset);
                } else if let Some(column) = self.parse_column(&table, clause, offset) {
                    table.columns.push(column);
                }
            }

            if table.columns.is_empty() {
                self.diagnostics.push(
                    Construct::Table,
                    statement.start(),
                    format!("table `{}` has no columns and was discarded", table.id),
                );
                continue;
            }

            match self.tables.entry(table.id.clone()) {
                Entry::Occupied(mut entry) => {
                    self.diagnostics.push(
                        Construct::Table,
                        statement.start(),
                        format!("table `{}` redefined; the later definition wins", table.id),
                    );
                    entry.insert(table);
                }
                Entry::Vacant(entry) => {
                    entry.insert(table);
                }
            }
        }
    }

    fn apply_table_constraint(&mut self, table: &mut Table, clause: &str, offset: usize) {
        if let Some(caps) = rules::PRIMARY_KEY_CONSTRAINT.captures(clause) {
            let columns: Vec<String> = caps[1]
                .split(',')
                .map(clean_identifier)
                .filter(|c| !c.is_empty())
                .collect();
            match columns.len() {
                0 => self.diagnostics.push(
                    Construct::Constraint,
                    offset,
                    "primary key without columns ignored",
                ),
                1 => {
                    let single = &columns[0];
                    match table.columns.iter_mut().find(|c| &c.name == single) {
                        Some(column) => column.primary_key = true,
                        None => self.diagnostics.push(
                            Construct::Constraint,
                            offset,
                            format!("primary key names unknown column `{single}`"),
                        ),
                    }
                }
                _ => table.indexes.push(Index {
                    columns,
                    primary_key: true,
                    ..Index::default()
                }),
            }
            return;
        }

        if let Some(caps) = rules::FOREIGN_KEY_CONSTRAINT.captures(clause) {
            self.relationships.push(Relationship::new(
                table.id.clone(),
                clean_identifier(&caps[1]),
                clean_identifier(&caps[2]),
                clean_identifier(&caps[3]),
                RelationshipKind::ManyToOne,
            ));
            return;
        }

        self.diagnostics.push(
            Construct::Constraint,
            offset,
            format!("constraint `{}` has no model effect", summarize(clause)),
        );
    }

    fn parse_column(&mut self, table: &Table, clause: &str, offset: usize) -> Option<Column> {
        let Some(caps) = rules::COLUMN_DEFINITION.captures(clause) else {
            self.unmatched(&rules::COLUMN_DEFINITION, clause, offset);
            return None;
        };

        let mut column = Column::new(clean_identifier(&caps[1]), caps[2].to_lowercase());
        let tail = &caps[3];

        column.primary_key = rules::COLUMN_PRIMARY_KEY.is_match(tail);
        column.not_null = rules::COLUMN_NOT_NULL.is_match(tail);
        column.unique = rules::COLUMN_UNIQUE.is_match(tail);
        column.auto_increment = rules::COLUMN_AUTO_INCREMENT.is_match(tail);

        if let Some(default) = rules::COLUMN_DEFAULT.captures(tail) {
            column.default = Some(strip_quotes(&default[1]).to_string());
        }
        if let Some(comment) = rules::COLUMN_COMMENT.captures(tail) {
            column.note = Some(comment[1].to_string());
        }
        if let Some(reference) = rules::COLUMN_REFERENCES.captures(tail) {
            let to_column = reference
                .get(2)
                .map(|c| clean_identifier(c.as_str()))
                .unwrap_or_else(|| "id".to_string());
            self.relationships.push(Relationship::new(
                table.id.clone(),
                column.name.clone(),
                clean_identifier(&reference[1]),
                to_column,
                RelationshipKind::ManyToOne,
            ));
        }

        Some(column)
    }

    fn extract_alter_table_foreign_keys(&mut self, sql: &str) {
        for caps in rules::ALTER_TABLE_FOREIGN_KEY.regex().captures_iter(sql) {
            if let Some(statement) = caps.get(0) {
                self.covered.push(statement.range());
            }
            self.relationships.push(Relationship::new(
                clean_identifier(&caps[1]),
                clean_identifier(&caps[2]),
                clean_identifier(&caps[3]),
                clean_identifier(&caps[4]),
                RelationshipKind::ManyToOne,
            ));
        }
    }

    /// Every `CREATE TABLE` / `ALTER TABLE` start outside a matched statement.
    fn report_uncovered_statements(&mut self, sql: &str) {
        for start in rules::TABLE_STATEMENT.regex().find_iter(sql) {
            let offset = start.start();
            if self.covered.iter().any(|range| range.contains(&offset)) {
                continue;
            }
            self.diagnostics.push(
                Construct::Statement,
                offset,
                format!("statement `{}` not understood", summarize(&sql[offset..])),
            );
        }
    }

    fn unmatched(&mut self, rule: &Rule, clause: &str, offset: usize) {
        self.diagnostics.push(
            Construct::Column,
            offset,
            format!("`{}` does not match {}", summarize(clause), rule.name),
        );
    }
}

/// Split a CREATE TABLE body on commas outside parentheses. Yields each
/// non-blank clause trimmed, with the byte offset of its first character.
pub(crate) fn split_clauses(body: &str) -> Vec<(usize, &str)> {
    let mut clauses = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    let mut push = |from: usize, to: usize| {
        let raw = &body[from..to];
        let trimmed = raw.trim_start();
        let clause = trimmed.trim_end();
        if !clause.is_empty() {
            clauses.push((from + raw.len() - trimmed.len(), clause));
        }
    };

    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                push(start, i);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(start, body.len());

    clauses
}

fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['`', '\'', '"']).unwrap_or(s);
    s.strip_suffix(['`', '\'', '"']).unwrap_or(s)
}

/// First line of a clause, shortened for messages.
fn summarize(clause: &str) -> String {
    let line = clause.lines().next().unwrap_or_default().trim();
    match line.char_indices().nth(40) {
        Some((i, _)) => format!("{}...", &line[..i]),
        None => line.to_string(),
    }
}
