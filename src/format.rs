//! Choosing between the DSL parser and the SQL extractor for a piece of text.

use std::path::Path;

use crate::diagnostic::Parsed;

/// Which front end reads a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    /// Decide from the text itself
    #[default]
    Auto,
    /// `Table` / `Ref` / `Enum` definitions
    Dsl,
    /// `CREATE TABLE` / `ALTER TABLE` script
    Sql,
}

impl SourceFormat {
    /// Format named by a `--format` flag or wasm argument: `auto`, `dbml`/`dsl` or `sql`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "dbml" | "dsl" => Some(Self::Dsl),
            "sql" => Some(Self::Sql),
            _ => None,
        }
    }

    /// Format implied by a file extension, `Auto` when unknown.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
            .unwrap_or_default()
    }

    /// A line opening with `CREATE TABLE` or `ALTER TABLE` means SQL.
    pub fn detect(content: &str) -> Self {
        let is_ddl = content.lines().any(|line| {
            let mut words = line.split_whitespace();
            matches!(
                (words.next(), words.next()),
                (Some(verb), Some(object))
                    if (verb.eq_ignore_ascii_case("create") || verb.eq_ignore_ascii_case("alter"))
                        && object.eq_ignore_ascii_case("table")
            )
        });
        if is_ddl { Self::Sql } else { Self::Dsl }
    }

    /// The front end to run: `self`, or what the text looks like when `Auto`.
    pub fn resolve(self, content: &str) -> Self {
        match self {
            Self::Auto => Self::detect(content),
            other => other,
        }
    }
}

/// Parse `text` as `format`, detecting the format when it is `Auto`.
pub fn parse_source(text: &str, format: SourceFormat) -> Parsed {
    let format = format.resolve(text);
    tracing::debug!(?format, "parsing source");
    match format {
        SourceFormat::Sql => crate::sql::parse_sql_with_diagnostics(text),
        _ => crate::parser::parse_with_diagnostics(text),
    }
}
