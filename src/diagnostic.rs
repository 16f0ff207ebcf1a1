//! Record of what a permissive parse dropped.

use std::fmt;

use serde::Serialize;

use crate::ast::Schema;

/// Kind of construct a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Construct {
    Table,
    Column,
    Attribute,
    Index,
    Relationship,
    Enum,
    Statement,
    Constraint,
    Input,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Attribute => "attribute",
            Self::Index => "index",
            Self::Relationship => "relationship",
            Self::Enum => "enum",
            Self::Statement => "statement",
            Self::Constraint => "constraint",
            Self::Input => "input",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub construct: Construct,
    /// Byte offset into the text handed to the parser.
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}: {}", self.construct, self.offset, self.message)
    }
}

/// Diagnostics collected by one parse call.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub(crate) fn push(&mut self, construct: Construct, offset: usize, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            construct,
            offset,
            message: message.into(),
        };
        tracing::trace!(%diagnostic, "dropped construct");
        self.0.push(diagnostic);
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

/// A schema together with everything the parse skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parsed {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Fail with every diagnostic if anything was dropped.
    pub fn into_strict(self) -> crate::Result<Schema> {
        if self.diagnostics.is_empty() {
            Ok(self.schema)
        } else {
            Err(crate::Error::Rejected {
                diagnostics: self.diagnostics,
            })
        }
    }
}
