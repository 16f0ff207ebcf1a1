use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{} construct(s) dropped, first: {}", .diagnostics.len(), first(.diagnostics))]
    Rejected { diagnostics: Vec<Diagnostic> },

    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn first(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}
