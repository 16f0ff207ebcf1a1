//! SQL DDL to Schema extraction.

mod parser;
pub mod rules;

pub use parser::{parse_sql, parse_sql_strict, parse_sql_with_diagnostics, sql_to_dsl};
