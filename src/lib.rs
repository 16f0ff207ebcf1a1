pub mod ast;
pub mod diagnostic;
pub mod error;
pub mod format;
pub mod parser;
pub mod scanner;
pub mod serializer;
pub mod sql;

use wasm_bindgen::prelude::*;

pub use ast::Schema;
pub use diagnostic::{Diagnostic, Parsed};
pub use error::{Error, Result};
pub use format::{SourceFormat, parse_source};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse DSL source to Schema JSON
#[wasm_bindgen(js_name = "parseDbml")]
pub fn parse_dbml(source: &str) -> std::result::Result<String, String> {
    to_json(&parser::parse(source))
}

/// Parse a SQL DDL script to Schema JSON
#[wasm_bindgen(js_name = "parseSql")]
pub fn parse_sql(sql: &str) -> std::result::Result<String, String> {
    to_json(&sql::parse_sql(sql))
}

#[wasm_bindgen(js_name = "sqlToDbml")]
pub fn sql_to_dbml(sql: &str) -> String {
    sql::sql_to_dsl(sql)
}

/// Render Schema JSON as DSL source
#[wasm_bindgen(js_name = "schemaToDbml")]
pub fn schema_to_dbml(json: &str) -> std::result::Result<String, String> {
    let schema: Schema = serde_json::from_str(json).map_err(|e| Error::from(e).to_string())?;
    Ok(serializer::to_source(&schema))
}

/// Diagnostics JSON for `source`; `format` is `auto` (default), `dbml` or `sql`
#[wasm_bindgen]
pub fn diagnose(source: &str, format: Option<String>) -> std::result::Result<String, String> {
    let format = match format.as_deref() {
        None => SourceFormat::Auto,
        Some(name) => {
            SourceFormat::from_str(name).ok_or_else(|| format!("unknown format: {name}"))?
        }
    };
    to_json(&parse_source(source, format).diagnostics)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> std::result::Result<String, String> {
    serde_json::to_string(value).map_err(|e| Error::from(e).to_string())
}
