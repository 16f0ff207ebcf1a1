//! Named statement-shape rules for the DDL extractor.
//!
//! Each rule is one case-insensitive pattern compiled on first use. Dialect
//! variations belong in the rule they affect.

use std::sync::LazyLock;

use regex::{Captures, Regex};

pub struct Rule {
    pub name: &'static str,
    regex: LazyLock<Regex>,
}

impl Rule {
    const fn new(name: &'static str, build: fn() -> Regex) -> Self {
        Self {
            name,
            regex: LazyLock::new(build),
        }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(text)
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("DDL rule patterns are valid")
}

/// One possibly quoted name part: `users`, `"users"`, `` `users` ``, `[users]`.
macro_rules! name_part {
    () => {
        r#"[`"\[]?[\w-]+[`"\]]?"#
    };
}

/// `part` or `part.part`.
macro_rules! qualified_name {
    () => {
        concat!("(?:", name_part!(), r"\.)?", name_part!())
    };
}

/// `-- ...` to end of line or `/* ... */`, whichever opens first. An
/// unterminated block comment is left as text.
pub static COMMENT: Rule = Rule::new("comment", || compile(r"(?s)--[^\n]*|/\*.*?\*/"));

/// Start of a statement the extractor is expected to understand.
pub static TABLE_STATEMENT: Rule = Rule::new("table-statement", || {
    compile(r"(?i)\b(?:CREATE|ALTER)\s+TABLE\b")
});

/// `CREATE TABLE [IF NOT EXISTS] name ( body ) [table options] ;`
pub static CREATE_TABLE: Rule = Rule::new("create-table", || {
    compile(concat!(
        r"(?is)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(",
        qualified_name!(),
        r")\s*\((.*?)\)[^;()]*;",
    ))
});

/// `ALTER TABLE [ONLY] t ADD [CONSTRAINT n] FOREIGN KEY (c) REFERENCES t(c) [actions] ;`
pub static ALTER_TABLE_FOREIGN_KEY: Rule = Rule::new("alter-table-foreign-key", || {
    compile(concat!(
        r"(?i)ALTER\s+TABLE\s+(?:ONLY\s+)?(",
        qualified_name!(),
        r")\s+ADD\s+(?:CONSTRAINT\s+",
        name_part!(),
        r"\s+)?FOREIGN\s+KEY\s*\(\s*(",
        name_part!(),
        r")\s*\)\s*REFERENCES\s+(",
        qualified_name!(),
        r")\s*\(\s*(",
        name_part!(),
        r")\s*\)[^;]*;",
    ))
});

/// Leading keyword of a table-level constraint clause.
pub static TABLE_CONSTRAINT: Rule = Rule::new("table-constraint", || {
    compile(r"(?i)^(?:CONSTRAINT|PRIMARY\s+KEY|FOREIGN\s+KEY|UNIQUE|INDEX|KEY)\b")
});

/// `PRIMARY KEY (a[, b ...])` anywhere in a constraint clause.
pub static PRIMARY_KEY_CONSTRAINT: Rule = Rule::new("primary-key-constraint", || {
    compile(r"(?i)PRIMARY\s+KEY\s*\(([^)]*)\)")
});

/// `FOREIGN KEY (c) REFERENCES t(c)` anywhere in a constraint clause.
pub static FOREIGN_KEY_CONSTRAINT: Rule = Rule::new("foreign-key-constraint", || {
    compile(concat!(
        r"(?i)FOREIGN\s+KEY\s*\(\s*(",
        name_part!(),
        r")\s*\)\s*REFERENCES\s+(",
        qualified_name!(),
        r")\s*\(\s*(",
        name_part!(),
        r")\s*\)",
    ))
});

/// `name type[(args)] tail`
pub static COLUMN_DEFINITION: Rule = Rule::new("column-definition", || {
    compile(r#"(?s)^\s*([`"\[]?\w+[`"\]]?)\s+(\w+(?:\([^)]*\))?)\s*(.*)$"#)
});

pub static COLUMN_PRIMARY_KEY: Rule = Rule::new("column-primary-key", || {
    compile(r"(?i)PRIMARY\s+KEY")
});

pub static COLUMN_NOT_NULL: Rule = Rule::new("column-not-null", || compile(r"(?i)NOT\s+NULL"));

pub static COLUMN_UNIQUE: Rule = Rule::new("column-unique", || compile(r"(?i)\bUNIQUE\b"));

pub static COLUMN_AUTO_INCREMENT: Rule = Rule::new("column-auto-increment", || {
    compile(r"(?i)AUTO_?INCREMENT")
});

pub static COLUMN_DEFAULT: Rule = Rule::new("column-default", || {
    compile(r"(?i)\bDEFAULT\s+([^,\s]+)")
});

pub static COLUMN_COMMENT: Rule = Rule::new("column-comment", || {
    compile(r#"(?i)\bCOMMENT\s+['"]([^'"]+)['"]"#)
});

/// Inline `REFERENCES t[(c)]` in a column tail.
pub static COLUMN_REFERENCES: Rule = Rule::new("column-references", || {
    compile(concat!(
        r"(?i)\bREFERENCES\s+(",
        qualified_name!(),
        r")(?:\s*\(\s*(",
        name_part!(),
        r")\s*\))?",
    ))
});

/// Strip identifier quoting: backticks, double quotes and brackets.
pub fn clean_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '`' | '"' | '[' | ']'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_captures() {
        let sql = "CREATE TABLE IF NOT EXISTS `shop`.`orders` (id INT, total DECIMAL(10,2)) ENGINE=InnoDB;";
        let caps = CREATE_TABLE.captures(sql).unwrap();
        assert_eq!(&caps[1], "`shop`.`orders`");
        assert_eq!(&caps[2], "id INT, total DECIMAL(10,2)");
    }

    #[test]
    fn test_create_table_does_not_run_into_next_statement() {
        let sql = "create table a (x int);\ncreate table b (y int);";
        let names: Vec<_> = CREATE_TABLE
            .regex()
            .captures_iter(sql)
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_alter_table_foreign_key() {
        let sql = "ALTER TABLE ONLY public.posts ADD CONSTRAINT fk1 FOREIGN KEY (author_id) REFERENCES public.authors(id) ON DELETE CASCADE;";
        let caps = ALTER_TABLE_FOREIGN_KEY.captures(sql).unwrap();
        assert_eq!(&caps[1], "public.posts");
        assert_eq!(&caps[2], "author_id");
        assert_eq!(&caps[3], "public.authors");
        assert_eq!(&caps[4], "id");
    }

    #[test]
    fn test_table_constraint_keywords() {
        assert!(TABLE_CONSTRAINT.is_match("PRIMARY KEY (id)"));
        assert!(TABLE_CONSTRAINT.is_match("constraint pk primary key (id)"));
        assert!(TABLE_CONSTRAINT.is_match("KEY idx_name (name)"));
        assert!(!TABLE_CONSTRAINT.is_match("key_id INT"));
        assert!(!TABLE_CONSTRAINT.is_match("unique_code TEXT"));
    }

    #[test]
    fn test_column_definition() {
        let caps = COLUMN_DEFINITION
            .captures("`price` DECIMAL(10,2) NOT NULL DEFAULT 0")
            .unwrap();
        assert_eq!(&caps[1], "`price`");
        assert_eq!(&caps[2], "DECIMAL(10,2)");
        assert_eq!(&caps[3], "NOT NULL DEFAULT 0");
        assert!(COLUMN_DEFINITION.captures("COMMENT 'table note'").is_none());
    }

    #[test]
    fn test_comment_first_opener_wins() {
        let sql = "-- old /* note\nx /* a -- b */ y";
        let found: Vec<_> = COMMENT.regex().find_iter(sql).map(|m| m.as_str()).collect();
        assert_eq!(found, vec!["-- old /* note", "/* a -- b */"]);
    }

    #[test]
    fn test_table_statement_starts() {
        let sql = "create  table a (x int);\nALTER TABLE b ADD c INT;\nCREATE INDEX i ON a (x);";
        assert_eq!(TABLE_STATEMENT.regex().find_iter(sql).count(), 2);
        assert!(!TABLE_STATEMENT.is_match("CREATE TABLESPACE ts"));
    }

    #[test]
    fn test_clean_identifier() {
        assert_eq!(clean_identifier("`users`"), "users");
        assert_eq!(clean_identifier("\"public\".\"users\""), "public.users");
        assert_eq!(clean_identifier("[dbo].[users]"), "dbo.users");
    }
}
