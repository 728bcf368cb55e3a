//! Graph database access for the Cypher adapter.
//!
//! - [`CypherExecutor`] - Execute Cypher and explain plans (mockable)
//! - [`Neo4jClient`] - Bolt implementation with a lazily created, memoized driver
//! - [`is_write_query`] - Detects Cypher that modifies the database

mod neo4j;
mod row;
mod traits;

pub use neo4j::Neo4jClient;
pub use row::{Params, Row};
pub use traits::{AccessMode, CypherExecutor};

use std::sync::LazyLock;

use regex::Regex;

static WRITE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(CREATE|MERGE|DELETE|DETACH|SET|REMOVE|DROP|FOREACH|LOAD\s+CSV)\b")
        .expect("write clause pattern is valid")
});

static PROCEDURE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bCALL\s+([A-Za-z_][\w]*(?:\s*\.\s*[A-Za-z_][\w]*)*)\s*\(")
        .expect("procedure call pattern is valid")
});

/// Names that never reach a clause: property accesses, map keys and parameters.
static NON_CLAUSE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\s*[A-Za-z_]\w*|\$\w+|\b[A-Za-z_]\w*\s*:")
        .expect("non-clause name pattern is valid")
});

/// Procedures known to only read. Any other procedure call counts as a write.
const READ_PROCEDURES: &[&str] = &[
    "db.labels",
    "db.relationshiptypes",
    "db.propertykeys",
    "db.indexes",
    "db.constraints",
    "db.schema.",
    "db.index.fulltext.querynodes",
    "db.index.fulltext.queryrelationships",
    "dbms.components",
    "dbms.procedures",
    "dbms.functions",
    "apoc.meta.",
    "apoc.help",
];

/// Whether a Cypher query contains a clause or procedure call that writes
/// to the database.
///
/// String literals, comments and escaped identifiers are ignored, as are
/// names used as properties, map keys or parameters.
pub fn is_write_query(cypher: &str) -> bool {
    let code = mask_literals(cypher);

    let writes_by_procedure = PROCEDURE_CALL.captures_iter(&code).any(|caps| {
        let name: String = caps[1]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        !READ_PROCEDURES
            .iter()
            .any(|read| name == *read || (read.ends_with('.') && name.starts_with(read)))
    });
    if writes_by_procedure {
        return true;
    }

    WRITE_CLAUSE.is_match(&NON_CLAUSE_NAME.replace_all(&code, " "))
}

/// Replaces string literals, backtick identifiers and comments with spaces.
fn mask_literals(cypher: &str) -> String {
    let mut out = String::with_capacity(cypher.len());
    let mut chars = cypher.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                while let Some(n) = chars.next() {
                    if n == '\\' && c != '`' {
                        chars.next();
                    } else if n == c {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&n| n != '\n').is_some() {}
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_queries() {
        assert!(!is_write_query("MATCH (n:Person) RETURN n.name LIMIT 5"));
        assert!(!is_write_query("CALL db.labels()"));
        assert!(!is_write_query("MATCH (n) WHERE n.offset > 3 RETURN n"));
        assert!(!is_write_query("MATCH (n) RETURN n.set AS s"));
        assert!(!is_write_query("MATCH (n) WHERE n.status = 'delete' RETURN n"));
        assert!(!is_write_query("MATCH (n) RETURN n.`remove` // merge later"));
        assert!(!is_write_query("RETURN {create: 1, drop: $delete} AS m"));
        assert!(!is_write_query("CALL db.labels() YIELD label RETURN label"));
        assert!(!is_write_query("CALL apoc.meta.schema() YIELD value RETURN value"));
    }

    #[test]
    fn test_write_queries() {
        assert!(is_write_query("CREATE (n:Person {name: 'Ada'})"));
        assert!(is_write_query("match (n) detach delete n"));
        assert!(is_write_query("MATCH (n) SET n.flag = true"));
        assert!(is_write_query("LOAD  CSV FROM 'file:///x.csv' AS row RETURN row"));
        assert!(is_write_query("CREATE (set:Tag)"));
        assert!(is_write_query("MATCH (n) /* read */ REMOVE n:Draft"));
    }

    #[test]
    fn test_procedure_calls() {
        assert!(is_write_query("CALL apoc.refactor.rename.label('A', 'B')"));
        assert!(is_write_query("call apoc.create.node(['X'], {})"));
        assert!(is_write_query("MATCH (n) CALL apoc.periodic.iterate('a', 'b', {}) YIELD batches RETURN batches"));
        assert!(!is_write_query("CALL db.index.fulltext.queryNodes('idx', 'ada') YIELD node RETURN node"));
    }
}
