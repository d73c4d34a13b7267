// parser.rs: COPY header parsing
use crate::error::{Result, ScrubError};

pub const COPY_KEYWORD: &str = "COPY ";

/// Table and ordered column names captured from a `COPY ... FROM stdin;` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyHeader {
    pub table: String,
    pub columns: Vec<String>,
}

pub fn is_copy_statement(statement: &str) -> bool {
    statement.starts_with(COPY_KEYWORD)
}

/// Second space-delimited token, quoting kept verbatim.
pub fn table_name_from_statement(statement: &str) -> Result<&str> {
    if !is_copy_statement(statement) {
        return Err(ScrubError::MalformedHeader(format!("not a COPY statement: {}", statement)));
    }
    statement
        .split(' ')
        .nth(1)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScrubError::MalformedHeader(format!("missing table name: {}", statement)))
}

pub fn column_names(statement: &str) -> Result<Vec<String>> {
    let (open, close) = match (statement.find('('), statement.find(')')) {
        (Some(o), Some(c)) if o < c => (o, c),
        _ => {
            return Err(ScrubError::MalformedHeader(format!(
                "unexpected column list: {}",
                statement
            )))
        }
    };
    let columns: Vec<String> = statement[open + 1..close]
        .split(", ")
        .map(|c| c.trim_matches('"').to_string())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(ScrubError::MalformedHeader(format!("no columns in: {}", statement)));
    }
    Ok(columns)
}

pub fn parse_copy_header(statement: &str) -> Result<CopyHeader> {
    let table = table_name_from_statement(statement)?.to_string();
    let columns = column_names(statement)?;
    Ok(CopyHeader { table, columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "COPY public.\"EmailHistories\" (\"Id\", \"UserId\", \"Email\", \"Created\", \"LastUpdated\") FROM stdin;";

    #[test]
    fn test_parse_copy_header() {
        let h = parse_copy_header(HEADER).expect("header");
        assert_eq!(h.table, "public.\"EmailHistories\"");
        assert_eq!(h.columns, vec!["Id", "UserId", "Email", "Created", "LastUpdated"]);
    }

    #[test]
    fn test_unquoted_columns_and_duplicates() {
        let h = parse_copy_header("COPY public.t (a, b, a) FROM stdin;").unwrap();
        assert_eq!(h.table, "public.t");
        assert_eq!(h.columns, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_malformed_headers_are_rejected() {
        for bad in [
            "COPY public.t FROM stdin;",
            "COPY public.t (a, b FROM stdin;",
            "COPY public.t a, b) FROM stdin;",
            "COPY public.t )a( FROM stdin;",
            "COPY public.t () FROM stdin;",
            "INSERT INTO t VALUES (1);",
        ] {
            match parse_copy_header(bad) {
                Err(ScrubError::MalformedHeader(_)) => {}
                other => panic!("expected MalformedHeader for {:?}, got {:?}", bad, other),
            }
        }
    }
}
