use crate::error::Result;
use crate::schema::descriptor::TableDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static CREATE_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)create\s+(?:(?:global\s+|local\s+)?(?:temporary|temp)\s+)?table\s+(?:if\s+not\s+exists\s+)?(?:[`"\[]?\w+[`"\]]?\.)?[`"\[]?(\w+)"#,
    )
    .unwrap()
});

static CONSTRAINT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:primary\s+key|foreign\s+key|constraint\s|unique\s*(?:\(|key\b|index\b)|check\s*\()")
        .unwrap()
});

/// split sql text into statements on `;`, ignoring semicolons inside
/// quoted strings, quoted identifiers and comments
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                // doubled quote is an escaped quote
                if chars.peek() == Some(&q) {
                    current.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                current.push(' ');
            }
            ';' => {
                current.push(c);
                let stmt = current.trim();
                if stmt.len() > 1 {
                    statements.push(stmt.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}

/// split a parenthesised body on commas at nesting depth zero
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);

    parts
}

fn unquote_identifier(token: &str) -> &str {
    token.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
}

fn parse_create_table(stmt: &str) -> Option<TableDescriptor> {
    let captures = CREATE_TABLE_REGEX.captures(stmt)?;
    let name = captures.get(1)?.as_str();

    let open = stmt.find('(')?;
    let close = stmt.rfind(')')?;
    if close <= open {
        return None;
    }

    let columns = split_top_level(&stmt[open + 1..close])
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| !CONSTRAINT_REGEX.is_match(entry))
        .filter_map(|entry| entry.split_whitespace().next())
        .map(|token| unquote_identifier(token).to_string())
        .filter(|column| !column.is_empty())
        .collect();

    Some(TableDescriptor::new(name, columns))
}

/// extract one descriptor per `create table` statement; anything else is skipped
#[tracing::instrument(skip(sql), fields(sql_len = sql.len()))]
pub fn parse_schema(sql: &str) -> Vec<TableDescriptor> {
    let tables: Vec<TableDescriptor> = split_statements(sql)
        .iter()
        .filter(|stmt| stmt.to_uppercase().contains("CREATE"))
        .filter_map(|stmt| parse_create_table(stmt))
        .collect();

    tracing::debug!(table_count = tables.len(), "parsed schema");
    tables
}

pub fn parse_schema_file(path: impl AsRef<Path>) -> Result<Vec<TableDescriptor>> {
    let path = path.as_ref();
    tracing::info!("reading schema from {}", path.display());
    let sql = std::fs::read_to_string(path)?;
    Ok(parse_schema(&sql))
}
