use once_cell::sync::Lazy;
use regex::Regex;

const FENCE: &str = "```";

// an info string alone on the fence line, e.g. ```duckdb
static LANGUAGE_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*[A-Za-z][\w+-]*[ \t]*\r?\n").unwrap());

// ```sql SELECT ... with the statement on the fence line
static INLINE_SQL_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*sql(?:\s|$)").unwrap());

/// strip markdown code fences (and a leading language tag) from model output;
/// text without a complete fence is only trimmed
pub fn clean_sql(raw: &str) -> String {
    let mut parts = raw.split(FENCE);
    let (Some(_), Some(inner), Some(_)) = (parts.next(), parts.next(), parts.next()) else {
        return raw.trim().to_string();
    };

    let tag = LANGUAGE_TAG_REGEX
        .find(inner)
        .or_else(|| INLINE_SQL_TAG_REGEX.find(inner));
    let inner = match tag {
        Some(tag) => &inner[tag.end()..],
        None => inner,
    };

    inner.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_sql_is_trimmed() {
        assert_eq!(clean_sql("  SELECT * FROM customers;\n"), "SELECT * FROM customers;");
    }

    #[test]
    fn test_clean_sql_fence() {
        let raw = "```sql\nSELECT name FROM customers WHERE city = 'London';\n```";
        assert_eq!(
            clean_sql(raw),
            "SELECT name FROM customers WHERE city = 'London';"
        );
    }

    #[test]
    fn test_clean_untagged_fence_with_prose() {
        let raw = "Here is the query:\n```\nSELECT 1;\n```\nLet me know if you need more.";
        assert_eq!(clean_sql(raw), "SELECT 1;");
    }

    #[test]
    fn test_clean_other_dialect_tags() {
        assert_eq!(clean_sql("```MySQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("```postgresql\nSELECT 2\n```"), "SELECT 2");
        assert_eq!(clean_sql("```sql SELECT 3```"), "SELECT 3");
    }

    #[test]
    fn test_clean_any_language_tag() {
        assert_eq!(clean_sql("```duckdb\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("```bigquery\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("```text\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("```t-sql \r\nSELECT TOP 1 * FROM t\r\n```"), "SELECT TOP 1 * FROM t");
        assert_eq!(clean_sql("```c++\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn test_clean_keeps_statement_starting_like_a_tag() {
        assert_eq!(clean_sql("```\nsqlite_master\n```"), "sqlite_master");
        assert_eq!(clean_sql("```SELECT *\nFROM t```"), "SELECT *\nFROM t");
    }

    #[test]
    fn test_clean_unbalanced_fence_falls_back_to_trim() {
        assert_eq!(clean_sql(" ```sql\nSELECT 1 "), "```sql\nSELECT 1");
        assert_eq!(clean_sql(""), "");
    }
}
