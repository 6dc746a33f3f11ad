//! keyword denylist for generated sql
//!
//! this is a usability guard that stops obviously destructive statements from
//! being run by accident. it matches substrings, not parsed sql: a keyword inside
//! a string literal or identifier is rejected, and a statement that does damage
//! without these exact words passes. connect with a read-only database role; that
//! is the actual safety boundary.

/// keywords checked in order; the first hit is reported
pub const DENYLIST: [&str; 4] = ["DROP", "DELETE", "UPDATE", "ALTER"];

pub const SAFE_MESSAGE: &str = "SQL is safe.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub ok: bool,
    pub message: String,
}

impl Validation {
    pub fn into_pair(self) -> (bool, String) {
        (self.ok, self.message)
    }
}

/// the first denylisted keyword found anywhere in `sql`, ignoring case
pub fn blocked_keyword(sql: &str) -> Option<&'static str> {
    let upper = sql.to_uppercase();
    DENYLIST.iter().copied().find(|word| upper.contains(word))
}

pub fn validate_sql(sql: &str) -> Validation {
    match blocked_keyword(sql) {
        Some(word) => {
            tracing::warn!(keyword = word, "blocked sql containing denylisted keyword");
            Validation {
                ok: false,
                message: format!("Dangerous SQL blocked: {}", word),
            }
        }
        None => Validation {
            ok: true,
            message: SAFE_MESSAGE.to_string(),
        },
    }
}
