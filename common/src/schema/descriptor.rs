use crate::schema::index::RecordMetadata;
use serde::{Deserialize, Serialize};

pub const TABLE_KIND: &str = "table";

/// a table's name, its declared columns in order, and a short description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub description: String,
}

impl TableDescriptor {
    /// descriptor with the generated boilerplate description
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let name = name.into();
        let description = format!("This table stores {} related information.", name);
        Self {
            name,
            columns,
            description,
        }
    }

    pub fn columns_joined(&self) -> String {
        self.columns.join(", ")
    }

    /// single-line text that gets embedded for similarity search
    pub fn document(&self) -> String {
        format!(
            "TABLE: {} | COLUMNS: {} | DESCRIPTION: {}",
            self.name,
            self.columns_joined(),
            self.description
        )
    }

    /// flat metadata stored next to the embedding; columns are kept as a joined string
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            name: self.name.clone(),
            kind: TABLE_KIND.to_string(),
            description: self.description.clone(),
            columns: self.columns_joined(),
        }
    }
}
